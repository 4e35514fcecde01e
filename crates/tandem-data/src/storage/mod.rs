//! 저장소 구현.
//!
//! - `postgres`: 연결 풀, 마이그레이션, `PgGateway`
//! - `executions` / `reference` / `trades`: 테이블별 repository
//! - `memory`: 테스트용 메모리 게이트웨이

pub mod executions;
pub mod memory;
pub mod postgres;
pub mod reference;
pub mod trades;
