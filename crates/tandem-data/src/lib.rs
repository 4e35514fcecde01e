//! 저장소 게이트웨이.
//!
//! 이 crate는 다음을 제공합니다:
//! - `StorageGateway` trait: 실행 기록, 참조 데이터, 시장 데이터의 트랜잭션 단위 읽기/쓰기
//! - PostgreSQL 구현 (`PgGateway`)
//! - 메모리 구현 (`MemoryGateway`, 장애 주입 지원)

pub mod error;
pub mod gateway;
pub mod storage;

pub use error::{DataError, Result};
pub use gateway::{ExecutionStore, IngestionReceipt, MarketDataStore, ReferenceStore, StorageGateway};

pub use storage::memory::{FaultInjection, MemoryGateway};
pub use storage::postgres::{Database, DatabaseConfig, PgGateway};
