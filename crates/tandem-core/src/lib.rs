//! # Tandem Core
//!
//! 시장 데이터 수집 시스템의 핵심 도메인 레코드를 제공합니다.
//!
//! 이 크레이트는 수집 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 수집 실행(Execution) 기록 및 통화쌍 연관
//! - 요청 데이터 구간 (`ExecutionWindow`)
//! - 참조 데이터 (거래소, 심볼, 통화 유형, 통화쌍)
//! - 체결 데이터 행
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
