//! 시장 데이터 공급자 연결.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - `MarketDataVendor` trait: 거래소, 자산, 체결 조회 인터페이스
//! - Kaiko REST 커넥터 (페이지네이션, API 키 인증)
//! - 지수 백오프 재시도 정책

pub mod connector;
pub mod error;
pub mod retry;
pub mod traits;

pub use connector::{KaikoClient, KaikoConfig};
pub use error::*;
pub use retry::{with_retry, with_retry_if, RetryConfig};
pub use traits::*;
