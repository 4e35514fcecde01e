//! 도메인 레코드 에러 타입.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// 도메인 값 생성 시 발생하는 에러.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// 시작 시각이 종료 시각보다 같거나 늦은 구간
    #[error("잘못된 구간: [{start}, {end})")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// 도메인 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
