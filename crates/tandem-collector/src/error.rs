//! 에러 타입 정의.

use tandem_data::DataError;
use tandem_vendor::VendorError;
use thiserror::Error;

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러 (시작 시 치명적)
    #[error("Configuration error: {0}")]
    Config(String),

    /// 데이터 공급자 에러 (이번 사이클만 포기)
    #[error("Vendor error: {0}")]
    Vendor(#[from] VendorError),

    /// 저장소 에러 (이번 사이클만 포기)
    #[error("Persistence error: {0}")]
    Persistence(DataError),

    /// 요청한 실행/엔티티 없음
    #[error("Not found: {0}")]
    NotFound(String),

    /// 현재 상태에서 할 수 없는 작업 (예: 이미 완료된 실행 close-run)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 사이클 시간 초과
    #[error("Cycle timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// 도메인 값 검증 실패
    #[error("Invalid value: {0}")]
    Invalid(#[from] tandem_core::CoreError),
}

impl CollectorError {
    /// 다음 사이클에서 재시도하면 되는 에러인지 확인
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Vendor(_) | Self::Persistence(_) | Self::Timeout(_)
        )
    }
}

impl From<DataError> for CollectorError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::NotFound(what) => Self::NotFound(what),
            DataError::InvalidState(what) => Self::InvalidState(what),
            other => Self::Persistence(other),
        }
    }
}

impl From<config::ConfigError> for CollectorError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_not_found_maps_to_not_found() {
        let err: CollectorError = DataError::NotFound("execution 9".into()).into();
        assert!(matches!(err, CollectorError::NotFound(ref what) if what == "execution 9"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_invalid_state_is_not_retried() {
        let err: CollectorError =
            DataError::InvalidState("execution 3 already completed".into()).into();
        assert!(matches!(err, CollectorError::InvalidState(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_other_data_errors_are_persistence() {
        let err: CollectorError = DataError::Persistence("commit failed".into()).into();
        assert!(matches!(err, CollectorError::Persistence(_)));
        assert!(err.is_transient());
    }
}
