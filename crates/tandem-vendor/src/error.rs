//! 데이터 공급자 에러 타입.

use std::time::Duration;
use thiserror::Error;

/// 데이터 공급자 관련 에러.
#[derive(Debug, Error)]
pub enum VendorError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 인증/권한 에러 (API 키 누락 또는 무효)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 요청 한도 초과
    #[error("Rate limit exceeded")]
    RateLimited,

    /// 공급자 서버 에러 (5xx)
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// API 에러 응답
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 공급자가 알지 못하는 상품
    #[error("Instrument not found: {0}")]
    InstrumentNotFound(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 페이지 한도 초과
    #[error("Pagination limit of {0} pages exceeded")]
    PageLimitExceeded(usize),

    /// 잘못된 설정
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl VendorError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VendorError::NetworkError(_)
                | VendorError::RateLimited
                | VendorError::ServerError { .. }
                | VendorError::Timeout(_)
        )
    }

    /// 권장 재시도 대기 시간.
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            VendorError::RateLimited => Some(Duration::from_secs(60)),
            VendorError::NetworkError(_) => Some(Duration::from_secs(1)),
            VendorError::ServerError { .. } => Some(Duration::from_secs(2)),
            VendorError::Timeout(_) => Some(Duration::from_millis(500)),
            _ => None,
        }
    }

    /// 인증 에러인지 확인.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, VendorError::Unauthorized(_))
    }

    /// HTTP 상태 코드와 응답 본문으로 에러를 만듭니다.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => VendorError::Unauthorized(message),
            404 => VendorError::InstrumentNotFound(message),
            429 => VendorError::RateLimited,
            500..=599 => VendorError::ServerError { status, message },
            _ => VendorError::ApiError { status, message },
        }
    }
}

impl From<reqwest::Error> for VendorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            VendorError::Timeout(err.to_string())
        } else if err.is_connect() {
            VendorError::NetworkError(err.to_string())
        } else if err.is_decode() {
            VendorError::ParseError(err.to_string())
        } else {
            VendorError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for VendorError {
    fn from(err: serde_json::Error) -> Self {
        VendorError::ParseError(err.to_string())
    }
}

pub type VendorResult<T> = Result<T, VendorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(VendorError::from_status(401, String::new()).is_auth_error());
        assert!(VendorError::from_status(403, String::new()).is_auth_error());
        assert!(matches!(
            VendorError::from_status(429, String::new()),
            VendorError::RateLimited
        ));
        assert!(matches!(
            VendorError::from_status(503, String::new()),
            VendorError::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            VendorError::from_status(400, String::new()),
            VendorError::ApiError { status: 400, .. }
        ));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(VendorError::RateLimited.is_retryable());
        assert!(VendorError::Timeout("t".into()).is_retryable());
        assert!(!VendorError::Unauthorized("k".into()).is_retryable());
        assert!(!VendorError::ParseError("p".into()).is_retryable());
        assert!(VendorError::Unauthorized("k".into()).retry_delay().is_none());
    }
}
