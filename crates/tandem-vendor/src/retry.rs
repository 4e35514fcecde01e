//! 재시도 정책.
//!
//! 재시도 가능한 에러에 대해 지수 백오프로 제한된 횟수만큼 다시 시도합니다.
//! 에러가 권장 대기 시간을 제시하면 그 값을 쓰되 `max_delay` 를 넘지 않습니다.

use crate::error::VendorError;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// 재시도 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// 최초 시도를 포함한 최대 시도 횟수
    pub max_attempts: u32,
    /// 첫 재시도 대기 시간 (밀리초)
    pub initial_delay_ms: u64,
    /// 최대 대기 시간 (밀리초)
    pub max_delay_ms: u64,
    /// 재시도마다 곱하는 배수
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// 재시도 없이 한 번만 시도합니다.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// `attempt` 번째 실패 후 대기 시간 (1부터).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
        let millis = (self.initial_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        Duration::from_millis(millis as u64)
    }
}

/// 재시도 가능한 에러에 한해 작업을 다시 시도합니다.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, f: F) -> Result<T, VendorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, VendorError>>,
{
    with_retry_if(config, operation, f, VendorError::is_retryable).await
}

/// 조건 함수가 참인 에러에 한해 작업을 다시 시도합니다.
pub async fn with_retry_if<T, F, Fut, P>(
    config: &RetryConfig,
    operation: &str,
    mut f: F,
    should_retry: P,
) -> Result<T, VendorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, VendorError>>,
    P: Fn(&VendorError) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && should_retry(&e) => {
                let delay = e
                    .retry_delay()
                    .map(|suggested| suggested.max(config.backoff(attempt)))
                    .unwrap_or_else(|| config.backoff(attempt))
                    .min(config.max_delay());
                debug!(
                    operation = operation,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "재시도 예정"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if attempt > 1 {
                    warn!(operation = operation, attempts = attempt, error = %e, "재시도 후 최종 실패");
                }
                return Err(e);
            }
        }
    }
}
