//! 수집 요청 구간.
//!
//! 한 번의 수집 실행이 가져오려는 시장 데이터의 시간 범위를 나타냅니다.
//! 구간은 항상 반열림 `[start, end)` 입니다.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 반열림 시간 구간 `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ExecutionWindow {
    /// 새 구간을 생성합니다. `start < end` 가 아니면 에러를 반환합니다.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<Self> {
        if start >= end {
            return Err(CoreError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// `end` 에서 `lookback` 만큼 거슬러 올라간 구간을 생성합니다.
    pub fn trailing(end: DateTime<Utc>, lookback: Duration) -> CoreResult<Self> {
        Self::new(end - lookback, end)
    }

    /// 구간 시작 (포함)
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// 구간 끝 (제외)
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// 구간 길이
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// 주어진 시각이 구간에 포함되는지 확인합니다.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }
}

impl fmt::Display for ExecutionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
