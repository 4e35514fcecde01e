//! 현재 시각 공급자.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// 현재 시각을 알려주는 시계.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 시스템 시계.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 호출할 때마다 정해진 간격만큼 앞으로 가는 시계 (테스트, 재현용).
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_step(start, Duration::zero())
    }

    /// `now()` 를 읽을 때마다 `step` 만큼 진행합니다.
    pub fn with_step(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }

    /// 시각을 앞으로 옮깁니다.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut current) = self.current.lock() {
            *current += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.current.lock() {
            Ok(mut current) => {
                let now = *current;
                *current += self.step;
                now
            }
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_steps() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::with_step(start, Duration::seconds(2));

        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start + Duration::seconds(2));

        clock.advance(Duration::minutes(1));
        assert_eq!(clock.now(), start + Duration::seconds(64));
    }
}
