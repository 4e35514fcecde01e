//! 수집 실행 기록.
//!
//! - `Execution` - 한 번의 수집 시도 메타데이터
//! - `ExecutionCurrencyPair` - 실행과 통화쌍의 연관
//! - `ExecutionDescription` - 실행 + 연관 통화쌍 집합 (조회 시 조인)
//! - `ExecutionDraft` - 아직 저장되지 않은 실행

use crate::error::CoreResult;
use crate::types::ExecutionWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 한 번의 수집 시도.
///
/// `run_finished_at` 이 `None` 이면 실행 중이거나 중단된 실행입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// 저장소가 부여한 식별자
    pub id: i64,
    /// 실행 시작 시각
    pub run_started_at: DateTime<Utc>,
    /// 실행 완료 시각 (실행 중이면 None)
    pub run_finished_at: Option<DateTime<Utc>>,
    /// 요청 데이터 구간 시작
    pub requested_start: DateTime<Utc>,
    /// 요청 데이터 구간 끝
    pub requested_end: DateTime<Utc>,
}

impl Execution {
    /// 완료되지 않은 실행인지 확인합니다.
    pub fn is_open(&self) -> bool {
        self.run_finished_at.is_none()
    }

    /// 요청 데이터 구간.
    pub fn requested_window(&self) -> CoreResult<ExecutionWindow> {
        ExecutionWindow::new(self.requested_start, self.requested_end)
    }
}

/// 실행이 다룬 통화쌍 하나.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExecutionCurrencyPair {
    pub execution_id: i64,
    pub currency_pair_id: i32,
}

/// 실행과 그 실행이 다룬 통화쌍 집합.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionDescription {
    pub execution: Execution,
    pub currency_pairs: Vec<ExecutionCurrencyPair>,
}

impl ExecutionDescription {
    pub fn new(execution: Execution, currency_pairs: Vec<ExecutionCurrencyPair>) -> Self {
        Self {
            execution,
            currency_pairs,
        }
    }

    pub fn id(&self) -> i64 {
        self.execution.id
    }

    /// 연관 통화쌍 ID 집합 (순서 무관 비교용).
    pub fn currency_pair_ids(&self) -> BTreeSet<i32> {
        self.currency_pairs
            .iter()
            .map(|ecp| ecp.currency_pair_id)
            .collect()
    }
}

/// 저장 전 실행.
///
/// 저장소가 ID를 부여하면 `ExecutionDescription` 이 됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionDraft {
    pub run_started_at: DateTime<Utc>,
    pub run_finished_at: Option<DateTime<Utc>>,
    pub window: ExecutionWindow,
    pub currency_pair_ids: Vec<i32>,
}

impl ExecutionDraft {
    /// 아직 완료되지 않은 실행.
    pub fn open(window: ExecutionWindow, run_started_at: DateTime<Utc>) -> Self {
        Self {
            run_started_at,
            run_finished_at: None,
            window,
            currency_pair_ids: Vec::new(),
        }
    }

    /// 데이터 저장까지 끝난 실행.
    pub fn completed(
        window: ExecutionWindow,
        run_started_at: DateTime<Utc>,
        run_finished_at: DateTime<Utc>,
        currency_pair_ids: Vec<i32>,
    ) -> Self {
        Self {
            run_started_at,
            run_finished_at: Some(run_finished_at),
            window,
            currency_pair_ids,
        }
    }

    /// 부여받은 ID로 실행 기록을 만듭니다.
    pub fn into_description(self, id: i64) -> ExecutionDescription {
        let currency_pairs = self
            .currency_pair_ids
            .iter()
            .map(|&currency_pair_id| ExecutionCurrencyPair {
                execution_id: id,
                currency_pair_id,
            })
            .collect();

        ExecutionDescription::new(
            Execution {
                id,
                run_started_at: self.run_started_at,
                run_finished_at: self.run_finished_at,
                requested_start: self.window.start(),
                requested_end: self.window.end(),
            },
            currency_pairs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_draft_into_description() {
        let window = ExecutionWindow::new(ts(0), ts(6)).unwrap();
        let draft = ExecutionDraft::completed(window, ts(7), ts(8), vec![3, 1, 2]);

        let description = draft.into_description(42);
        assert_eq!(description.id(), 42);
        assert!(!description.execution.is_open());
        assert_eq!(description.execution.requested_start, ts(0));
        assert_eq!(description.execution.requested_end, ts(6));
        assert!(description
            .currency_pairs
            .iter()
            .all(|ecp| ecp.execution_id == 42));
        assert_eq!(
            description.currency_pair_ids().into_iter().collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_open_draft() {
        let window = ExecutionWindow::new(ts(0), ts(1)).unwrap();
        let description = ExecutionDraft::open(window, ts(2)).into_description(1);
        assert!(description.execution.is_open());
        assert!(description.currency_pairs.is_empty());
        assert_eq!(description.execution.requested_window().unwrap(), window);
    }

    #[test]
    fn test_open_run_serializes_null_finish() {
        let window = ExecutionWindow::new(ts(0), ts(1)).unwrap();
        let description = ExecutionDraft::open(window, ts(2)).into_description(9);

        let json = serde_json::to_value(&description).unwrap();
        assert_eq!(json["execution"]["id"], 9);
        assert!(json["execution"]["run_finished_at"].is_null());

        let back: ExecutionDescription = serde_json::from_value(json).unwrap();
        assert_eq!(back, description);
    }
}
