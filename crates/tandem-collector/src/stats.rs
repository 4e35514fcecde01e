//! 수집 통계 구조체.

use std::time::Duration;

/// 한 번의 동기화/수집 작업 통계.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionStats {
    /// 총 대상 수 (통화쌍, 거래소, 심볼)
    pub total: usize,
    /// 데이터를 받은 대상 수
    pub success: usize,
    /// 에러 횟수
    pub errors: usize,
    /// 건너뛴 수 (이미 저장된 항목)
    pub skipped: usize,
    /// 빈 데이터 (조회 성공, 데이터 없음)
    pub empty: usize,
    /// 공급자에서 받은 행 수
    pub fetched: usize,
    /// 새로 저장된 행 수
    pub inserted: usize,
    pub elapsed: Duration,
}

impl CollectionStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 데이터를 받은 대상 비율 (%). 대상이 없으면 `None`.
    pub fn success_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.success as f64 * 100.0 / self.total as f64)
    }

    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            total = self.total,
            success = self.success,
            errors = self.errors,
            skipped = self.skipped,
            empty = self.empty,
            fetched = self.fetched,
            inserted = self.inserted,
            success_rate = self.success_rate().map(|r| format!("{r:.1}%")),
            elapsed_ms = self.elapsed.as_millis() as u64,
            "{operation} 완료"
        );
    }
}
