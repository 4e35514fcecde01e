//! 수집 루프.
//!
//! 사이클을 실행하고 정해진 시간만큼 기다리기를 반복합니다.
//! 실패한 사이클은 로그만 남기고 루프는 계속됩니다.
//! 취소는 사이클 사이와 대기 중에 확인합니다.

use crate::config::SchedulerConfig;
use crate::orchestrator::{CycleOutcome, Orchestrator};
use crate::Result;
use std::sync::Arc;
use tandem_core::ingest_span;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// 수집 루프.
pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    config: SchedulerConfig,
    tree_id: i64,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<Orchestrator>, config: SchedulerConfig, tree_id: i64) -> Self {
        Self {
            orchestrator,
            config,
            tree_id,
        }
    }

    /// 사이클 하나를 시간 제한 안에서 실행합니다.
    pub async fn run_once(&self) -> Result<CycleOutcome> {
        let timeout = self.config.cycle_timeout();

        self.orchestrator
            .run_cycle_within(timeout)
            .instrument(ingest_span!("cycle", self.tree_id))
            .await
    }

    /// 취소될 때까지 사이클을 반복합니다. 실행한 사이클 수를 반환합니다.
    pub async fn run_until_cancelled(&self, shutdown: CancellationToken) -> u64 {
        tracing::info!(
            tree_id = self.tree_id,
            interval_secs = self.config.interval_secs,
            "=== 수집 루프 시작 ==="
        );

        let mut cycles = 0;

        while !shutdown.is_cancelled() {
            tracing::info!(cycle = cycles + 1, "=== 사이클 시작 ===");

            match self.run_once().await {
                Ok(outcome) => log_outcome(&outcome),
                Err(e) if e.is_transient() => {
                    tracing::error!(error = %e, "사이클 실패, 다음 주기에 재시도");
                }
                Err(e) => {
                    tracing::error!(error = %e, "사이클 실패");
                }
            }
            cycles += 1;

            tracing::info!(
                "=== 사이클 종료, 다음 실행: {}초 후 ===",
                self.config.interval_secs
            );

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval()) => {}
            }
        }

        tracing::info!(cycles, "종료 신호 수신, 수집 루프 종료");
        cycles
    }
}

fn log_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Ingested(report) => tracing::info!(
            execution_id = report.execution_id,
            window = %report.window,
            inserted = report.stats.inserted,
            "사이클 완료"
        ),
        CycleOutcome::Blocked { execution_id } => tracing::error!(
            execution_id,
            "열린 실행 때문에 수집 중단됨: close-run 또는 discard-run 으로 정리 필요"
        ),
        CycleOutcome::UpToDate => tracing::info!("이미 최신 상태"),
        CycleOutcome::NoInstruments => tracing::warn!("활성 통화쌍 없음"),
    }
}
