//! 증분 수집 사이클.
//!
//! 한 사이클은 다음 순서로 진행됩니다:
//! 1. 완료되지 않은 실행 확인 (정책에 따라 중단 또는 삭제)
//! 2. 수집 구간 결정: `[마지막 완료 실행의 요청 끝, 현재)`
//! 3. 활성 통화쌍 로드
//! 4. 공급자에서 체결 조회
//! 5. 실행, 통화쌍 연관, 체결을 한 트랜잭션으로 저장
//!
//! 실패한 사이클은 실행 기록을 남기지 않으므로 다음 사이클이 같은 구간을 다시 요청합니다.
//! 시간 제한에 걸린 사이클도 마찬가지입니다: 기록 우선 방식에서 먼저 남긴 실행은
//! 제한 시간이 지나면 삭제됩니다.

use crate::clock::{Clock, SystemClock};
use crate::config::{OpenRunPolicy, OrchestratorConfig};
use crate::stats::CollectionStats;
use crate::{CollectorError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tandem_core::{CurrencyPair, ExecutionDraft, ExecutionWindow, Trade};
use tandem_data::{IngestionReceipt, StorageGateway};
use tandem_vendor::MarketDataVendor;
use tracing::{debug, error, info, warn, Instrument};

/// 한 사이클의 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// 데이터를 저장하고 실행을 기록함
    Ingested(CycleReport),
    /// 완료되지 않은 실행이 있어 수집하지 않음
    Blocked { execution_id: i64 },
    /// 새로 가져올 구간이 없음
    UpToDate,
    /// 활성 통화쌍이 없음
    NoInstruments,
}

/// 저장까지 끝난 사이클 보고서.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub execution_id: i64,
    pub window: ExecutionWindow,
    pub stats: CollectionStats,
}

/// 사이클 마감 시각과 원래 제한 시간.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: tokio::time::Instant,
    timeout: Duration,
}

/// 마감이 있으면 그 시각까지만 `fut` 를 기다립니다.
async fn bounded<T>(deadline: Option<Deadline>, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match deadline {
        Some(d) => tokio::time::timeout_at(d.at, fut)
            .await
            .map_err(|_| CollectorError::Timeout(d.timeout))?,
        None => fut.await,
    }
}

/// 수집 사이클 실행기.
pub struct Orchestrator {
    store: Arc<dyn StorageGateway>,
    vendor: Arc<dyn MarketDataVendor>,
    clock: Arc<dyn Clock>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn StorageGateway>,
        vendor: Arc<dyn MarketDataVendor>,
        config: OrchestratorConfig,
    ) -> Self {
        Self::with_clock(store, vendor, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        store: Arc<dyn StorageGateway>,
        vendor: Arc<dyn MarketDataVendor>,
        clock: Arc<dyn Clock>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            vendor,
            clock,
            config,
        }
    }

    /// 한 사이클을 시간 제한 없이 실행합니다.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        self.cycle(None).await
    }

    /// 한 사이클을 `timeout` 안에서 실행합니다. 넘기면 `Timeout`.
    ///
    /// 저장 전 단계는 그대로 취소됩니다 (트랜잭션은 롤백). 기록 우선 방식이면
    /// 먼저 남긴 실행을 삭제한 뒤에 반환합니다.
    pub async fn run_cycle_within(&self, timeout: Duration) -> Result<CycleOutcome> {
        let deadline = Deadline {
            at: tokio::time::Instant::now() + timeout,
            timeout,
        };
        self.cycle(Some(deadline)).await
    }

    async fn cycle(&self, deadline: Option<Deadline>) -> Result<CycleOutcome> {
        let (window, pairs) = match bounded(deadline, self.plan()).await? {
            Ok(planned) => planned,
            Err(outcome) => return Ok(outcome),
        };

        let span = tracing::info_span!("ingest", window = %window, pairs = pairs.len());
        let report = if self.config.journal_runs {
            self.ingest_journaled(window, &pairs, deadline)
                .instrument(span)
                .await?
        } else {
            bounded(deadline, self.ingest(window, &pairs))
                .instrument(span)
                .await?
        };

        report.stats.log_summary("체결 수집");
        Ok(CycleOutcome::Ingested(report))
    }

    /// 수집할 구간과 통화쌍을 정합니다. 수집하지 않을 때는 그 결과를 `Err` 로 돌려줍니다.
    async fn plan(
        &self,
    ) -> Result<std::result::Result<(ExecutionWindow, Vec<CurrencyPair>), CycleOutcome>> {
        if let Some(execution_id) = self.resolve_open_runs().await? {
            return Ok(Err(CycleOutcome::Blocked { execution_id }));
        }

        let now = self.clock.now();
        let window = match self.next_window(now).await? {
            Some(window) => window,
            None => {
                debug!(now = %now, "새로 수집할 구간 없음");
                return Ok(Err(CycleOutcome::UpToDate));
            }
        };

        let pairs = self.store.active_currency_pairs().await?;
        if pairs.is_empty() {
            warn!(window = %window, "활성 통화쌍 없음, 수집 건너뜀");
            return Ok(Err(CycleOutcome::NoInstruments));
        }

        Ok(Ok((window, pairs)))
    }

    /// 열린 실행을 정책대로 처리합니다. 수집을 멈춰야 하면 그 실행 ID를 반환합니다.
    async fn resolve_open_runs(&self) -> Result<Option<i64>> {
        while let Some(open) = self.store.find_oldest_open_run().await? {
            error!(
                execution_id = open.id,
                requested_start = %open.requested_start,
                requested_end = %open.requested_end,
                run_started_at = %open.run_started_at,
                "완료되지 않은 실행 발견 (중단된 수집)"
            );

            match self.config.open_run_policy {
                OpenRunPolicy::Halt => return Ok(Some(open.id)),
                OpenRunPolicy::Discard => {
                    self.store.discard_run(open.id).await?;
                    warn!(execution_id = open.id, "열린 실행 삭제 후 계속 진행");
                }
            }
        }
        Ok(None)
    }

    /// 다음 수집 구간. 비어 있으면 `None`.
    async fn next_window(&self, now: chrono::DateTime<chrono::Utc>) -> Result<Option<ExecutionWindow>> {
        let start = match self.store.find_latest_completed_run().await? {
            Some(latest) => latest.requested_end,
            None => now - self.config.default_lookback(),
        };

        if start >= now {
            return Ok(None);
        }
        Ok(Some(ExecutionWindow::new(start, now)?))
    }

    /// 모든 통화쌍의 체결을 조회합니다. 하나라도 실패하면 사이클 전체가 실패합니다.
    async fn fetch_all(
        &self,
        window: ExecutionWindow,
        pairs: &[CurrencyPair],
        stats: &mut CollectionStats,
    ) -> Result<Vec<Trade>> {
        let mut trades = Vec::new();

        for pair in pairs {
            stats.total += 1;
            match self.vendor.fetch_trades(pair, window).await {
                Ok(fetched) if fetched.is_empty() => {
                    stats.empty += 1;
                }
                Ok(fetched) => {
                    stats.success += 1;
                    stats.fetched += fetched.len();
                    trades.extend(fetched);
                }
                Err(e) => {
                    stats.errors += 1;
                    error!(pair = %pair, error = %e, "체결 조회 실패, 사이클 중단");
                    return Err(e.into());
                }
            }
        }

        Ok(trades)
    }

    /// 기본 방식: 데이터를 모두 가져온 뒤 실행과 함께 한 번에 저장.
    async fn ingest(&self, window: ExecutionWindow, pairs: &[CurrencyPair]) -> Result<CycleReport> {
        let started = Instant::now();
        let mut stats = CollectionStats::new();

        let actual_start = self.clock.now();
        let trades = self.fetch_all(window, pairs, &mut stats).await?;
        let actual_end = self.clock.now();

        let draft = ExecutionDraft::completed(
            window,
            actual_start,
            actual_end,
            pairs.iter().map(|p| p.id).collect(),
        );
        let receipt = self.store.commit_ingestion(draft, &trades).await?;

        Ok(self.report(receipt, window, stats, started))
    }

    /// 기록 우선 방식: 열린 실행을 먼저 남기고 데이터 저장과 함께 완료 처리.
    ///
    /// 조회와 저장은 마감 안에서만 진행하고, 실패나 시간 초과 시 실행을 삭제합니다.
    /// 실행 기록 자체는 마감과 무관하게 끝까지 기다려 ID를 잃지 않습니다.
    async fn ingest_journaled(
        &self,
        window: ExecutionWindow,
        pairs: &[CurrencyPair],
        deadline: Option<Deadline>,
    ) -> Result<CycleReport> {
        let started = Instant::now();
        let mut stats = CollectionStats::new();

        let run = self.store.begin_run(window, self.clock.now()).await?;
        info!(execution_id = run.id(), "실행 기록 시작");

        let persisted = bounded(deadline, async {
            let actual_start = self.clock.now();
            let trades = self.fetch_all(window, pairs, &mut stats).await?;
            let actual_end = self.clock.now();

            let pair_ids: Vec<i32> = pairs.iter().map(|p| p.id).collect();
            let receipt = self
                .store
                .complete_journaled_run(run.id(), actual_start, actual_end, &pair_ids, &trades)
                .await?;
            Ok::<_, CollectorError>(receipt)
        })
        .await;

        match persisted {
            Ok(receipt) => Ok(self.report(receipt, window, stats, started)),
            Err(e) => {
                warn!(execution_id = run.id(), error = %e, "수집 실패, 기록한 실행 삭제");
                if let Err(cleanup) = self.store.discard_run(run.id()).await {
                    error!(execution_id = run.id(), error = %cleanup, "실패한 실행 정리 실패");
                }
                Err(e)
            }
        }
    }

    fn report(
        &self,
        receipt: IngestionReceipt,
        window: ExecutionWindow,
        mut stats: CollectionStats,
        started: Instant,
    ) -> CycleReport {
        stats.inserted = receipt.trades_inserted;
        stats.skipped = stats.fetched.saturating_sub(receipt.trades_inserted);
        stats.elapsed = started.elapsed();

        info!(
            execution_id = receipt.description.id(),
            window = %window,
            inserted = receipt.trades_inserted,
            "실행 기록 완료"
        );

        CycleReport {
            execution_id: receipt.description.id(),
            window,
            stats,
        }
    }
}
