//! 수집 사이클 통합 테스트 (메모리 저장소 + 가짜 공급자).

mod common;

use chrono::Duration;
use common::{at, trade, Harness};
use tandem_collector::{CollectorError, CycleOutcome, OpenRunPolicy, OrchestratorConfig};
use tandem_core::{ExecutionDraft, ExecutionWindow};
use tandem_data::{ExecutionStore, MarketDataStore};

fn journaled() -> OrchestratorConfig {
    OrchestratorConfig {
        journal_runs: true,
        ..OrchestratorConfig::default()
    }
}

#[tokio::test]
async fn test_first_cycle_uses_default_lookback() {
    let now = at(2024, 3, 1, 12, 0);
    let h = Harness::new(now);
    let pair = h.active_pair("btc");
    h.vendor.add_trades(vec![
        trade(pair.id, "t1", now - Duration::minutes(30)),
        trade(pair.id, "t2", now - Duration::minutes(10)),
        // 구간 밖
        trade(pair.id, "old", now - Duration::hours(2)),
    ]);

    let outcome = h.orchestrator(OrchestratorConfig::default()).run_cycle().await.unwrap();

    let CycleOutcome::Ingested(report) = outcome else {
        panic!("expected ingestion, got {:?}", outcome);
    };
    let expected = ExecutionWindow::new(now - Duration::hours(1), now).unwrap();
    assert_eq!(report.window, expected);
    assert_eq!(report.stats.fetched, 2);
    assert_eq!(report.stats.inserted, 2);

    let runs = h.store.executions().unwrap();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.requested_start, expected.start());
    assert_eq!(run.requested_end, expected.end());
    // 실제 조회 시작/끝 시각 (시계는 읽을 때마다 1초 진행)
    assert_eq!(run.run_started_at, now + Duration::seconds(1));
    assert_eq!(run.run_finished_at, Some(now + Duration::seconds(2)));

    let description = h
        .store
        .execution_description_by_id(run.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(description.currency_pair_ids().into_iter().collect::<Vec<_>>(), vec![pair.id]);
    assert_eq!(h.store.trade_execution_ids().unwrap().into_iter().collect::<Vec<_>>(), vec![run.id]);
}

#[tokio::test]
async fn test_next_window_starts_at_latest_requested_end() {
    let boundary = at(2024, 1, 1, 0, 0);
    let h = Harness::frozen(boundary + Duration::minutes(10));
    h.active_pair("eth");

    let previous = ExecutionWindow::new(boundary - Duration::hours(1), boundary).unwrap();
    h.store
        .record_run(ExecutionDraft::completed(previous, boundary, boundary, vec![]))
        .await
        .unwrap();

    let outcome = h.orchestrator(OrchestratorConfig::default()).run_cycle().await.unwrap();

    let CycleOutcome::Ingested(report) = outcome else {
        panic!("expected ingestion, got {:?}", outcome);
    };
    assert_eq!(report.window.start(), boundary);
    assert_eq!(report.window.end(), boundary + Duration::minutes(10));
    assert_eq!(report.stats.empty, 1);
}

#[tokio::test]
async fn test_vendor_failure_leaves_no_execution_and_retries_same_window() {
    let boundary = at(2024, 1, 1, 0, 0);
    let h = Harness::frozen(boundary + Duration::minutes(5));
    let pair = h.active_pair("btc");
    let previous = ExecutionWindow::new(boundary - Duration::hours(1), boundary).unwrap();
    h.store
        .record_run(ExecutionDraft::completed(previous, boundary, boundary, vec![]))
        .await
        .unwrap();

    let orchestrator = h.orchestrator(OrchestratorConfig::default());

    h.vendor.set_failing(true);
    let err = orchestrator.run_cycle().await.unwrap_err();
    assert!(matches!(err, CollectorError::Vendor(_)));
    assert!(err.is_transient());
    assert_eq!(h.store.executions().unwrap().len(), 1);
    assert_eq!(h.store.trade_count().unwrap(), 0);

    h.vendor.set_failing(false);
    h.vendor.add_trades(vec![trade(pair.id, "t1", boundary + Duration::minutes(1))]);
    let outcome = orchestrator.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Ingested(_)));

    let requests = h.vendor.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].1, requests[1].1);
    assert_eq!(requests[1].1.start(), boundary);
    assert_eq!(h.store.executions().unwrap().len(), 2);
}

#[tokio::test]
async fn test_persistence_failure_records_nothing() {
    let now = at(2024, 3, 1, 12, 0);
    let h = Harness::new(now);
    let pair = h.active_pair("btc");
    h.vendor.add_trades(vec![trade(pair.id, "t1", now - Duration::minutes(1))]);
    h.store.faults().fail_trade_writes(true);

    let err = h
        .orchestrator(OrchestratorConfig::default())
        .run_cycle()
        .await
        .unwrap_err();

    assert!(matches!(err, CollectorError::Persistence(_)));
    assert!(h.store.executions().unwrap().is_empty());
    assert_eq!(h.store.trade_count().unwrap(), 0);
}

#[tokio::test]
async fn test_open_run_halts_without_fetching() {
    let now = at(2024, 3, 1, 12, 0);
    let h = Harness::new(now);
    h.active_pair("btc");
    let stale = ExecutionWindow::new(now - Duration::hours(3), now - Duration::hours(2)).unwrap();
    let open = h.store.begin_run(stale, now - Duration::hours(2)).await.unwrap();

    let outcome = h.orchestrator(OrchestratorConfig::default()).run_cycle().await.unwrap();

    assert_eq!(outcome, CycleOutcome::Blocked { execution_id: open.id() });
    assert!(h.vendor.requests().is_empty());
    assert_eq!(h.store.executions().unwrap().len(), 1);
}

#[tokio::test]
async fn test_discard_policy_removes_open_run_and_continues() {
    let now = at(2024, 3, 1, 12, 0);
    let h = Harness::new(now);
    h.active_pair("btc");
    let stale = ExecutionWindow::new(now - Duration::hours(3), now - Duration::hours(2)).unwrap();
    let open = h.store.begin_run(stale, now - Duration::hours(2)).await.unwrap();

    let config = OrchestratorConfig {
        open_run_policy: OpenRunPolicy::Discard,
        ..OrchestratorConfig::default()
    };
    let outcome = h.orchestrator(config).run_cycle().await.unwrap();

    let CycleOutcome::Ingested(report) = outcome else {
        panic!("expected ingestion, got {:?}", outcome);
    };
    assert_ne!(report.execution_id, open.id());
    assert!(h.store.find_oldest_open_run().await.unwrap().is_none());
    assert!(h.store.execution_description_by_id(open.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_up_to_date_when_latest_run_ends_now() {
    let now = at(2024, 3, 1, 12, 0);
    let h = Harness::frozen(now);
    h.active_pair("btc");
    let previous = ExecutionWindow::new(now - Duration::hours(1), now).unwrap();
    h.store
        .record_run(ExecutionDraft::completed(previous, now, now, vec![]))
        .await
        .unwrap();

    let outcome = h.orchestrator(OrchestratorConfig::default()).run_cycle().await.unwrap();

    assert_eq!(outcome, CycleOutcome::UpToDate);
    assert!(h.vendor.requests().is_empty());
}

#[tokio::test]
async fn test_no_active_pairs() {
    let h = Harness::new(at(2024, 3, 1, 12, 0));
    h.store
        .seed_currency_pair("cbse", "btc", "usd", "spot", false)
        .unwrap();

    let outcome = h.orchestrator(OrchestratorConfig::default()).run_cycle().await.unwrap();

    assert_eq!(outcome, CycleOutcome::NoInstruments);
    assert!(h.store.executions().unwrap().is_empty());
}

#[tokio::test]
async fn test_overlapping_trades_are_not_duplicated() {
    let boundary = at(2024, 1, 1, 0, 0);
    let h = Harness::frozen(boundary);
    let pair = h.active_pair("btc");
    let ts = boundary - Duration::minutes(5);
    h.vendor.add_trades(vec![trade(pair.id, "t1", ts)]);

    let config = OrchestratorConfig::default();
    h.orchestrator(config.clone()).run_cycle().await.unwrap();

    // 같은 체결을 다시 내려주는 공급자라도 저장은 한 번뿐
    h.store
        .insert_trades(h.store.executions().unwrap()[0].id, &[trade(pair.id, "t1", ts)])
        .await
        .unwrap();
    assert_eq!(h.store.trade_count().unwrap(), 1);
}

#[tokio::test]
async fn test_journaled_cycle_completes_run() {
    let now = at(2024, 3, 1, 12, 0);
    let h = Harness::new(now);
    let btc = h.active_pair("btc");
    let eth = h.active_pair("eth");
    h.vendor.add_trades(vec![
        trade(btc.id, "b1", now - Duration::minutes(20)),
        trade(eth.id, "e1", now - Duration::minutes(15)),
    ]);

    let outcome = h.orchestrator(journaled()).run_cycle().await.unwrap();

    let CycleOutcome::Ingested(report) = outcome else {
        panic!("expected ingestion, got {:?}", outcome);
    };
    assert_eq!(report.stats.inserted, 2);

    let description = h
        .store
        .execution_description_by_id(report.execution_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!description.execution.is_open());
    assert_eq!(description.execution.run_started_at, now + Duration::seconds(2));
    assert_eq!(
        description.execution.run_finished_at,
        Some(now + Duration::seconds(3))
    );
    assert_eq!(description.currency_pairs.len(), 2);
    assert!(h.store.find_oldest_open_run().await.unwrap().is_none());
}

#[tokio::test]
async fn test_journaled_failure_discards_run() {
    let h = Harness::new(at(2024, 3, 1, 12, 0));
    h.active_pair("btc");
    h.vendor.set_failing(true);

    let err = h.orchestrator(journaled()).run_cycle().await.unwrap_err();

    assert!(matches!(err, CollectorError::Vendor(_)));
    assert!(h.store.executions().unwrap().is_empty());
    assert!(h.store.find_oldest_open_run().await.unwrap().is_none());
}
