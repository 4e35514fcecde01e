//! Tandem 수집기 CLI.

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tandem_collector::{modules, CollectorConfig, CollectorError, Orchestrator, Scheduler};
use tandem_core::{init_logging, ExecutionDescription, LogConfig, LogFormat};
use tandem_data::{Database, PgGateway, StorageGateway};
use tandem_vendor::{KaikoClient, MarketDataVendor};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "tandem-collector")]
#[command(about = "Tandem incremental market data collector", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 트리 ID (config/tree-{ID}.toml)
    tree_id: i64,

    #[command(subcommand)]
    command: Option<Commands>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// 로그 형식
    #[arg(long, global = true, default_value = "pretty", value_parser = ["pretty", "json", "compact"])]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 데몬 모드: 주기적으로 수집 사이클 실행 (기본값)
    Daemon,

    /// 수집 사이클 한 번 실행
    RunOnce,

    /// 거래소 목록 동기화
    SyncExchanges,

    /// 심볼(자산) 목록 동기화
    SyncSymbols,

    /// 완료되지 않은 실행 조회
    OpenRuns,

    /// 요청 구간 끝이 주어진 날짜(UTC)인 실행 조회
    Runs {
        /// 날짜 (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },

    /// 실행 상세 조회
    ShowRun { id: i64 },

    /// 열린 실행을 완료 처리 (구간 수집 완료로 인정)
    CloseRun { id: i64 },

    /// 열린 실행 삭제 (다음 사이클이 같은 구간을 다시 수집)
    DiscardRun { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 로깅 초기화
    let format: LogFormat = cli
        .log_format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let log_config = LogConfig::workspace(&cli.log_level)
        .with_format(format)
        .with_span_events(matches!(cli.log_level.as_str(), "debug" | "trace"));
    init_logging(&log_config)?;

    tracing::info!(tree_id = cli.tree_id, "Tandem Collector 시작");

    // 설정 로드
    let config = CollectorConfig::load(cli.tree_id).context("설정 로드 실패")?;
    tracing::debug!(vendor = ?config.vendor, "설정 로드 완료");

    // DB 연결
    let db = Database::connect(&config.database).await?;
    db.health_check().await.context("DB 상태 확인 실패")?;
    db.migrate().await?;
    tracing::info!("데이터베이스 연결 성공");

    let store: Arc<dyn StorageGateway> = Arc::new(PgGateway::new(db.clone()));
    let vendor: Arc<dyn MarketDataVendor> = Arc::new(KaikoClient::new(config.vendor.clone())?);

    let result = run_command(
        cli.command.unwrap_or(Commands::Daemon),
        &config,
        store,
        vendor,
    )
    .await;

    db.close().await;
    tracing::info!("Tandem Collector 종료");

    result
}

async fn run_command(
    command: Commands,
    config: &CollectorConfig,
    store: Arc<dyn StorageGateway>,
    vendor: Arc<dyn MarketDataVendor>,
) -> anyhow::Result<()> {
    match command {
        Commands::Daemon => {
            let scheduler = build_scheduler(config, store, vendor);
            let shutdown = CancellationToken::new();

            let signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("종료 신호 수신, 현재 사이클 완료 후 종료");
                    signal.cancel();
                }
            });

            scheduler.run_until_cancelled(shutdown).await;
        }
        Commands::RunOnce => {
            let scheduler = build_scheduler(config, store, vendor);
            let outcome = scheduler.run_once().await?;
            println!("{:?}", outcome);
        }
        Commands::SyncExchanges => {
            let stats = modules::sync_exchanges(store.as_ref(), vendor.as_ref()).await?;
            stats.log_summary("거래소 동기화");
        }
        Commands::SyncSymbols => {
            let stats = modules::sync_symbols(store.as_ref(), vendor.as_ref()).await?;
            stats.log_summary("심볼 동기화");
        }
        Commands::OpenRuns => match store.oldest_open_run_description().await? {
            Some(run) => print_run(&run)?,
            None => println!("열린 실행 없음"),
        },
        Commands::Runs { date } => {
            let runs = store.find_runs_covering_date(date).await?;
            if runs.is_empty() {
                println!("{} 에 끝나는 실행 없음", date);
            }
            for run in &runs {
                print_run(run)?;
            }
        }
        Commands::ShowRun { id } => {
            let run = find_run(store.as_ref(), id).await?;
            print_run(&run)?;
        }
        Commands::CloseRun { id } => {
            let run = find_run(store.as_ref(), id).await?;
            store
                .complete_run(id, run.execution.run_started_at, Utc::now())
                .await
                .map_err(CollectorError::from)?;
            tracing::warn!(execution_id = id, "운영자가 실행을 완료 처리함");
        }
        Commands::DiscardRun { id } => {
            store
                .discard_run(id)
                .await
                .map_err(CollectorError::from)?;
            tracing::warn!(execution_id = id, "운영자가 실행을 삭제함");
        }
    }

    Ok(())
}

fn build_scheduler(
    config: &CollectorConfig,
    store: Arc<dyn StorageGateway>,
    vendor: Arc<dyn MarketDataVendor>,
) -> Scheduler {
    let orchestrator = Orchestrator::new(store, vendor, config.orchestrator.clone());
    Scheduler::new(
        Arc::new(orchestrator),
        config.scheduler.clone(),
        config.tree_id,
    )
}

async fn find_run(
    store: &dyn StorageGateway,
    id: i64,
) -> Result<ExecutionDescription, CollectorError> {
    store
        .execution_description_by_id(id)
        .await?
        .ok_or_else(|| CollectorError::NotFound(format!("execution {}", id)))
}

fn print_run(run: &ExecutionDescription) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(run)?);
    Ok(())
}
