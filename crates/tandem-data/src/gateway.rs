//! 저장소 게이트웨이 인터페이스.
//!
//! 모든 쓰기 작업은 하나의 트랜잭션 안에서 원자적으로 수행되고,
//! 여러 쿼리로 이루어진 읽기는 각자의 트랜잭션 안에서 한 시점의 스냅샷을 봅니다.
//! 일치하는 행이 없으면 `None`/빈 컬렉션을 반환하며,
//! 통화쌍 집합이 빠진 `ExecutionDescription` 은 반환하지 않습니다.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tandem_core::{
    CurrencyPair, CurrencyType, Exchange, Execution, ExecutionCurrencyPair, ExecutionDescription,
    ExecutionDraft, ExecutionWindow, NewExchange, NewSymbol, Symbol, Trade,
};

/// 수집 결과 저장 영수증.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReceipt {
    /// 저장된 실행 기록
    pub description: ExecutionDescription,
    /// 새로 저장된 체결 수 (중복 제외)
    pub trades_inserted: usize,
}

/// 실행 기록 저장소.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// 완료 시각이 비어 있는 새 실행을 저장합니다.
    async fn begin_run(
        &self,
        window: ExecutionWindow,
        run_started_at: DateTime<Utc>,
    ) -> Result<ExecutionDescription>;

    /// 실행의 시작/완료 시각을 기록합니다.
    ///
    /// 실행이 없으면 `NotFound`, 이미 완료된 실행이면 `InvalidState`.
    async fn complete_run(
        &self,
        execution_id: i64,
        actual_start: DateTime<Utc>,
        actual_end: DateTime<Utc>,
    ) -> Result<()>;

    /// 완료되지 않은 실행과 그 연관을 삭제합니다.
    async fn discard_run(&self, execution_id: i64) -> Result<()>;

    /// 완료되지 않은 실행 중 ID가 가장 작은 것.
    async fn find_oldest_open_run(&self) -> Result<Option<Execution>>;

    /// 완료되지 않은 실행 중 ID가 가장 작은 것과 그 통화쌍.
    async fn oldest_open_run_description(&self) -> Result<Option<ExecutionDescription>>;

    /// 완료된 실행 중 요청 구간 끝이 가장 늦은 것 (동률이면 ID가 큰 것).
    async fn find_latest_completed_run(&self) -> Result<Option<Execution>>;

    /// 실행과 통화쌍 연관 전체를 하나의 트랜잭션으로 저장합니다.
    async fn record_run(&self, draft: ExecutionDraft) -> Result<ExecutionDescription>;

    /// 기존 실행에 통화쌍 연관을 추가합니다.
    async fn insert_execution_currency_pairs(
        &self,
        execution_id: i64,
        currency_pair_ids: &[i32],
    ) -> Result<Vec<ExecutionCurrencyPair>>;

    /// ID로 실행 기록을 조회합니다.
    async fn execution_description_by_id(
        &self,
        execution_id: i64,
    ) -> Result<Option<ExecutionDescription>>;

    /// 요청 구간 끝이 주어진 날짜(UTC)에 속하는 모든 실행.
    async fn find_runs_covering_date(&self, date: NaiveDate) -> Result<Vec<ExecutionDescription>>;

    /// 실행, 통화쌍 연관, 체결을 하나의 트랜잭션으로 저장합니다.
    async fn commit_ingestion(
        &self,
        draft: ExecutionDraft,
        trades: &[Trade],
    ) -> Result<IngestionReceipt>;

    /// 미리 기록된 실행에 체결과 통화쌍을 저장하고 완료 처리합니다 (단일 트랜잭션).
    async fn complete_journaled_run(
        &self,
        execution_id: i64,
        actual_start: DateTime<Utc>,
        actual_end: DateTime<Utc>,
        currency_pair_ids: &[i32],
        trades: &[Trade],
    ) -> Result<IngestionReceipt>;
}

/// 참조 데이터 저장소.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn currency_types(&self) -> Result<Vec<CurrencyType>>;

    /// 거래소를 저장합니다. 이미 있는 코드는 건너뜁니다. 새로 저장된 수를 반환합니다.
    async fn insert_exchanges(&self, exchanges: &[NewExchange]) -> Result<usize>;

    /// 심볼을 저장합니다. 이미 있는 코드는 건너뜁니다. 새로 저장된 수를 반환합니다.
    async fn insert_symbols(&self, symbols: &[NewSymbol]) -> Result<usize>;

    async fn exchanges(&self) -> Result<Vec<Exchange>>;

    async fn symbols(&self) -> Result<Vec<Symbol>>;

    /// 수집 대상으로 활성화된 통화쌍.
    async fn active_currency_pairs(&self) -> Result<Vec<CurrencyPair>>;
}

/// 시장 데이터 저장소.
#[async_trait]
pub trait MarketDataStore: Send + Sync {
    /// 실행에 속한 체결을 저장합니다. 이미 있는 키는 건너뜁니다. 새로 저장된 수를 반환합니다.
    async fn insert_trades(&self, execution_id: i64, trades: &[Trade]) -> Result<usize>;

    /// 통화쌍의 구간 내 체결을 시각 순으로 조회합니다.
    async fn trades_in_window(
        &self,
        currency_pair_id: i32,
        window: ExecutionWindow,
    ) -> Result<Vec<Trade>>;
}

/// 세 저장소를 모두 제공하는 게이트웨이.
pub trait StorageGateway: ExecutionStore + ReferenceStore + MarketDataStore {}

impl<T> StorageGateway for T where T: ExecutionStore + ReferenceStore + MarketDataStore {}

/// UTC 날짜 하루의 반열림 구간 `[00:00, 다음날 00:00)`.
pub fn utc_day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(chrono::NaiveTime::default()).and_utc();
    (start, start + chrono::Duration::days(1))
}
