//! 메모리 저장소 구현.
//!
//! 테스트와 로컬 실행용입니다. 모든 쓰기는 상태 사본에 적용한 뒤 성공했을 때만
//! 교체하므로, 중간에 실패한 작업은 아무 흔적도 남기지 않습니다.

use crate::error::{DataError, Result};
use crate::gateway::{
    utc_day_bounds, ExecutionStore, IngestionReceipt, MarketDataStore, ReferenceStore,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tandem_core::{
    CurrencyPair, CurrencyType, Exchange, Execution, ExecutionCurrencyPair, ExecutionDescription,
    ExecutionDraft, ExecutionWindow, NewExchange, NewSymbol, Symbol, Trade,
};

/// 체결 고유 키: (통화쌍, 체결 시각, 공급자 체결 ID).
type TradeKey = (i32, DateTime<Utc>, String);

/// 쓰기 장애 주입 스위치.
#[derive(Debug, Default)]
pub struct FaultInjection {
    fail_association_writes: AtomicBool,
    fail_trade_writes: AtomicBool,
}

impl FaultInjection {
    /// 실행-통화쌍 연관 쓰기를 실패시킵니다.
    pub fn fail_association_writes(&self, fail: bool) {
        self.fail_association_writes.store(fail, Ordering::SeqCst);
    }

    /// 체결 쓰기를 실패시킵니다.
    pub fn fail_trade_writes(&self, fail: bool) {
        self.fail_trade_writes.store(fail, Ordering::SeqCst);
    }

    fn check_associations(&self) -> Result<()> {
        if self.fail_association_writes.load(Ordering::SeqCst) {
            return Err(DataError::QueryError(
                "injected failure: execution_currency_pairs".to_string(),
            ));
        }
        Ok(())
    }

    fn check_trades(&self) -> Result<()> {
        if self.fail_trade_writes.load(Ordering::SeqCst) {
            return Err(DataError::QueryError("injected failure: trades".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct StoredPair {
    pair: CurrencyPair,
    active: bool,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    currency_types: Vec<CurrencyType>,
    exchanges: Vec<Exchange>,
    symbols: Vec<Symbol>,
    currency_pairs: Vec<StoredPair>,
    executions: BTreeMap<i64, Execution>,
    execution_pairs: BTreeSet<(i64, i32)>,
    trades: BTreeMap<TradeKey, (Trade, i64)>,
    next_execution_id: i64,
    next_reference_id: i32,
}

impl MemoryState {
    fn next_reference_id(&mut self) -> i32 {
        self.next_reference_id += 1;
        self.next_reference_id
    }

    fn insert_execution(&mut self, draft: &ExecutionDraft) -> i64 {
        self.next_execution_id += 1;
        let id = self.next_execution_id;
        self.executions.insert(
            id,
            Execution {
                id,
                run_started_at: draft.run_started_at,
                run_finished_at: draft.run_finished_at,
                requested_start: draft.window.start(),
                requested_end: draft.window.end(),
            },
        );
        id
    }

    fn open_execution_mut(&mut self, id: i64) -> Result<&mut Execution> {
        let execution = self
            .executions
            .get_mut(&id)
            .ok_or_else(|| DataError::NotFound(format!("execution {}", id)))?;
        if !execution.is_open() {
            return Err(DataError::InvalidState(format!(
                "execution {} is already completed",
                id
            )));
        }
        Ok(execution)
    }

    fn insert_pairs(
        &mut self,
        faults: &FaultInjection,
        execution_id: i64,
        currency_pair_ids: &[i32],
    ) -> Result<Vec<ExecutionCurrencyPair>> {
        if currency_pair_ids.is_empty() {
            return Ok(Vec::new());
        }
        faults.check_associations()?;

        let mut inserted = Vec::with_capacity(currency_pair_ids.len());
        for &currency_pair_id in currency_pair_ids {
            if !self.execution_pairs.insert((execution_id, currency_pair_id)) {
                return Err(DataError::DuplicateError(format!(
                    "execution {} already covers currency pair {}",
                    execution_id, currency_pair_id
                )));
            }
            inserted.push(ExecutionCurrencyPair {
                execution_id,
                currency_pair_id,
            });
        }
        Ok(inserted)
    }

    fn insert_trades(
        &mut self,
        faults: &FaultInjection,
        execution_id: i64,
        trades: &[Trade],
    ) -> Result<usize> {
        if trades.is_empty() {
            return Ok(0);
        }
        faults.check_trades()?;

        let mut inserted = 0;
        for trade in trades {
            let key = (
                trade.currency_pair_id,
                trade.traded_at,
                trade.vendor_trade_id.clone(),
            );
            if !self.trades.contains_key(&key) {
                self.trades.insert(key, (trade.clone(), execution_id));
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn describe(&self, execution: Execution) -> ExecutionDescription {
        let currency_pairs = self
            .execution_pairs
            .range((execution.id, i32::MIN)..=(execution.id, i32::MAX))
            .map(|&(execution_id, currency_pair_id)| ExecutionCurrencyPair {
                execution_id,
                currency_pair_id,
            })
            .collect();
        ExecutionDescription::new(execution, currency_pairs)
    }
}

/// 메모리 게이트웨이.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
    faults: FaultInjection,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 장애 주입 스위치.
    pub fn faults(&self) -> &FaultInjection {
        &self.faults
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| DataError::ConnectionError("memory store lock poisoned".to_string()))
    }

    /// 상태 사본에 작업을 적용하고 성공하면 커밋합니다.
    fn transact<T>(
        &self,
        op: impl FnOnce(&mut MemoryState, &FaultInjection) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.state()?;
        let mut working = guard.clone();
        let value = op(&mut working, &self.faults)?;
        *guard = working;
        Ok(value)
    }

    fn read<T>(&self, op: impl FnOnce(&MemoryState) -> T) -> Result<T> {
        let guard = self.state()?;
        Ok(op(&guard))
    }

    /// 통화 유형을 등록합니다.
    pub fn seed_currency_type(&self, name: &str) -> Result<i32> {
        self.transact(|state, _| {
            let id = state.next_reference_id();
            state.currency_types.push(CurrencyType {
                id,
                name: name.to_string(),
            });
            Ok(id)
        })
    }

    /// 수집 대상 통화쌍을 등록합니다. 거래소와 심볼은 없으면 함께 만듭니다.
    pub fn seed_currency_pair(
        &self,
        exchange_code: &str,
        base: &str,
        quote: &str,
        instrument_class: &str,
        active: bool,
    ) -> Result<CurrencyPair> {
        self.transact(|state, _| {
            if !state.exchanges.iter().any(|e| e.code == exchange_code) {
                let id = state.next_reference_id();
                state.exchanges.push(Exchange {
                    id,
                    code: exchange_code.to_string(),
                    name: exchange_code.to_string(),
                });
            }
            for code in [base, quote] {
                if !state.symbols.iter().any(|s| s.code == code) {
                    let id = state.next_reference_id();
                    state.symbols.push(Symbol {
                        id,
                        code: code.to_string(),
                        name: code.to_string(),
                        currency_type_id: 0,
                    });
                }
            }

            let pair = CurrencyPair {
                id: state.next_reference_id(),
                exchange_code: exchange_code.to_string(),
                base: base.to_string(),
                quote: quote.to_string(),
                instrument_class: instrument_class.to_string(),
            };
            state.currency_pairs.push(StoredPair {
                pair: pair.clone(),
                active,
            });
            Ok(pair)
        })
    }

    /// 저장된 모든 실행 (ID 순).
    pub fn executions(&self) -> Result<Vec<Execution>> {
        self.read(|state| state.executions.values().cloned().collect())
    }

    /// 저장된 체결 수.
    pub fn trade_count(&self) -> Result<usize> {
        self.read(|state| state.trades.len())
    }

    /// 체결을 저장한 실행 ID.
    pub fn trade_execution_ids(&self) -> Result<BTreeSet<i64>> {
        self.read(|state| state.trades.values().map(|(_, id)| *id).collect())
    }
}

#[async_trait]
impl ExecutionStore for MemoryGateway {
    async fn begin_run(
        &self,
        window: ExecutionWindow,
        run_started_at: DateTime<Utc>,
    ) -> Result<ExecutionDescription> {
        let draft = ExecutionDraft::open(window, run_started_at);
        let id = self.transact(|state, _| Ok(state.insert_execution(&draft)))?;
        Ok(draft.into_description(id))
    }

    async fn complete_run(
        &self,
        execution_id: i64,
        actual_start: DateTime<Utc>,
        actual_end: DateTime<Utc>,
    ) -> Result<()> {
        self.transact(|state, _| {
            let execution = state.open_execution_mut(execution_id)?;
            execution.run_started_at = actual_start;
            execution.run_finished_at = Some(actual_end);
            Ok(())
        })
    }

    async fn discard_run(&self, execution_id: i64) -> Result<()> {
        self.transact(|state, _| {
            state.open_execution_mut(execution_id)?;
            state.executions.remove(&execution_id);
            state
                .execution_pairs
                .retain(|&(owner, _)| owner != execution_id);
            Ok(())
        })
    }

    async fn find_oldest_open_run(&self) -> Result<Option<Execution>> {
        self.read(|state| state.executions.values().find(|e| e.is_open()).cloned())
    }

    async fn oldest_open_run_description(&self) -> Result<Option<ExecutionDescription>> {
        self.read(|state| {
            state
                .executions
                .values()
                .find(|e| e.is_open())
                .cloned()
                .map(|e| state.describe(e))
        })
    }

    async fn find_latest_completed_run(&self) -> Result<Option<Execution>> {
        self.read(|state| {
            state
                .executions
                .values()
                .filter(|e| !e.is_open())
                .max_by_key(|e| (e.requested_end, e.id))
                .cloned()
        })
    }

    async fn record_run(&self, draft: ExecutionDraft) -> Result<ExecutionDescription> {
        self.transact(|state, faults| {
            let id = state.insert_execution(&draft);
            state.insert_pairs(faults, id, &draft.currency_pair_ids)?;
            let execution = state.executions[&id].clone();
            Ok(state.describe(execution))
        })
    }

    async fn insert_execution_currency_pairs(
        &self,
        execution_id: i64,
        currency_pair_ids: &[i32],
    ) -> Result<Vec<ExecutionCurrencyPair>> {
        self.transact(|state, faults| {
            if !state.executions.contains_key(&execution_id) {
                return Err(DataError::NotFound(format!("execution {}", execution_id)));
            }
            state.insert_pairs(faults, execution_id, currency_pair_ids)
        })
    }

    async fn execution_description_by_id(
        &self,
        execution_id: i64,
    ) -> Result<Option<ExecutionDescription>> {
        self.read(|state| {
            state
                .executions
                .get(&execution_id)
                .cloned()
                .map(|e| state.describe(e))
        })
    }

    async fn find_runs_covering_date(&self, date: NaiveDate) -> Result<Vec<ExecutionDescription>> {
        let (from, to) = utc_day_bounds(date);
        self.read(|state| {
            state
                .executions
                .values()
                .filter(|e| e.requested_end >= from && e.requested_end < to)
                .cloned()
                .map(|e| state.describe(e))
                .collect()
        })
    }

    async fn commit_ingestion(
        &self,
        draft: ExecutionDraft,
        trades: &[Trade],
    ) -> Result<IngestionReceipt> {
        self.transact(|state, faults| {
            let id = state.insert_execution(&draft);
            state.insert_pairs(faults, id, &draft.currency_pair_ids)?;
            let trades_inserted = state.insert_trades(faults, id, trades)?;
            let execution = state.executions[&id].clone();
            Ok(IngestionReceipt {
                description: state.describe(execution),
                trades_inserted,
            })
        })
    }

    async fn complete_journaled_run(
        &self,
        execution_id: i64,
        actual_start: DateTime<Utc>,
        actual_end: DateTime<Utc>,
        currency_pair_ids: &[i32],
        trades: &[Trade],
    ) -> Result<IngestionReceipt> {
        self.transact(|state, faults| {
            state.open_execution_mut(execution_id)?;
            let trades_inserted = state.insert_trades(faults, execution_id, trades)?;
            state.insert_pairs(faults, execution_id, currency_pair_ids)?;

            let execution = state.open_execution_mut(execution_id)?;
            execution.run_started_at = actual_start;
            execution.run_finished_at = Some(actual_end);
            let execution = execution.clone();

            Ok(IngestionReceipt {
                description: state.describe(execution),
                trades_inserted,
            })
        })
    }
}

#[async_trait]
impl ReferenceStore for MemoryGateway {
    async fn currency_types(&self) -> Result<Vec<CurrencyType>> {
        self.read(|state| state.currency_types.clone())
    }

    async fn insert_exchanges(&self, exchanges: &[NewExchange]) -> Result<usize> {
        self.transact(|state, _| {
            let mut inserted = 0;
            for exchange in exchanges {
                if state.exchanges.iter().any(|e| e.code == exchange.code) {
                    continue;
                }
                let id = state.next_reference_id();
                state.exchanges.push(Exchange {
                    id,
                    code: exchange.code.clone(),
                    name: exchange.name.clone(),
                });
                inserted += 1;
            }
            Ok(inserted)
        })
    }

    async fn insert_symbols(&self, symbols: &[NewSymbol]) -> Result<usize> {
        self.transact(|state, _| {
            let mut inserted = 0;
            for symbol in symbols {
                if state.symbols.iter().any(|s| s.code == symbol.code) {
                    continue;
                }
                let id = state.next_reference_id();
                state.symbols.push(Symbol {
                    id,
                    code: symbol.code.clone(),
                    name: symbol.name.clone(),
                    currency_type_id: symbol.currency_type_id,
                });
                inserted += 1;
            }
            Ok(inserted)
        })
    }

    async fn exchanges(&self) -> Result<Vec<Exchange>> {
        self.read(|state| {
            let mut exchanges = state.exchanges.clone();
            exchanges.sort_by(|a, b| a.code.cmp(&b.code));
            exchanges
        })
    }

    async fn symbols(&self) -> Result<Vec<Symbol>> {
        self.read(|state| {
            let mut symbols = state.symbols.clone();
            symbols.sort_by(|a, b| a.code.cmp(&b.code));
            symbols
        })
    }

    async fn active_currency_pairs(&self) -> Result<Vec<CurrencyPair>> {
        self.read(|state| {
            state
                .currency_pairs
                .iter()
                .filter(|stored| stored.active)
                .map(|stored| stored.pair.clone())
                .collect()
        })
    }
}

#[async_trait]
impl MarketDataStore for MemoryGateway {
    async fn insert_trades(&self, execution_id: i64, trades: &[Trade]) -> Result<usize> {
        self.transact(|state, faults| {
            if !state.executions.contains_key(&execution_id) {
                return Err(DataError::NotFound(format!("execution {}", execution_id)));
            }
            state.insert_trades(faults, execution_id, trades)
        })
    }

    async fn trades_in_window(
        &self,
        currency_pair_id: i32,
        window: ExecutionWindow,
    ) -> Result<Vec<Trade>> {
        self.read(|state| {
            state
                .trades
                .values()
                .map(|(trade, _)| trade)
                .filter(|t| t.currency_pair_id == currency_pair_id && window.contains(t.traded_at))
                .cloned()
                .collect()
        })
    }
}
