//! 수집기 통합 테스트용 가짜 공급자와 헬퍼.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tandem_collector::{ManualClock, Orchestrator, OrchestratorConfig};
use tandem_core::{CurrencyPair, ExecutionWindow, NewExchange, NewSymbol, Trade};
use tandem_data::MemoryGateway;
use tandem_vendor::{MarketDataVendor, VendorError, VendorResult};

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn trade(pair_id: i32, id: &str, traded_at: DateTime<Utc>) -> Trade {
    Trade {
        currency_pair_id: pair_id,
        vendor_trade_id: id.to_string(),
        traded_at,
        price: dec!(100.5),
        amount: dec!(2),
        taker_side_sell: None,
    }
}

/// 미리 정한 체결을 돌려주는 공급자.
#[derive(Default)]
pub struct FakeVendor {
    trades: Mutex<HashMap<i32, Vec<Trade>>>,
    requests: Mutex<Vec<(i32, ExecutionWindow)>>,
    failing: AtomicBool,
    delay: Mutex<Option<std::time::Duration>>,
    exchanges: Vec<NewExchange>,
    assets: Vec<(String, String)>,
}

impl FakeVendor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 거래소 목록과 (자산 코드, 자산 유형) 목록을 내려주는 공급자.
    pub fn with_reference(exchanges: Vec<NewExchange>, assets: Vec<(&str, &str)>) -> Self {
        Self {
            exchanges,
            assets: assets
                .into_iter()
                .map(|(code, class)| (code.to_string(), class.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn add_trades(&self, trades: Vec<Trade>) {
        let mut by_pair = self.trades.lock().unwrap();
        for t in trades {
            by_pair.entry(t.currency_pair_id).or_default().push(t);
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn clear_delay(&self) {
        *self.delay.lock().unwrap() = None;
    }

    /// 받은 체결 요청 (통화쌍 ID, 구간).
    pub fn requests(&self) -> Vec<(i32, ExecutionWindow)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataVendor for FakeVendor {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch_exchanges(&self) -> VendorResult<Vec<NewExchange>> {
        Ok(self.exchanges.clone())
    }

    async fn fetch_assets(
        &self,
        currency_types: &HashMap<String, i32>,
    ) -> VendorResult<Vec<NewSymbol>> {
        Ok(self
            .assets
            .iter()
            .filter_map(|(code, class)| {
                currency_types.get(class).map(|&currency_type_id| NewSymbol {
                    code: code.clone(),
                    name: code.to_uppercase(),
                    currency_type_id,
                })
            })
            .collect())
    }

    async fn fetch_trades(
        &self,
        pair: &CurrencyPair,
        window: ExecutionWindow,
    ) -> VendorResult<Vec<Trade>> {
        self.requests.lock().unwrap().push((pair.id, window));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(VendorError::ServerError {
                status: 503,
                message: "unavailable".to_string(),
            });
        }

        Ok(self
            .trades
            .lock()
            .unwrap()
            .get(&pair.id)
            .map(|trades| {
                trades
                    .iter()
                    .filter(|t| window.contains(t.traded_at))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// 테스트 환경: 메모리 저장소, 가짜 공급자, 수동 시계.
pub struct Harness {
    pub store: Arc<MemoryGateway>,
    pub vendor: Arc<FakeVendor>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// `now()` 를 읽을 때마다 1초씩 가는 시계로 시작합니다.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            store: Arc::new(MemoryGateway::new()),
            vendor: Arc::new(FakeVendor::new()),
            clock: Arc::new(ManualClock::with_step(now, Duration::seconds(1))),
        }
    }

    /// 멈춘 시계로 시작합니다.
    pub fn frozen(now: DateTime<Utc>) -> Self {
        Self {
            clock: Arc::new(ManualClock::new(now)),
            ..Self::new(now)
        }
    }

    pub fn orchestrator(&self, config: OrchestratorConfig) -> Orchestrator {
        Orchestrator::with_clock(
            self.store.clone(),
            self.vendor.clone(),
            self.clock.clone(),
            config,
        )
    }

    pub fn active_pair(&self, base: &str) -> CurrencyPair {
        self.store
            .seed_currency_pair("cbse", base, "usd", "spot", true)
            .unwrap()
    }
}
