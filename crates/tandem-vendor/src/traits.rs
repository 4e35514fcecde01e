//! 데이터 공급자 trait 정의.

use async_trait::async_trait;
use std::collections::HashMap;
use tandem_core::{CurrencyPair, ExecutionWindow, NewExchange, NewSymbol, Trade};

use crate::error::VendorResult;

/// 시장 데이터 공급자 인터페이스.
#[async_trait]
pub trait MarketDataVendor: Send + Sync {
    /// 공급자 이름 반환.
    fn name(&self) -> &str;

    // === 참조 데이터 ===

    /// 공급자가 다루는 거래소 목록.
    async fn fetch_exchanges(&self) -> VendorResult<Vec<NewExchange>>;

    /// 자산 목록을 심볼로 변환해 반환.
    ///
    /// `currency_types` 는 소문자 통화 유형 이름 → 로컬 ID 매핑입니다.
    /// 매핑에 없는 자산 분류는 건너뜁니다.
    async fn fetch_assets(
        &self,
        currency_types: &HashMap<String, i32>,
    ) -> VendorResult<Vec<NewSymbol>>;

    // === 시장 데이터 ===

    /// 통화쌍의 구간 내 체결 (반열림 구간, 시각 순).
    async fn fetch_trades(
        &self,
        pair: &CurrencyPair,
        window: ExecutionWindow,
    ) -> VendorResult<Vec<Trade>>;
}
