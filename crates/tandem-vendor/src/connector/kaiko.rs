//! Kaiko 데이터 공급자 커넥터.
//!
//! 참조 데이터 API(거래소, 자산)와 시장 데이터 API(체결) REST 구현.
//! 모든 응답은 `{result, data, next_url}` 봉투에 담겨 오며
//! `next_url` 이 있으면 다음 페이지를 이어서 요청합니다.

use crate::error::{VendorError, VendorResult};
use crate::retry::{with_retry, RetryConfig};
use crate::traits::MarketDataVendor;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::ACCEPT;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tandem_core::{normalize_trades, CurrencyPair, ExecutionWindow, NewExchange, NewSymbol, Trade};
use tracing::{debug, error, instrument, warn};

const API_KEY_HEADER: &str = "X-Api-Key";

// ============================================================================
// 설정
// ============================================================================

fn default_reference_base_url() -> String {
    "https://reference-data-api.kaiko.io".to_string()
}
fn default_market_base_url() -> String {
    "https://us.market-api.kaiko.io".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_page_size() -> u32 {
    1000
}
fn default_max_pages() -> usize {
    500
}

/// Kaiko 클라이언트 설정.
///
/// # 보안
/// - `Debug` 구현은 `api_key` 를 마스킹합니다.
#[derive(Clone, Deserialize)]
pub struct KaikoConfig {
    /// API 키
    pub api_key: SecretString,
    /// 참조 데이터 API 기본 URL
    #[serde(default = "default_reference_base_url")]
    pub reference_base_url: String,
    /// 시장 데이터 API 기본 URL
    #[serde(default = "default_market_base_url")]
    pub market_base_url: String,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 페이지당 체결 수
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// 한 요청에서 따라갈 최대 페이지 수
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// 재시도 정책
    #[serde(default)]
    pub retry: RetryConfig,
}

impl fmt::Debug for KaikoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self.api_key.expose_secret();
        let masked_key = if key.len() > 8 {
            format!("{}...{}", &key[..4], &key[key.len() - 4..])
        } else {
            "***REDACTED***".to_string()
        };

        f.debug_struct("KaikoConfig")
            .field("api_key", &masked_key)
            .field("reference_base_url", &self.reference_base_url)
            .field("market_base_url", &self.market_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("retry", &self.retry)
            .finish()
    }
}

impl KaikoConfig {
    /// 새 설정 생성.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into().into()),
            reference_base_url: default_reference_base_url(),
            market_base_url: default_market_base_url(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            retry: RetryConfig::default(),
        }
    }

    /// API 키가 공백이 아닌 값으로 설정되어 있는지 확인합니다.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.expose_secret().trim().is_empty()
    }

    /// 두 API의 기본 URL을 한 주소로 바꿉니다.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.reference_base_url = url.clone();
        self.market_base_url = url;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// 환경 변수에서 생성.
    ///
    /// `KAIKO_API_KEY` 가 없으면 `None`.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("KAIKO_API_KEY").ok()?;
        let mut config = Self::new(api_key);

        if let Ok(url) = std::env::var("KAIKO_REFERENCE_URL") {
            config.reference_base_url = url;
        }
        if let Ok(url) = std::env::var("KAIKO_MARKET_URL") {
            config.market_base_url = url;
        }

        Some(config)
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct KaikoEnvelope<T> {
    result: Option<String>,
    message: Option<String>,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KaikoErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KaikoExchange {
    code: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct KaikoAsset {
    code: String,
    name: String,
    #[serde(default)]
    asset_classes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct KaikoTrade {
    timestamp: i64,
    trade_id: String,
    price: Decimal,
    amount: Decimal,
    taker_side_sell: Option<bool>,
}

impl KaikoTrade {
    fn into_trade(self, currency_pair_id: i32) -> VendorResult<Trade> {
        let traded_at = DateTime::<Utc>::from_timestamp_millis(self.timestamp).ok_or_else(|| {
            VendorError::ParseError(format!("Invalid trade timestamp: {}", self.timestamp))
        })?;

        Ok(Trade {
            currency_pair_id,
            vendor_trade_id: self.trade_id,
            traded_at,
            price: self.price,
            amount: self.amount,
            taker_side_sell: self.taker_side_sell,
        })
    }
}

/// 자산을 심볼로 변환합니다. 첫 자산 분류를 통화 유형으로 씁니다.
fn asset_to_symbol(asset: KaikoAsset, currency_types: &HashMap<String, i32>) -> Option<NewSymbol> {
    let class = asset.asset_classes.first()?.to_lowercase();
    let Some(&currency_type_id) = currency_types.get(&class) else {
        warn!(code = %asset.code, asset_class = %class, "알 수 없는 자산 분류, 건너뜀");
        return None;
    };

    Some(NewSymbol {
        code: asset.code,
        name: asset.name,
        currency_type_id,
    })
}

// ============================================================================
// 클라이언트
// ============================================================================

/// Kaiko REST 클라이언트.
pub struct KaikoClient {
    config: KaikoConfig,
    client: Client,
}

impl KaikoClient {
    /// 새 클라이언트 생성.
    pub fn new(config: KaikoConfig) -> VendorResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VendorError::Config(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &KaikoConfig {
        &self.config
    }

    /// 체결 엔드포인트 URL.
    fn trades_url(&self, pair: &CurrencyPair) -> String {
        format!(
            "{}/v2/data/trades.v1/exchanges/{}/{}/{}/trades",
            self.config.market_base_url,
            pair.exchange_code.to_lowercase(),
            pair.instrument_class.to_lowercase(),
            pair.instrument_code(),
        )
    }

    /// 인증 헤더를 붙인 GET 요청 한 번.
    async fn get<T: DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> VendorResult<T> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .query(params)
            .header(API_KEY_HEADER, self.config.api_key.expose_secret())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// 응답 처리.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> VendorResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VendorError::NetworkError(e.to_string()))?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                error!("Failed to parse response: {} - Body: {}", e, body);
                VendorError::ParseError(e.to_string())
            })
        } else {
            let message = serde_json::from_str::<KaikoErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(body);
            Err(VendorError::from_status(status.as_u16(), message))
        }
    }

    /// `next_url` 을 따라 모든 페이지의 `data` 를 모읍니다.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        url: String,
        params: Vec<(&'static str, String)>,
    ) -> VendorResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some((url, params));
        let mut pages = 0;

        while let Some((url, params)) = next.take() {
            if pages >= self.config.max_pages {
                return Err(VendorError::PageLimitExceeded(self.config.max_pages));
            }
            pages += 1;

            let (page_url, page_params) = (&url, &params);
            let envelope: KaikoEnvelope<T> = with_retry(&self.config.retry, &url, move || {
                self.get(page_url, page_params)
            })
            .await?;

            if envelope.result.as_deref() == Some("error") {
                return Err(VendorError::ApiError {
                    status: 200,
                    message: envelope.message.unwrap_or_default(),
                });
            }

            items.extend(envelope.data);
            next = envelope
                .next_url
                .filter(|u| !u.is_empty())
                .map(|u| (u, Vec::new()));
        }

        debug!(pages, items = items.len(), "Pagination complete");
        Ok(items)
    }
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl MarketDataVendor for KaikoClient {
    fn name(&self) -> &str {
        "kaiko"
    }

    #[instrument(skip(self))]
    async fn fetch_exchanges(&self) -> VendorResult<Vec<NewExchange>> {
        let url = format!("{}/v1/exchanges", self.config.reference_base_url);
        let exchanges: Vec<KaikoExchange> = self.get_paged(url, Vec::new()).await?;

        Ok(exchanges
            .into_iter()
            .map(|e| NewExchange {
                code: e.code,
                name: e.name,
            })
            .collect())
    }

    #[instrument(skip(self, currency_types))]
    async fn fetch_assets(
        &self,
        currency_types: &HashMap<String, i32>,
    ) -> VendorResult<Vec<NewSymbol>> {
        let url = format!("{}/v1/assets", self.config.reference_base_url);
        let assets: Vec<KaikoAsset> = self.get_paged(url, Vec::new()).await?;

        Ok(assets
            .into_iter()
            .filter_map(|asset| asset_to_symbol(asset, currency_types))
            .collect())
    }

    #[instrument(skip(self, pair, window), fields(pair = %pair, window = %window))]
    async fn fetch_trades(
        &self,
        pair: &CurrencyPair,
        window: ExecutionWindow,
    ) -> VendorResult<Vec<Trade>> {
        let params = vec![
            ("start_time", rfc3339(window.start())),
            ("end_time", rfc3339(window.end())),
            ("page_size", self.config.page_size.to_string()),
        ];
        let raw: Vec<KaikoTrade> = self.get_paged(self.trades_url(pair), params).await?;
        let fetched = raw.len();

        let trades: Vec<Trade> = raw
            .into_iter()
            .map(|t| t.into_trade(pair.id))
            .collect::<VendorResult<Vec<_>>>()?
            .into_iter()
            .filter(|t| window.contains(t.traded_at))
            .collect();
        let trades = normalize_trades(trades);

        debug!(fetched, kept = trades.len(), "Fetched trades");
        Ok(trades)
    }
}
