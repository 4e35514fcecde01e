//! 시장 데이터 행.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 체결 한 건.
///
/// `(currency_pair_id, traded_at, vendor_trade_id)` 가 중복 제거 키입니다.
/// 통화쌍은 거래소와 심볼을 함께 식별합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// 통화쌍 ID
    pub currency_pair_id: i32,
    /// 벤더 체결 ID
    pub vendor_trade_id: String,
    /// 체결 시각
    pub traded_at: DateTime<Utc>,
    /// 체결 가격
    pub price: Decimal,
    /// 체결 수량
    pub amount: Decimal,
    /// 매도 테이커 여부 (벤더가 제공하지 않으면 None)
    pub taker_side_sell: Option<bool>,
}

/// 체결을 시각 순으로 정렬하고 중복 키를 제거합니다.
pub fn normalize_trades(mut trades: Vec<Trade>) -> Vec<Trade> {
    trades.sort_by(|a, b| {
        (a.currency_pair_id, a.traded_at, &a.vendor_trade_id).cmp(&(
            b.currency_pair_id,
            b.traded_at,
            &b.vendor_trade_id,
        ))
    });
    trades.dedup_by(|a, b| {
        a.currency_pair_id == b.currency_pair_id
            && a.traded_at == b.traded_at
            && a.vendor_trade_id == b.vendor_trade_id
    });
    trades.sort_by_key(|t| t.traded_at);
    trades
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn trade(pair: i32, id: &str, sec: u32) -> Trade {
        Trade {
            currency_pair_id: pair,
            vendor_trade_id: id.to_string(),
            traded_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, sec).unwrap(),
            price: dec!(42000.5),
            amount: dec!(0.01),
            taker_side_sell: Some(false),
        }
    }

    #[test]
    fn test_normalize_orders_and_dedups() {
        let trades = vec![
            trade(1, "b", 5),
            trade(1, "a", 1),
            trade(2, "a", 1),
            trade(1, "b", 5),
        ];
        let normalized = normalize_trades(trades);

        assert_eq!(normalized.len(), 3);
        assert!(normalized
            .windows(2)
            .all(|w| w[0].traded_at <= w[1].traded_at));
    }
}
