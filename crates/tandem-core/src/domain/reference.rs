//! 참조 데이터.
//!
//! 벤더가 제공하는 카탈로그(거래소, 자산)와 로컬에서 관리하는
//! 통화 유형, 수집 대상 통화쌍을 정의합니다.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 통화 유형 (예: crypto, fiat).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyType {
    pub id: i32,
    pub name: String,
}

/// 통화 유형 이름 → ID 맵을 만듭니다.
///
/// 이름은 소문자로 정규화됩니다.
pub fn currency_type_ids(types: &[CurrencyType]) -> HashMap<String, i32> {
    types
        .iter()
        .map(|t| (t.name.to_lowercase(), t.id))
        .collect()
}

/// 저장된 거래소.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: i32,
    /// 벤더 거래소 코드 (예: cbse)
    pub code: String,
    pub name: String,
}

/// 벤더에서 받은 거래소 (저장 전).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExchange {
    pub code: String,
    pub name: String,
}

/// 저장된 심볼(자산).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: i32,
    /// 벤더 자산 코드 (예: btc)
    pub code: String,
    pub name: String,
    pub currency_type_id: i32,
}

/// 벤더에서 받은 심볼 (저장 전).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSymbol {
    pub code: String,
    pub name: String,
    pub currency_type_id: i32,
}

/// 수집 대상 통화쌍.
///
/// 거래소 + 기준/호가 자산 + 상품 유형으로 하나의 체결 스트림을 식별합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub id: i32,
    /// 거래소 코드
    pub exchange_code: String,
    /// 기준 자산 코드
    pub base: String,
    /// 호가 자산 코드
    pub quote: String,
    /// 상품 유형 (spot, future, ...)
    pub instrument_class: String,
}

impl CurrencyPair {
    /// 벤더 API 형식의 상품 코드 (예: btc-usd).
    pub fn instrument_code(&self) -> String {
        format!("{}-{}", self.base, self.quote).to_lowercase()
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.exchange_code,
            self.instrument_class,
            self.instrument_code()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_code() {
        let pair = CurrencyPair {
            id: 1,
            exchange_code: "cbse".to_string(),
            base: "BTC".to_string(),
            quote: "usd".to_string(),
            instrument_class: "spot".to_string(),
        };
        assert_eq!(pair.instrument_code(), "btc-usd");
        assert_eq!(pair.to_string(), "cbse:spot:btc-usd");
    }

    #[test]
    fn test_currency_type_ids_normalizes_names() {
        let types = vec![
            CurrencyType {
                id: 1,
                name: "Crypto".to_string(),
            },
            CurrencyType {
                id: 2,
                name: "fiat".to_string(),
            },
        ];
        let ids = currency_type_ids(&types);
        assert_eq!(ids.get("crypto"), Some(&1));
        assert_eq!(ids.get("fiat"), Some(&2));
    }
}
