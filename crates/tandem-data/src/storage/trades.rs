//! 체결 데이터 repository.

use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use tandem_core::{ExecutionWindow, Trade};
use tracing::{debug, instrument};

/// 한 INSERT 문에 담는 최대 행 수 (행당 7개 바인드).
const INSERT_CHUNK: usize = 1000;
const COLUMNS_PER_ROW: usize = 7;

/// 체결 데이터베이스 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct TradeRecord {
    pub currency_pair_id: i32,
    pub vendor_trade_id: String,
    pub traded_at: DateTime<Utc>,
    pub price: Decimal,
    pub amount: Decimal,
    pub taker_side_sell: Option<bool>,
    pub execution_id: Option<i64>,
}

impl From<TradeRecord> for Trade {
    fn from(record: TradeRecord) -> Self {
        Trade {
            currency_pair_id: record.currency_pair_id,
            vendor_trade_id: record.vendor_trade_id,
            traded_at: record.traded_at,
            price: record.price,
            amount: record.amount,
            taker_side_sell: record.taker_side_sell,
        }
    }
}

/// 체결 데이터 repository.
pub struct TradeRepository;

impl TradeRepository {
    /// 여러 체결을 일괄 삽입합니다. 이미 있는 키는 건너뜁니다.
    ///
    /// 새로 저장된 행 수를 반환합니다.
    #[instrument(skip(conn, trades), fields(count = trades.len()))]
    pub async fn insert_batch(
        conn: &mut PgConnection,
        execution_id: i64,
        trades: &[Trade],
    ) -> Result<usize> {
        if trades.is_empty() {
            return Ok(0);
        }

        let mut inserted = 0;

        for chunk in trades.chunks(INSERT_CHUNK) {
            let mut query_builder = String::from(
                r#"
                INSERT INTO trades (currency_pair_id, vendor_trade_id, traded_at, price, amount, taker_side_sell, execution_id)
                VALUES
                "#,
            );

            for i in 0..chunk.len() {
                if i > 0 {
                    query_builder.push_str(", ");
                }
                let base = i * COLUMNS_PER_ROW;
                let placeholders: Vec<String> = (1..=COLUMNS_PER_ROW)
                    .map(|col| format!("${}", base + col))
                    .collect();
                query_builder.push('(');
                query_builder.push_str(&placeholders.join(", "));
                query_builder.push(')');
            }

            query_builder.push_str(
                " ON CONFLICT (currency_pair_id, traded_at, vendor_trade_id) DO NOTHING",
            );

            let mut query = sqlx::query(&query_builder);

            for trade in chunk {
                query = query
                    .bind(trade.currency_pair_id)
                    .bind(&trade.vendor_trade_id)
                    .bind(trade.traded_at)
                    .bind(trade.price)
                    .bind(trade.amount)
                    .bind(trade.taker_side_sell)
                    .bind(execution_id);
            }

            let result = query.execute(&mut *conn).await?;
            inserted += result.rows_affected() as usize;
        }

        debug!(inserted, "Inserted trades");
        Ok(inserted)
    }

    /// 통화쌍의 구간 내 체결을 조회합니다.
    pub async fn in_window(
        conn: &mut PgConnection,
        currency_pair_id: i32,
        window: ExecutionWindow,
    ) -> Result<Vec<Trade>> {
        let records: Vec<TradeRecord> = sqlx::query_as(
            r#"
            SELECT currency_pair_id, vendor_trade_id, traded_at, price, amount, taker_side_sell, execution_id
            FROM trades
            WHERE currency_pair_id = $1 AND traded_at >= $2 AND traded_at < $3
            ORDER BY traded_at ASC, vendor_trade_id ASC
            "#,
        )
        .bind(currency_pair_id)
        .bind(window.start())
        .bind(window.end())
        .fetch_all(&mut *conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}
