//! 참조 데이터 repository (거래소, 심볼, 통화 유형, 통화쌍).

use crate::error::Result;
use sqlx::{FromRow, PgConnection};
use tandem_core::{CurrencyPair, CurrencyType, Exchange, NewExchange, NewSymbol, Symbol};
use tracing::debug;

#[derive(Debug, Clone, FromRow)]
struct CurrencyTypeRecord {
    id: i32,
    name: String,
}

#[derive(Debug, Clone, FromRow)]
struct ExchangeRecord {
    id: i32,
    code: String,
    name: String,
}

#[derive(Debug, Clone, FromRow)]
struct SymbolRecord {
    id: i32,
    code: String,
    name: String,
    currency_type_id: i32,
}

#[derive(Debug, Clone, FromRow)]
struct CurrencyPairRecord {
    id: i32,
    exchange_code: String,
    base_code: String,
    quote_code: String,
    instrument_class: String,
}

/// 참조 데이터 repository.
pub struct ReferenceRepository;

impl ReferenceRepository {
    pub async fn currency_types(conn: &mut PgConnection) -> Result<Vec<CurrencyType>> {
        let records: Vec<CurrencyTypeRecord> =
            sqlx::query_as("SELECT id, name FROM currency_types ORDER BY id")
                .fetch_all(&mut *conn)
                .await?;

        Ok(records
            .into_iter()
            .map(|r| CurrencyType {
                id: r.id,
                name: r.name,
            })
            .collect())
    }

    /// 거래소 저장 (코드 중복은 무시).
    pub async fn insert_exchanges(
        conn: &mut PgConnection,
        exchanges: &[NewExchange],
    ) -> Result<usize> {
        let mut inserted = 0;

        for exchange in exchanges {
            let result = sqlx::query(
                r#"
                INSERT INTO exchanges (code, name)
                VALUES ($1, $2)
                ON CONFLICT (code) DO NOTHING
                "#,
            )
            .bind(&exchange.code)
            .bind(&exchange.name)
            .execute(&mut *conn)
            .await?;

            inserted += result.rows_affected() as usize;
        }

        debug!(inserted, total = exchanges.len(), "Inserted exchanges");
        Ok(inserted)
    }

    /// 심볼 저장 (코드 중복은 무시).
    pub async fn insert_symbols(conn: &mut PgConnection, symbols: &[NewSymbol]) -> Result<usize> {
        let mut inserted = 0;

        for symbol in symbols {
            let result = sqlx::query(
                r#"
                INSERT INTO symbols (code, name, currency_type_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (code) DO NOTHING
                "#,
            )
            .bind(&symbol.code)
            .bind(&symbol.name)
            .bind(symbol.currency_type_id)
            .execute(&mut *conn)
            .await?;

            inserted += result.rows_affected() as usize;
        }

        debug!(inserted, total = symbols.len(), "Inserted symbols");
        Ok(inserted)
    }

    pub async fn exchanges(conn: &mut PgConnection) -> Result<Vec<Exchange>> {
        let records: Vec<ExchangeRecord> =
            sqlx::query_as("SELECT id, code, name FROM exchanges ORDER BY code")
                .fetch_all(&mut *conn)
                .await?;

        Ok(records
            .into_iter()
            .map(|r| Exchange {
                id: r.id,
                code: r.code,
                name: r.name,
            })
            .collect())
    }

    pub async fn symbols(conn: &mut PgConnection) -> Result<Vec<Symbol>> {
        let records: Vec<SymbolRecord> = sqlx::query_as(
            "SELECT id, code, name, currency_type_id FROM symbols ORDER BY code",
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(records
            .into_iter()
            .map(|r| Symbol {
                id: r.id,
                code: r.code,
                name: r.name,
                currency_type_id: r.currency_type_id,
            })
            .collect())
    }

    pub async fn active_currency_pairs(conn: &mut PgConnection) -> Result<Vec<CurrencyPair>> {
        let records: Vec<CurrencyPairRecord> = sqlx::query_as(
            r#"
            SELECT cp.id,
                   e.code AS exchange_code,
                   b.code AS base_code,
                   q.code AS quote_code,
                   cp.instrument_class
            FROM currency_pairs cp
            JOIN exchanges e ON e.id = cp.exchange_id
            JOIN symbols b ON b.id = cp.base_symbol_id
            JOIN symbols q ON q.id = cp.quote_symbol_id
            WHERE cp.is_active = true
            ORDER BY cp.id
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(records
            .into_iter()
            .map(|r| CurrencyPair {
                id: r.id,
                exchange_code: r.exchange_code,
                base: r.base_code,
                quote: r.quote_code,
                instrument_class: r.instrument_class,
            })
            .collect())
    }
}
