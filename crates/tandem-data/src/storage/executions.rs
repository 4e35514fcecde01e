//! 실행 기록 repository.
//!
//! 모든 함수는 호출자가 연 트랜잭션의 연결을 받습니다.
//! 트랜잭션 경계는 `PgGateway` 가 정합니다.

use crate::error::{DataError, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use std::collections::HashMap;
use tandem_core::{Execution, ExecutionCurrencyPair, ExecutionDescription, ExecutionDraft};
use tracing::{debug, instrument};

/// 실행 데이터베이스 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct ExecutionRecord {
    pub id: i64,
    pub run_started_at: DateTime<Utc>,
    pub run_finished_at: Option<DateTime<Utc>>,
    pub requested_start: DateTime<Utc>,
    pub requested_end: DateTime<Utc>,
}

impl From<ExecutionRecord> for Execution {
    fn from(record: ExecutionRecord) -> Self {
        Execution {
            id: record.id,
            run_started_at: record.run_started_at,
            run_finished_at: record.run_finished_at,
            requested_start: record.requested_start,
            requested_end: record.requested_end,
        }
    }
}

/// 실행-통화쌍 연관 레코드.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct ExecutionCurrencyPairRecord {
    pub execution_id: i64,
    pub currency_pair_id: i32,
}

impl From<ExecutionCurrencyPairRecord> for ExecutionCurrencyPair {
    fn from(record: ExecutionCurrencyPairRecord) -> Self {
        ExecutionCurrencyPair {
            execution_id: record.execution_id,
            currency_pair_id: record.currency_pair_id,
        }
    }
}

const EXECUTION_COLUMNS: &str =
    "id, run_started_at, run_finished_at, requested_start, requested_end";

/// 실행 기록 repository.
pub struct ExecutionRepository;

impl ExecutionRepository {
    /// 실행 행을 저장하고 부여된 ID를 반환합니다.
    #[instrument(skip(conn, draft), fields(window = %draft.window))]
    pub async fn insert(conn: &mut PgConnection, draft: &ExecutionDraft) -> Result<i64> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO executions (run_started_at, run_finished_at, requested_start, requested_end)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(draft.run_started_at)
        .bind(draft.run_finished_at)
        .bind(draft.window.start())
        .bind(draft.window.end())
        .fetch_one(&mut *conn)
        .await?;

        debug!(execution_id = id, "Created execution record");
        Ok(id)
    }

    /// 통화쌍 연관을 일괄 저장합니다.
    pub async fn insert_pairs(
        conn: &mut PgConnection,
        execution_id: i64,
        currency_pair_ids: &[i32],
    ) -> Result<Vec<ExecutionCurrencyPair>> {
        if currency_pair_ids.is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<ExecutionCurrencyPairRecord> = sqlx::query_as(
            r#"
            INSERT INTO execution_currency_pairs (execution_id, currency_pair_id)
            SELECT $1, pair_id FROM UNNEST($2::int4[]) AS pair_id
            RETURNING execution_id, currency_pair_id
            "#,
        )
        .bind(execution_id)
        .bind(currency_pair_ids)
        .fetch_all(&mut *conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// 행 잠금과 함께 실행을 조회합니다.
    pub async fn lock(conn: &mut PgConnection, execution_id: i64) -> Result<Execution> {
        let query = format!("SELECT {EXECUTION_COLUMNS} FROM executions WHERE id = $1 FOR UPDATE");
        let record: Option<ExecutionRecord> = sqlx::query_as(&query)
            .bind(execution_id)
            .fetch_optional(&mut *conn)
            .await?;

        record
            .map(Into::into)
            .ok_or_else(|| DataError::NotFound(format!("execution {}", execution_id)))
    }

    /// 잠긴 실행이 아직 열려 있는지 확인합니다.
    pub async fn lock_open(conn: &mut PgConnection, execution_id: i64) -> Result<Execution> {
        let execution = Self::lock(conn, execution_id).await?;
        if !execution.is_open() {
            return Err(DataError::InvalidState(format!(
                "execution {} is already completed",
                execution_id
            )));
        }
        Ok(execution)
    }

    /// 완료 시각을 기록합니다.
    pub async fn set_completion(
        conn: &mut PgConnection,
        execution_id: i64,
        actual_start: DateTime<Utc>,
        actual_end: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE executions
            SET run_started_at = $2, run_finished_at = $3
            WHERE id = $1
            "#,
        )
        .bind(execution_id)
        .bind(actual_start)
        .bind(actual_end)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("execution {}", execution_id)));
        }
        Ok(())
    }

    /// 실행과 연관을 삭제합니다.
    pub async fn delete(conn: &mut PgConnection, execution_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM execution_currency_pairs WHERE execution_id = $1")
            .bind(execution_id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM executions WHERE id = $1")
            .bind(execution_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn get(conn: &mut PgConnection, execution_id: i64) -> Result<Option<Execution>> {
        let query = format!("SELECT {EXECUTION_COLUMNS} FROM executions WHERE id = $1");
        let record: Option<ExecutionRecord> = sqlx::query_as(&query)
            .bind(execution_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(record.map(Into::into))
    }

    pub async fn oldest_open(conn: &mut PgConnection) -> Result<Option<Execution>> {
        let query = format!(
            "SELECT {EXECUTION_COLUMNS} FROM executions
             WHERE run_finished_at IS NULL
             ORDER BY id ASC
             LIMIT 1"
        );
        let record: Option<ExecutionRecord> =
            sqlx::query_as(&query).fetch_optional(&mut *conn).await?;
        Ok(record.map(Into::into))
    }

    pub async fn latest_completed(conn: &mut PgConnection) -> Result<Option<Execution>> {
        let query = format!(
            "SELECT {EXECUTION_COLUMNS} FROM executions
             WHERE run_finished_at IS NOT NULL
             ORDER BY requested_end DESC, id DESC
             LIMIT 1"
        );
        let record: Option<ExecutionRecord> =
            sqlx::query_as(&query).fetch_optional(&mut *conn).await?;
        Ok(record.map(Into::into))
    }

    /// 요청 구간 끝이 `[from, to)` 에 속하는 실행.
    pub async fn ending_between(
        conn: &mut PgConnection,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Execution>> {
        let query = format!(
            "SELECT {EXECUTION_COLUMNS} FROM executions
             WHERE requested_end >= $1 AND requested_end < $2
             ORDER BY id ASC"
        );
        let records: Vec<ExecutionRecord> = sqlx::query_as(&query)
            .bind(from)
            .bind(to)
            .fetch_all(&mut *conn)
            .await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    /// 여러 실행의 통화쌍 연관을 한 번에 조회합니다.
    pub async fn pairs_for(
        conn: &mut PgConnection,
        execution_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<ExecutionCurrencyPair>>> {
        if execution_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let records: Vec<ExecutionCurrencyPairRecord> = sqlx::query_as(
            r#"
            SELECT execution_id, currency_pair_id
            FROM execution_currency_pairs
            WHERE execution_id = ANY($1)
            ORDER BY execution_id, currency_pair_id
            "#,
        )
        .bind(execution_ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut grouped: HashMap<i64, Vec<ExecutionCurrencyPair>> = HashMap::new();
        for record in records {
            grouped
                .entry(record.execution_id)
                .or_default()
                .push(record.into());
        }
        Ok(grouped)
    }

    /// 실행들을 통화쌍과 조인합니다.
    pub async fn describe(
        conn: &mut PgConnection,
        executions: Vec<Execution>,
    ) -> Result<Vec<ExecutionDescription>> {
        let ids: Vec<i64> = executions.iter().map(|e| e.id).collect();
        let mut pairs = Self::pairs_for(conn, &ids).await?;

        Ok(executions
            .into_iter()
            .map(|execution| {
                let currency_pairs = pairs.remove(&execution.id).unwrap_or_default();
                ExecutionDescription::new(execution, currency_pairs)
            })
            .collect())
    }
}
