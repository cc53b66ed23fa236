// src/db.rs
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::error::StoreError;
use crate::models::PollRecord;
use crate::store::{CasOutcome, RecordStore, Versioned};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS polls (
    id         TEXT PRIMARY KEY,
    record     JSONB NOT NULL,
    version    BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Poll records kept one row per poll, JSONB body plus a version column.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn get(&self, id: &str) -> Result<Option<Versioned<PollRecord>>, StoreError> {
        let row = sqlx::query("SELECT record, version FROM polls WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: serde_json::Value = row.try_get("record")?;
        let version: i64 = row.try_get("version")?;
        Ok(Some(Versioned {
            version,
            record: serde_json::from_value(raw)?,
        }))
    }

    async fn insert(&self, record: &PollRecord) -> Result<(), StoreError> {
        let done = sqlx::query(
            "INSERT INTO polls (id, record, version, created_at) VALUES ($1, $2, 1, $3) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&record.id)
        .bind(Json(record))
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(StoreError::Duplicate(record.id.clone()));
        }
        Ok(())
    }

    async fn compare_and_set(
        &self,
        id: &str,
        expected: i64,
        record: &PollRecord,
    ) -> Result<CasOutcome, StoreError> {
        let written = sqlx::query(
            "UPDATE polls SET record = $3, version = version + 1 \
             WHERE id = $1 AND version = $2 RETURNING version",
        )
        .bind(id)
        .bind(expected)
        .bind(Json(record))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = written {
            return Ok(CasOutcome::Written { version: row.try_get("version")? });
        }

        let exists = sqlx::query("SELECT 1 FROM polls WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(if exists.is_some() { CasOutcome::Conflict } else { CasOutcome::Missing })
    }
}
