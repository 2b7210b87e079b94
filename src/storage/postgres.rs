//! PostgreSQL storage backend.
//!
//! One row per bank in `bank_rates`; `bank_name` carries a unique
//! constraint and upserts use `ON CONFLICT`, which Postgres applies
//! atomically per statement. Rows are read back in insertion order.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::error::{AppError, Result};
use crate::models::RateRecord;
use crate::storage::RateStore;

/// `bank_rates` table backend.
#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect and bring the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl RateStore for PostgresStorage {
    async fn read_all(&self) -> Result<Vec<RateRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT bank_name, deposit_name, rate
              FROM bank_rates
             ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::store(format!("read bank_rates: {e}")))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(RateRecord {
                bank_name: row.try_get("bank_name")?,
                deposit_name: row.try_get("deposit_name")?,
                rate: row.try_get("rate")?,
            });
        }
        Ok(out)
    }

    async fn upsert(&self, record: &RateRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bank_rates (bank_name, deposit_name, rate)
            VALUES ($1, $2, $3)
            ON CONFLICT (bank_name) DO UPDATE
               SET deposit_name = EXCLUDED.deposit_name,
                   rate = EXCLUDED.rate,
                   updated_at = now()
            "#,
        )
        .bind(&record.bank_name)
        .bind(&record.deposit_name)
        .bind(record.rate)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::store(format!("upsert {}: {e}", record.bank_name)))?;
        Ok(())
    }
}
