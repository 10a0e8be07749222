//! Postgres-backed record store
//!
//! Tables are created lazily on first use. Amount columns are read back as
//! text so that rows written by other tools with formatted numbers still parse.

use crate::error::AssistantError;
use crate::models::{
    parse_amount, ChatMessage, MandateStatus, MerchantProfile, TransactionLogEntry,
    TransactionRecord,
};
use crate::store::RecordStore;
use crate::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS merchant_profiles (
      merchant_id TEXT PRIMARY KEY,
      wallet_balance TEXT NOT NULL DEFAULT '0',
      mandate_status TEXT NOT NULL DEFAULT 'UNKNOWN'
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
      id BIGSERIAL PRIMARY KEY,
      merchant_id TEXT NOT NULL,
      date DATE NOT NULL,
      gross_sales TEXT NOT NULL,
      cash_in_hand TEXT NOT NULL DEFAULT '0'
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_transactions_merchant_date
    ON transactions (merchant_id, date DESC);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transaction_logs (
      id BIGSERIAL PRIMARY KEY,
      merchant_id TEXT NOT NULL,
      type TEXT NOT NULL,
      status TEXT NOT NULL,
      amount DOUBLE PRECISION,
      failure_reason TEXT,
      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_transaction_logs_merchant_time
    ON transaction_logs (merchant_id, created_at DESC);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chat_memory (
      message_id UUID PRIMARY KEY,
      session_id TEXT NOT NULL,
      role TEXT NOT NULL,
      content TEXT NOT NULL,
      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
];

pub struct PgRecordStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PgRecordStore {
    /// Build a lazily-connecting pool; no connection is opened until first query.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)?;

        info!("Record store backend: postgres");

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                for statement in SCHEMA {
                    sqlx::query(statement).execute(&self.pool).await?;
                }
                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                AssistantError::StoreError(format!("Failed to initialize record store schema: {}", e))
            })?;

        Ok(())
    }
}

fn amount_column(row: &PgRow, column: &str) -> Result<f64> {
    let raw: Option<String> = row.try_get(column)?;

    match raw {
        None => Ok(0.0),
        Some(text) => parse_amount(&text).ok_or_else(|| {
            AssistantError::InvalidRecord(format!("{} is not numeric: {:?}", column, text))
        }),
    }
}

fn log_from_row(row: &PgRow) -> Result<TransactionLogEntry> {
    Ok(TransactionLogEntry {
        merchant_id: row.try_get("merchant_id")?,
        entry_type: row.try_get("type")?,
        status: row.try_get("status")?,
        amount: row.try_get("amount")?,
        failure_reason: row.try_get("failure_reason")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait::async_trait]
impl RecordStore for PgRecordStore {
    async fn merchant_profile(&self, merchant_id: &str) -> Result<Option<MerchantProfile>> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            SELECT merchant_id, wallet_balance::text AS wallet_balance, mandate_status
            FROM merchant_profiles
            WHERE merchant_id = $1
            "#,
        )
        .bind(merchant_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mandate: Option<String> = row.try_get("mandate_status")?;

        Ok(Some(MerchantProfile {
            merchant_id: row.try_get("merchant_id")?,
            wallet_balance: amount_column(&row, "wallet_balance")?,
            mandate_status: MandateStatus::parse(mandate.as_deref().unwrap_or("UNKNOWN")),
        }))
    }

    async fn recent_transactions(
        &self,
        merchant_id: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT merchant_id, date,
                   gross_sales::text AS gross_sales,
                   cash_in_hand::text AS cash_in_hand
            FROM transactions
            WHERE merchant_id = $1
            ORDER BY date DESC
            LIMIT $2
            "#,
        )
        .bind(merchant_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<TransactionRecord> {
                Ok(TransactionRecord {
                    merchant_id: row.try_get("merchant_id")?,
                    date: row.try_get::<NaiveDate, _>("date")?,
                    gross_sales: amount_column(row, "gross_sales")?,
                    cash_in_hand: amount_column(row, "cash_in_hand")?,
                })
            })
            .collect()
    }

    async fn recent_logs(&self, merchant_id: &str, limit: usize) -> Result<Vec<TransactionLogEntry>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT merchant_id, type, status, amount, failure_reason, created_at
            FROM transaction_logs
            WHERE merchant_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(merchant_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(log_from_row).collect()
    }

    async fn latest_logs(&self, limit: usize, offset: usize) -> Result<Vec<TransactionLogEntry>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT merchant_id, type, status, amount, failure_reason, created_at
            FROM transaction_logs
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(log_from_row).collect()
    }

    async fn insert_transactions(&self, records: Vec<TransactionRecord>) -> Result<usize> {
        self.ensure_schema().await?;

        let mut tx = self.pool.begin().await?;

        for record in &records {
            sqlx::query(
                r#"
                INSERT INTO transactions (merchant_id, date, gross_sales, cash_in_hand)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&record.merchant_id)
            .bind(record.date)
            .bind(record.gross_sales.to_string())
            .bind(record.cash_in_hand.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(records.len())
    }

    async fn append_chat_message(&self, message: ChatMessage) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query(
            r#"
            INSERT INTO chat_memory (message_id, session_id, role, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(message.message_id)
        .bind(&message.session_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
