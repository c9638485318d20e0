//! SQLite ledger implementation.
//!
//! One table, one row per file key. WAL mode plus a busy timeout lets the
//! worker pool write concurrently through a shared pool; each upsert is a
//! single statement, so writes are transactional without caller-side locking.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::error::Result;
use crate::ledger::{ExecutionStatus, Ledger, LedgerRecord, RecordUpdate};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS file_status (
    file_key TEXT PRIMARY KEY,
    execution_status TEXT NOT NULL,
    result TEXT,
    resume_handle TEXT,
    status_code INTEGER,
    time_taken REAL,
    embedding_cost REAL,
    embedding_tokens INTEGER,
    llm_cost REAL,
    llm_tokens INTEGER,
    error_message TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// Ledger backed by a single SQLite database file.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open (or create) the ledger database at `path` and ensure the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let ledger = Self { pool };
        ledger.init_schema().await?;
        Ok(ledger)
    }

    /// Wrap an existing pool (used by `#[sqlx::test]`).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the `file_status` table if it does not exist.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn record_from_row(row: &SqliteRow) -> Result<LedgerRecord> {
    let status: String = row.try_get("execution_status")?;
    let result: Option<String> = row.try_get("result")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(LedgerRecord {
        file_key: row.try_get("file_key")?,
        status: ExecutionStatus::from_remote(&status),
        // Rows written by this crate always hold valid JSON; tolerate hand
        // edits by degrading to null rather than failing the whole read.
        result: result.and_then(|raw| serde_json::from_str(&raw).ok()),
        resume_handle: row.try_get("resume_handle")?,
        status_code: row.try_get("status_code")?,
        time_taken: row.try_get("time_taken")?,
        embedding_cost: row.try_get("embedding_cost")?,
        embedding_tokens: row.try_get("embedding_tokens")?,
        llm_cost: row.try_get("llm_cost")?,
        llm_tokens: row.try_get("llm_tokens")?,
        error_message: row.try_get("error_message")?,
        created_at,
        updated_at,
    })
}

impl Ledger for SqliteLedger {
    async fn get(&self, file_key: &str) -> Result<Option<LedgerRecord>> {
        let row = sqlx::query("SELECT * FROM file_status WHERE file_key = ?")
            .bind(file_key)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn resumable_handle(&self, file_key: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT resume_handle FROM file_status \
             WHERE file_key = ? AND execution_status NOT IN ('COMPLETED', 'ERROR')",
        )
        .bind(file_key)
        .fetch_optional(&self.pool)
        .await?;

        let handle = match row {
            Some(row) => row.try_get("resume_handle")?,
            None => None,
        };
        Ok(handle)
    }

    async fn upsert(&self, update: RecordUpdate) -> Result<()> {
        let (usage, error_message) = update.derived();
        let now = Utc::now();
        let result_json = update.result.as_ref().map(|v| v.to_string());

        // created_at is deliberately absent from the DO UPDATE SET list so the
        // first write's value survives every later upsert.
        sqlx::query(
            r#"
            INSERT INTO file_status (
                file_key, execution_status, result, resume_handle, status_code,
                time_taken, embedding_cost, embedding_tokens, llm_cost, llm_tokens,
                error_message, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(file_key) DO UPDATE SET
                execution_status = excluded.execution_status,
                result = excluded.result,
                resume_handle = excluded.resume_handle,
                status_code = excluded.status_code,
                time_taken = excluded.time_taken,
                embedding_cost = excluded.embedding_cost,
                embedding_tokens = excluded.embedding_tokens,
                llm_cost = excluded.llm_cost,
                llm_tokens = excluded.llm_tokens,
                error_message = excluded.error_message,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&update.file_key)
        .bind(update.status.as_str())
        .bind(result_json)
        .bind(&update.resume_handle)
        .bind(update.status_code)
        .bind(update.time_taken)
        .bind(usage.embedding_cost)
        .bind(usage.embedding_tokens)
        .bind(usage.llm_cost)
        .bind(usage.llm_tokens)
        .bind(error_message)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn summary(&self) -> Result<BTreeMap<ExecutionStatus, i64>> {
        let rows = sqlx::query(
            "SELECT execution_status, COUNT(*) AS status_count \
             FROM file_status GROUP BY execution_status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let status: String = row.try_get("execution_status")?;
            let count: i64 = row.try_get("status_count")?;
            *counts.entry(ExecutionStatus::from_remote(&status)).or_insert(0) += count;
        }
        Ok(counts)
    }

    async fn all_records(&self) -> Result<Vec<LedgerRecord>> {
        let rows = sqlx::query("SELECT * FROM file_status ORDER BY file_key")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(record_from_row).collect()
    }
}
