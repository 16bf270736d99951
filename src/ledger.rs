//! Download ledger: companies and documents already fetched from EDINET

use crate::edinet::errors::{EdinetError, Result};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS companies (
        company_id INTEGER PRIMARY KEY AUTOINCREMENT,
        filer_name TEXT NOT NULL,
        sec_code TEXT NOT NULL,
        UNIQUE(filer_name, sec_code)
    );

    CREATE TABLE IF NOT EXISTS documents (
        doc_id TEXT PRIMARY KEY,
        submission_date DATE NOT NULL,
        company_id INTEGER NOT NULL,
        downloaded INTEGER NOT NULL DEFAULT 0,
        FOREIGN KEY (company_id) REFERENCES companies(company_id)
    );

    CREATE INDEX IF NOT EXISTS idx_submission_date ON documents (submission_date);
    CREATE INDEX IF NOT EXISTS idx_company_id ON documents (company_id);
"#;

/// Ledger handle. Owns the connection pool; every operation acquires a
/// connection for its own short statement or transaction only.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Open (creating if needed) the ledger file and ensure the schema exists
    pub async fn open(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        // runs are strictly sequential
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;

        debug!(path = %database_path.display(), "Opened download ledger");
        Ok(Ledger { pool })
    }

    /// Insert the company if absent and return its id either way
    pub async fn register_company(&self, filer_name: &str, sec_code: &str) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO companies (filer_name, sec_code) VALUES (?, ?)")
            .bind(filer_name)
            .bind(sec_code)
            .execute(&mut *tx)
            .await?;

        let company_id: i64 = sqlx::query_scalar(
            "SELECT company_id FROM companies WHERE filer_name = ? AND sec_code = ?",
        )
        .bind(filer_name)
        .bind(sec_code)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(company_id)
    }

    /// True only when a row exists for `doc_id` with its downloaded flag set
    pub async fn is_downloaded(&self, doc_id: &str) -> Result<bool> {
        let downloaded: Option<bool> =
            sqlx::query_scalar("SELECT downloaded FROM documents WHERE doc_id = ?")
                .bind(doc_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(downloaded.unwrap_or(false))
    }

    /// Append a downloaded document. Never upserts: an existing `doc_id`
    /// yields [`EdinetError::DuplicateKey`].
    pub async fn record_downloaded(
        &self,
        doc_id: &str,
        submission_date: NaiveDate,
        company_id: i64,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (doc_id, submission_date, company_id, downloaded)
            VALUES (?, ?, ?, 1)
            "#,
        )
        .bind(doc_id)
        .bind(submission_date)
        .bind(company_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(EdinetError::DuplicateKey(doc_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Set the downloaded flag on an existing row that lacks it.
    ///
    /// Rows with `downloaded = 0` come from ledgers written by other tools
    /// or interrupted bookkeeping. Returns whether a row was changed.
    pub async fn mark_downloaded(&self, doc_id: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE documents SET downloaded = 1 WHERE doc_id = ? AND downloaded = 0")
                .bind(doc_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Number of company rows
    pub async fn company_count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM companies")
            .fetch_one(&self.pool)
            .await?)
    }

    /// Number of document rows marked downloaded
    pub async fn downloaded_count(&self) -> Result<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE downloaded = 1")
                .fetch_one(&self.pool)
                .await?,
        )
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
