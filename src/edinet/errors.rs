//! EDINET-specific error types

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EdinetError {
    #[error("Invalid date range: end date {end} precedes start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Failed to parse EDINET listing response for date {date}: {source}")]
    ResponseParse {
        date: NaiveDate,
        #[source]
        source: serde_json::Error,
    },

    #[error("EDINET API error (status {status_code}): {message}")]
    Api { status_code: u16, message: String },

    #[error("Document {0} is already recorded in the ledger")]
    DuplicateKey(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Invalid document id: {0:?}")]
    InvalidDocId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EdinetError {
    /// Whether the error should abort the whole run instead of skipping one
    /// date or one document.
    ///
    /// Ledger failures end the run because the download dedup can no longer
    /// be trusted. A duplicate key means a caller skipped the
    /// `is_downloaded` check.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EdinetError::InvalidRange { .. }
                | EdinetError::DuplicateKey(_)
                | EdinetError::Database(_)
                | EdinetError::Config(_)
        )
    }

    /// Transport, status and parse failures on either remote endpoint.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            EdinetError::Http(_)
                | EdinetError::Timeout(_)
                | EdinetError::Api { .. }
                | EdinetError::ResponseParse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EdinetError>;
