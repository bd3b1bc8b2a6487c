use chrono::NaiveDate;
use pitsent_db::DbError;
use thiserror::Error;

/// Failures reported by a [`crate::SearchSource`].
///
/// These never escape the fetch of a single keyword: the fetcher recovers
/// locally and keeps whatever it had already collected.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP 429. `retry_after_secs` carries the server's hint when present.
    #[error("rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// 5xx, timeouts and connection failures.
    #[error("transient search failure: {0}")]
    Transient(String),

    #[error("search authentication failed: {0}")]
    Auth(String),

    #[error("unexpected search failure: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error()) {
            SearchError::Transient(e.to_string())
        } else {
            SearchError::Unexpected(e.to_string())
        }
    }
}

/// Failures from a post store or ledger backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("store rejected write: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("data integrity error: {0}")]
    DataIntegrity(#[from] StoreError),

    #[error("signal coverage mismatch: expected {expected} rows, produced {actual}")]
    CoverageInvariant { expected: usize, actual: usize },

    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("export failed: {0}")]
    Export(String),

    #[error("cancelled by user")]
    Cancelled,
}

impl From<csv::Error> for SentimentError {
    fn from(e: csv::Error) -> Self {
        SentimentError::Export(e.to_string())
    }
}

impl From<std::io::Error> for SentimentError {
    fn from(e: std::io::Error) -> Self {
        SentimentError::Export(e.to_string())
    }
}
