//! Database operations for the `reddit_processing_log` ledger.
//!
//! One row per `(ticker, processed_date)`. A row moves from `in_progress` to
//! exactly one terminal status; only `completed` marks the day as done.

use chrono::{DateTime, NaiveDate, Utc};
use pitsent_core::{LedgerStatus, ProcessingLedgerEntry};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `reddit_processing_log` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProcessingLogRow {
    pub id: i64,
    pub ticker: String,
    pub processed_date: NaiveDate,
    pub posts_found: i32,
    pub posts_inserted: i32,
    pub processing_started_at: DateTime<Utc>,
    pub processing_completed_at: Option<DateTime<Utc>>,
    pub status: String,
    pub error_message: Option<String>,
}

impl ProcessingLogRow {
    /// Convert into the domain ledger entry.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumnValue`] for an unknown `status`.
    pub fn into_entry(self) -> Result<ProcessingLedgerEntry, DbError> {
        let status = self
            .status
            .parse::<LedgerStatus>()
            .map_err(|_| DbError::InvalidColumnValue {
                column: "status",
                value: self.status.clone(),
            })?;

        Ok(ProcessingLedgerEntry {
            ticker: self.ticker,
            processed_date: self.processed_date,
            status,
            posts_found: self.posts_found,
            posts_inserted: self.posts_inserted,
            started_at: self.processing_started_at,
            completed_at: self.processing_completed_at,
            error_message: self.error_message,
        })
    }
}

/// `true` iff a `completed` row exists for the pair.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn is_processed(pool: &PgPool, ticker: &str, date: NaiveDate) -> Result<bool, DbError> {
    let done: bool = sqlx::query_scalar(
        "SELECT EXISTS ( \
             SELECT 1 FROM reddit_processing_log \
             WHERE ticker = $1 AND processed_date = $2 AND status = 'completed' \
         )",
    )
    .bind(ticker)
    .bind(date)
    .fetch_one(pool)
    .await?;

    Ok(done)
}

/// Open (or reopen) the ledger row as `in_progress` with zeroed counts.
///
/// A `completed` row is left untouched and `false` is returned; failed,
/// skipped and stale `in_progress` rows are reset.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn mark_started(
    pool: &PgPool,
    ticker: &str,
    date: NaiveDate,
    started_at: DateTime<Utc>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO reddit_processing_log \
             (ticker, processed_date, processing_started_at, status) \
         VALUES ($1, $2, $3, 'in_progress') \
         ON CONFLICT (ticker, processed_date) DO UPDATE SET \
             status = 'in_progress', \
             posts_found = 0, \
             posts_inserted = 0, \
             processing_started_at = EXCLUDED.processing_started_at, \
             processing_completed_at = NULL, \
             error_message = NULL \
         WHERE reddit_processing_log.status <> 'completed'",
    )
    .bind(ticker)
    .bind(date)
    .bind(started_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Move an `in_progress` row to a terminal status.
///
/// # Errors
///
/// Returns [`DbError::InvalidLedgerTransition`] when `status` is
/// `in_progress` or the row is not currently `in_progress`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_finished(
    pool: &PgPool,
    ticker: &str,
    date: NaiveDate,
    status: LedgerStatus,
    posts_found: i32,
    posts_inserted: i32,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    if !status.is_terminal() {
        return Err(DbError::InvalidLedgerTransition {
            ticker: ticker.to_string(),
            date,
            expected_status: "in_progress",
        });
    }

    let result = sqlx::query(
        "UPDATE reddit_processing_log \
         SET status = $1, posts_found = $2, posts_inserted = $3, \
             error_message = $4, processing_completed_at = NOW() \
         WHERE ticker = $5 AND processed_date = $6 AND status = 'in_progress'",
    )
    .bind(status.as_str())
    .bind(posts_found)
    .bind(posts_inserted)
    .bind(error_message)
    .bind(ticker)
    .bind(date)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidLedgerTransition {
            ticker: ticker.to_string(),
            date,
            expected_status: "in_progress",
        });
    }

    Ok(())
}

/// Most recently started ledger rows, optionally filtered.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_processing_log(
    pool: &PgPool,
    ticker: Option<&str>,
    status: Option<LedgerStatus>,
    limit: i64,
) -> Result<Vec<ProcessingLogRow>, DbError> {
    let rows = sqlx::query_as::<_, ProcessingLogRow>(
        "SELECT id, ticker, processed_date, posts_found, posts_inserted, \
                processing_started_at, processing_completed_at, status, error_message \
         FROM reddit_processing_log \
         WHERE ($1::text IS NULL OR ticker = $1) \
           AND ($2::text IS NULL OR status = $2) \
         ORDER BY processing_started_at DESC, id DESC \
         LIMIT $3",
    )
    .bind(ticker)
    .bind(status.map(LedgerStatus::as_str))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
