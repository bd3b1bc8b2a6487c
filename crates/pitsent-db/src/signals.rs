//! Database operations for the `sentiment_signals` table.

use chrono::{DateTime, NaiveDate, Utc};
use pitsent_core::SentimentSignal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

const SIGNAL_SCALE: u32 = 6;

/// A row from the `sentiment_signals` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SentimentSignalRow {
    pub id: i64,
    pub asof_date: NaiveDate,
    pub ticker: String,
    pub signal_name: String,
    pub value: Option<Decimal>,
    pub confidence: Decimal,
    pub posts_analyzed: i32,
    pub calculation_method: String,
    pub search_terms: String,
    pub metadata: Value,
    pub updated_at: DateTime<Utc>,
}

fn to_decimal(column: &'static str, v: f64) -> Result<Decimal, DbError> {
    Decimal::from_f64(v)
        .map(|d| d.round_dp(SIGNAL_SCALE))
        .ok_or_else(|| DbError::InvalidColumnValue {
            column,
            value: v.to_string(),
        })
}

/// Upsert signals keyed by `(asof_date, ticker, signal_name)`.
///
/// `metadata` is stored as JSONB on every row. All rows are written in one
/// transaction. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::InvalidColumnValue`] for non-finite numbers, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn upsert_sentiment_signals(
    pool: &PgPool,
    signals: &[SentimentSignal],
    metadata: &Value,
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for signal in signals {
        let value = signal
            .value
            .map(|v| to_decimal("value", v))
            .transpose()?;
        let confidence = to_decimal("confidence", signal.confidence)?;
        let posts_analyzed = i32::try_from(signal.posts_analyzed).map_err(|_| {
            DbError::InvalidColumnValue {
                column: "posts_analyzed",
                value: signal.posts_analyzed.to_string(),
            }
        })?;

        sqlx::query(
            "INSERT INTO sentiment_signals \
                 (asof_date, ticker, signal_name, value, confidence, posts_analyzed, \
                  calculation_method, search_terms, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (asof_date, ticker, signal_name) DO UPDATE SET \
                 value = EXCLUDED.value, \
                 confidence = EXCLUDED.confidence, \
                 posts_analyzed = EXCLUDED.posts_analyzed, \
                 calculation_method = EXCLUDED.calculation_method, \
                 search_terms = EXCLUDED.search_terms, \
                 metadata = EXCLUDED.metadata, \
                 updated_at = NOW()",
        )
        .bind(signal.as_of_date)
        .bind(&signal.ticker)
        .bind(&signal.signal_name)
        .bind(value)
        .bind(confidence)
        .bind(posts_analyzed)
        .bind(signal.calculation_method.as_str())
        .bind(&signal.search_terms)
        .bind(metadata)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}

/// Signals for one name in `[start, end]`, ordered by date then ticker.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sentiment_signals(
    pool: &PgPool,
    signal_name: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<SentimentSignalRow>, DbError> {
    let rows = sqlx::query_as::<_, SentimentSignalRow>(
        "SELECT id, asof_date, ticker, signal_name, value, confidence, posts_analyzed, \
                calculation_method, search_terms, metadata, updated_at \
         FROM sentiment_signals \
         WHERE signal_name = $1 AND asof_date >= $2 AND asof_date <= $3 \
         ORDER BY asof_date ASC, ticker ASC",
    )
    .bind(signal_name)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
