//! Database-backed keyword registry (`company_keywords`).

use chrono::{DateTime, Utc};
use pitsent_core::KeywordEntry;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `company_keywords` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompanyKeywordRow {
    pub id: i64,
    pub ticker: String,
    pub keyword: String,
    pub priority: i32,
    pub company_uid: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CompanyKeywordRow> for KeywordEntry {
    fn from(row: CompanyKeywordRow) -> Self {
        KeywordEntry {
            ticker: row.ticker,
            keyword: row.keyword,
            priority: row.priority,
            company_uid: row.company_uid,
        }
    }
}

/// All keyword rows in insertion order, optionally limited to `tickers`.
///
/// Insertion order (`id`) is what breaks priority ties in the registry.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_company_keywords(
    pool: &PgPool,
    tickers: Option<&[String]>,
) -> Result<Vec<CompanyKeywordRow>, DbError> {
    let rows = sqlx::query_as::<_, CompanyKeywordRow>(
        "SELECT id, ticker, keyword, priority, company_uid, created_at \
         FROM company_keywords \
         WHERE ($1::text[] IS NULL OR ticker = ANY($1)) \
         ORDER BY id ASC",
    )
    .bind(tickers)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Upsert keyword entries keyed by `(ticker, lower(keyword))`.
///
/// A keyword differing only in case replaces the stored spelling.
///
/// Runs in a single transaction and returns the number of entries processed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is written.
pub async fn seed_company_keywords(pool: &PgPool, entries: &[KeywordEntry]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for entry in entries {
        sqlx::query(
            "INSERT INTO company_keywords (ticker, keyword, priority, company_uid) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (ticker, (lower(keyword))) DO UPDATE SET \
                 keyword = EXCLUDED.keyword, \
                 priority = EXCLUDED.priority, \
                 company_uid = EXCLUDED.company_uid, \
                 updated_at = NOW()",
        )
        .bind(&entry.ticker)
        .bind(&entry.keyword)
        .bind(entry.priority)
        .bind(&entry.company_uid)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
