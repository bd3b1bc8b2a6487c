use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pitsent_core::{CandidatePost, LedgerStatus};
use pitsent_db::InsertOutcome;
use sqlx::PgPool;

use super::{Ledger, PostStore};
use crate::error::StoreError;

/// Postgres-backed post store and ledger.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn count_column(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

#[async_trait]
impl PostStore for PgStore {
    async fn exists_by_ids(&self, ids: &[String]) -> Result<HashSet<String>, StoreError> {
        Ok(pitsent_db::existing_reddit_ids(&self.pool, ids).await?)
    }

    async fn insert_new(&self, posts: &[CandidatePost]) -> Result<InsertOutcome, StoreError> {
        Ok(pitsent_db::insert_new_posts(&self.pool, posts, Utc::now()).await?)
    }

    async fn posts_in_window(
        &self,
        ticker: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<CandidatePost>, StoreError> {
        let rows = pitsent_db::list_posts_in_window(&self.pool, ticker, from, until).await?;
        Ok(rows
            .into_iter()
            .map(pitsent_db::RedditPostRow::into_candidate)
            .collect())
    }
}

#[async_trait]
impl Ledger for PgStore {
    async fn is_processed(&self, ticker: &str, day: NaiveDate) -> Result<bool, StoreError> {
        Ok(pitsent_db::is_processed(&self.pool, ticker, day).await?)
    }

    async fn mark_started(
        &self,
        ticker: &str,
        day: NaiveDate,
        started_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(pitsent_db::mark_started(&self.pool, ticker, day, started_at).await?)
    }

    async fn mark_finished(
        &self,
        ticker: &str,
        day: NaiveDate,
        status: LedgerStatus,
        posts_found: usize,
        posts_inserted: usize,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        pitsent_db::mark_finished(
            &self.pool,
            ticker,
            day,
            status,
            count_column(posts_found),
            count_column(posts_inserted),
            error_message,
        )
        .await?;
        Ok(())
    }
}
