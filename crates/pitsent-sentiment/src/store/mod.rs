//! Storage seams for collected posts and the processing ledger.
//!
//! [`PgStore`] is the production backend; [`MemoryStore`] backs dry runs and
//! tests with the same transition rules.

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pitsent_core::{CandidatePost, LedgerStatus};
pub use pitsent_db::InsertOutcome;

use crate::error::StoreError;

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Subset of `ids` already stored.
    async fn exists_by_ids(&self, ids: &[String]) -> Result<HashSet<String>, StoreError>;

    /// Insert posts not yet stored and refresh engagement counts of the rest.
    ///
    /// All-or-nothing: on error no post from this call is written.
    async fn insert_new(&self, posts: &[CandidatePost]) -> Result<InsertOutcome, StoreError>;

    /// Posts for `ticker` created in `[from, until)`.
    async fn posts_in_window(
        &self,
        ticker: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<CandidatePost>, StoreError>;
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// `true` only when a `completed` entry exists.
    async fn is_processed(&self, ticker: &str, day: NaiveDate) -> Result<bool, StoreError>;

    /// Open the entry as `in_progress`. Returns `false` when the day is
    /// already completed and nothing was claimed.
    async fn mark_started(
        &self,
        ticker: &str,
        day: NaiveDate,
        started_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Move an `in_progress` entry to a terminal status.
    async fn mark_finished(
        &self,
        ticker: &str,
        day: NaiveDate,
        status: LedgerStatus,
        posts_found: usize,
        posts_inserted: usize,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;
}
