use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pitsent_core::{CandidatePost, LedgerStatus, ProcessingLedgerEntry};
use pitsent_db::InsertOutcome;

use super::{Ledger, PostStore};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Inner {
    /// Insertion-ordered post ids.
    order: Vec<String>,
    posts: HashMap<String, CandidatePost>,
    ledger: HashMap<(String, NaiveDate), ProcessingLedgerEntry>,
    insert_failure: Option<String>,
    /// 1-based `insert_new` call that fails, with its reason.
    failing_insert_call: Option<(usize, String)>,
    insert_calls: usize,
}

/// In-process store and ledger used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Rejected("memory store lock poisoned".to_string()))
    }

    /// Preload posts, bypassing the insert path.
    pub fn seed_posts(&self, posts: impl IntoIterator<Item = CandidatePost>) {
        if let Ok(mut inner) = self.inner.lock() {
            for post in posts {
                if !inner.posts.contains_key(&post.natural_id) {
                    inner.order.push(post.natural_id.clone());
                }
                inner.posts.insert(post.natural_id.clone(), post);
            }
        }
    }

    /// Preload a ledger entry, e.g. a stale `in_progress` row.
    pub fn seed_ledger(&self, entry: ProcessingLedgerEntry) {
        if let Ok(mut inner) = self.inner.lock() {
            inner
                .ledger
                .insert((entry.ticker.clone(), entry.processed_date), entry);
        }
    }

    /// Make every following `insert_new` fail with `reason`; `None` clears it.
    pub fn fail_inserts_with(&self, reason: Option<&str>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.insert_failure = reason.map(str::to_string);
        }
    }

    /// Make only the `n`th `insert_new` call (1-based) fail with `reason`.
    pub fn fail_insert_call(&self, n: usize, reason: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing_insert_call = Some((n, reason.to_string()));
        }
    }

    #[must_use]
    pub fn ledger_entry(&self, ticker: &str, day: NaiveDate) -> Option<ProcessingLedgerEntry> {
        let inner = self.inner.lock().ok()?;
        inner.ledger.get(&(ticker.to_string(), day)).cloned()
    }

    #[must_use]
    pub fn post_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.posts.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn post(&self, id: &str) -> Option<CandidatePost> {
        self.inner.lock().ok()?.posts.get(id).cloned()
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn exists_by_ids(&self, ids: &[String]) -> Result<HashSet<String>, StoreError> {
        let inner = self.lock()?;
        Ok(ids
            .iter()
            .filter(|id| inner.posts.contains_key(*id))
            .cloned()
            .collect())
    }

    async fn insert_new(&self, posts: &[CandidatePost]) -> Result<InsertOutcome, StoreError> {
        let mut inner = self.lock()?;
        inner.insert_calls += 1;
        if let Some(reason) = &inner.insert_failure {
            return Err(StoreError::Rejected(reason.clone()));
        }
        if let Some((n, reason)) = &inner.failing_insert_call {
            if *n == inner.insert_calls {
                return Err(StoreError::Rejected(reason.clone()));
            }
        }

        let inner = &mut *inner;
        let mut outcome = InsertOutcome::default();
        for post in posts {
            match inner.posts.entry(post.natural_id.clone()) {
                Entry::Occupied(mut existing) => {
                    let existing = existing.get_mut();
                    existing.upvote_count = post.upvote_count;
                    existing.comment_count = post.comment_count;
                    outcome.skipped += 1;
                }
                Entry::Vacant(slot) => {
                    inner.order.push(post.natural_id.clone());
                    slot.insert(post.clone());
                    outcome.inserted += 1;
                }
            }
        }
        Ok(outcome)
    }

    async fn posts_in_window(
        &self,
        ticker: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<CandidatePost>, StoreError> {
        let inner = self.lock()?;
        let mut posts: Vec<CandidatePost> = inner
            .order
            .iter()
            .filter_map(|id| inner.posts.get(id))
            .filter(|p| p.owning_ticker == ticker && p.created_at >= from && p.created_at < until)
            .cloned()
            .collect();
        posts.sort_by_key(|p| p.created_at);
        Ok(posts)
    }
}

#[async_trait]
impl Ledger for MemoryStore {
    async fn is_processed(&self, ticker: &str, day: NaiveDate) -> Result<bool, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .ledger
            .get(&(ticker.to_string(), day))
            .is_some_and(|e| e.status == LedgerStatus::Completed))
    }

    async fn mark_started(
        &self,
        ticker: &str,
        day: NaiveDate,
        started_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let key = (ticker.to_string(), day);
        if inner
            .ledger
            .get(&key)
            .is_some_and(|e| e.status == LedgerStatus::Completed)
        {
            return Ok(false);
        }
        inner.ledger.insert(
            key,
            ProcessingLedgerEntry {
                ticker: ticker.to_string(),
                processed_date: day,
                status: LedgerStatus::InProgress,
                posts_found: 0,
                posts_inserted: 0,
                started_at,
                completed_at: None,
                error_message: None,
            },
        );
        Ok(true)
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
        let mut inner = self.lock()?;
        let entry = inner
            .ledger
            .get_mut(&(ticker.to_string(), day))
            .filter(|e| e.status == LedgerStatus::InProgress && status.is_terminal())
            .ok_or_else(|| {
                StoreError::Rejected(format!(
                    "ledger entry {ticker}/{day} is not in 'in_progress' status"
                ))
            })?;

        entry.status = status;
        entry.posts_found = i32::try_from(posts_found).unwrap_or(i32::MAX);
        entry.posts_inserted = i32::try_from(posts_inserted).unwrap_or(i32::MAX);
        entry.error_message = error_message.map(str::to_string);
        entry.completed_at = Some(Utc::now());
        Ok(())
    }
}
