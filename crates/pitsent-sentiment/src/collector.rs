//! Ledger-bracketed collection of one (ticker, day) unit at a time.
//!
//! Units run strictly in sequence. Each unit commits its own posts, so a
//! failure in one never rolls back another. Every claimed unit is finalized
//! unless the run is cancelled, in which case the entry stays `in_progress`
//! and the next run picks it up again.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use pitsent_core::{day_bounds, CandidatePost, KeywordEntry, KeywordRegistry, LedgerStatus};

use crate::cancel::CancelToken;
use crate::error::SentimentError;
use crate::fetcher::PostFetcher;
use crate::selector::select_for_day;
use crate::store::{Ledger, PostStore};

/// How a single unit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// A `completed` ledger entry already existed; nothing was fetched.
    AlreadyProcessed,
    /// The day's 24h window has not elapsed yet; finalized as `skipped`.
    NotClosed,
    Completed { found: usize, inserted: usize },
    /// Finalized as `failed` with the error captured in the ledger.
    Failed { found: usize, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub ticker: String,
    pub day: NaiveDate,
    pub error: String,
}

/// End-of-run counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectSummary {
    pub completed: usize,
    pub already_processed: usize,
    pub not_closed: usize,
    pub failed: usize,
    pub posts_found: usize,
    pub posts_inserted: usize,
    pub failures: Vec<UnitFailure>,
}

impl CollectSummary {
    fn record(&mut self, ticker: &str, day: NaiveDate, outcome: &UnitOutcome) {
        match outcome {
            UnitOutcome::AlreadyProcessed => self.already_processed += 1,
            UnitOutcome::NotClosed => self.not_closed += 1,
            UnitOutcome::Completed { found, inserted } => {
                self.completed += 1;
                self.posts_found += found;
                self.posts_inserted += inserted;
            }
            UnitOutcome::Failed { found, error } => {
                self.posts_found += found;
                self.record_failure(ticker, day, error.clone());
            }
        }
    }

    fn record_failure(&mut self, ticker: &str, day: NaiveDate, error: String) {
        self.failed += 1;
        self.failures.push(UnitFailure {
            ticker: ticker.to_string(),
            day,
            error,
        });
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

pub struct DayCollector<'a> {
    fetcher: PostFetcher<'a>,
    store: &'a dyn PostStore,
    ledger: &'a dyn Ledger,
    cancel: CancelToken,
}

impl<'a> DayCollector<'a> {
    #[must_use]
    pub fn new(
        fetcher: PostFetcher<'a>,
        store: &'a dyn PostStore,
        ledger: &'a dyn Ledger,
        cancel: CancelToken,
    ) -> Self {
        Self {
            fetcher,
            store,
            ledger,
            cancel,
        }
    }

    /// Collect every `(day, ticker)` pair, day-major.
    ///
    /// A ticker missing from `registry` is searched by its own symbol. Unit
    /// failures are counted and the run continues.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Cancelled`] as soon as the run is cancelled.
    pub async fn collect_range(
        &self,
        registry: &KeywordRegistry,
        tickers: &[String],
        days: &[NaiveDate],
        now: DateTime<Utc>,
    ) -> Result<CollectSummary, SentimentError> {
        let mut summary = CollectSummary::default();

        for &day in days {
            for ticker in tickers {
                if self.cancel.is_cancelled() {
                    return Err(SentimentError::Cancelled);
                }

                let keywords = keywords_or_symbol(registry, ticker);
                match self.collect_unit(ticker, &keywords, day, now).await {
                    Ok(outcome) => {
                        if let UnitOutcome::Failed { error, .. } = &outcome {
                            tracing::error!(ticker, %day, error = %error, "unit failed");
                        }
                        summary.record(ticker, day, &outcome);
                    }
                    Err(SentimentError::Cancelled) => return Err(SentimentError::Cancelled),
                    Err(e) => {
                        tracing::error!(ticker, %day, error = %e, "unit could not be tracked");
                        summary.record_failure(ticker, day, e.to_string());
                    }
                }
            }
        }

        tracing::info!(
            completed = summary.completed,
            already_processed = summary.already_processed,
            not_closed = summary.not_closed,
            failed = summary.failed,
            posts_found = summary.posts_found,
            posts_inserted = summary.posts_inserted,
            "collection finished"
        );

        Ok(summary)
    }

    /// Process one `(ticker, day)` unit.
    ///
    /// `keywords` are tried in order until the per-day cap is filled.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Cancelled`] without finalizing the ledger
    /// entry, or [`SentimentError::DataIntegrity`] when the ledger itself
    /// cannot be read or written. Fetch and insert failures are finalized as
    /// `failed` and returned as [`UnitOutcome::Failed`].
    pub async fn collect_unit(
        &self,
        ticker: &str,
        keywords: &[KeywordEntry],
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<UnitOutcome, SentimentError> {
        if self.ledger.is_processed(ticker, day).await? {
            tracing::debug!(ticker, %day, "already processed, skipping");
            return Ok(UnitOutcome::AlreadyProcessed);
        }
        if !self.ledger.mark_started(ticker, day, now).await? {
            return Ok(UnitOutcome::AlreadyProcessed);
        }

        let (_, day_end) = day_bounds(day);
        if now < day_end {
            tracing::info!(ticker, %day, "day not closed yet, skipping");
            self.ledger
                .mark_finished(
                    ticker,
                    day,
                    LedgerStatus::Skipped,
                    0,
                    0,
                    Some("day not closed"),
                )
                .await?;
            return Ok(UnitOutcome::NotClosed);
        }

        let mut found = 0usize;
        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(SentimentError::Cancelled),
            r = self.run_unit(ticker, keywords, day, &mut found) => r,
        };

        match result {
            Ok(inserted) => {
                self.ledger
                    .mark_finished(ticker, day, LedgerStatus::Completed, found, inserted, None)
                    .await?;
                Ok(UnitOutcome::Completed { found, inserted })
            }
            Err(SentimentError::Cancelled) => {
                tracing::warn!(ticker, %day, "cancelled, leaving ledger entry in progress");
                Err(SentimentError::Cancelled)
            }
            Err(e) => {
                let error = e.to_string();
                self.ledger
                    .mark_finished(ticker, day, LedgerStatus::Failed, found, 0, Some(&error))
                    .await?;
                Ok(UnitOutcome::Failed { found, error })
            }
        }
    }

    /// Fetch, rank and store one unit. Returns the number of new posts.
    async fn run_unit(
        &self,
        ticker: &str,
        keywords: &[KeywordEntry],
        day: NaiveDate,
        found: &mut usize,
    ) -> Result<usize, SentimentError> {
        let cap = self.fetcher.settings().per_day_cap;
        let mut seen: HashSet<String> = HashSet::new();
        let mut selected: Vec<CandidatePost> = Vec::new();

        for entry in keywords {
            if selected.len() >= cap {
                break;
            }
            let candidates = self.fetcher.fetch(ticker, &entry.keyword, day).await?;
            let fresh: Vec<CandidatePost> = candidates
                .into_iter()
                .filter(|p| !seen.contains(&p.natural_id))
                .collect();
            let picked = select_for_day(fresh, &entry.keyword, day, cap - selected.len());

            tracing::debug!(
                ticker,
                %day,
                keyword = %entry.keyword,
                picked = picked.len(),
                "keyword selection"
            );

            for post in picked {
                seen.insert(post.natural_id.clone());
                selected.push(post);
            }
            *found = selected.len();
        }

        if selected.is_empty() {
            return Ok(0);
        }

        let outcome = self.store.insert_new(&selected).await?;

        tracing::info!(
            ticker,
            %day,
            found = selected.len(),
            inserted = outcome.inserted,
            already_stored = outcome.skipped,
            "stored posts"
        );

        Ok(outcome.inserted)
    }
}

fn keywords_or_symbol(registry: &KeywordRegistry, ticker: &str) -> Vec<KeywordEntry> {
    match registry.keywords_for(ticker) {
        Ok(list) if !list.is_empty() => list,
        _ => {
            tracing::warn!(ticker, "no keywords configured, searching by ticker symbol");
            vec![KeywordEntry::ticker_fallback(ticker)]
        }
    }
}
