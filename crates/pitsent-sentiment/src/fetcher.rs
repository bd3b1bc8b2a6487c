//! Per-keyword, per-day candidate collection from a [`SearchSource`].
//!
//! Results of a "top of day" and a "newest" ranking are merged per keyword.
//! Search failures never escape a keyword; whatever was collected before the
//! failure is returned.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use pitsent_core::{day_bounds, AppConfig, CandidatePost};

use crate::cancel::CancelToken;
use crate::error::{SearchError, SentimentError};
use crate::sources::SearchSource;
use crate::types::{SearchQuery, SortOrder, TimeFilter};

const STRATEGIES: [(SortOrder, TimeFilter); 2] =
    [(SortOrder::Top, TimeFilter::Day), (SortOrder::New, TimeFilter::All)];

/// Largest page the search API serves.
const MAX_PAGE_SIZE: usize = 100;

/// Rate-limit waits allowed per strategy before moving on.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub per_day_cap: usize,
    /// Raw results scanned per strategy.
    pub search_limit: usize,
    /// Pause between consecutive pages.
    pub inter_request_delay: Duration,
    /// Pause after a transient failure before the keyword is abandoned.
    pub transient_backoff: Duration,
    /// Wait used when a rate-limit response carries no hint.
    pub default_rate_limit_wait: Duration,
}

impl FetchSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            per_day_cap: config.per_day_cap,
            search_limit: config.search_limit,
            inter_request_delay: Duration::from_millis(config.inter_request_delay_ms),
            transient_backoff: Duration::from_secs(config.transient_backoff_secs),
            default_rate_limit_wait: Duration::from_secs(config.default_rate_limit_wait_secs),
        }
    }

    /// Soft bound on merged candidates per keyword.
    #[must_use]
    pub fn candidate_cap(&self) -> usize {
        self.per_day_cap.saturating_mul(2)
    }
}

/// How one strategy's pagination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrategyEnd {
    Exhausted,
    CapReached,
    /// Search failed; the rest of this keyword is skipped for this round.
    Abandoned,
    Cancelled,
}

pub struct PostFetcher<'a> {
    source: &'a dyn SearchSource,
    settings: FetchSettings,
    cancel: CancelToken,
}

impl<'a> PostFetcher<'a> {
    #[must_use]
    pub fn new(source: &'a dyn SearchSource, settings: FetchSettings, cancel: CancelToken) -> Self {
        Self {
            source,
            settings,
            cancel,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Collect candidates for `keyword` created on `day` (UTC), tagged with
    /// `ticker`.
    ///
    /// Results from both strategies are merged in arrival order, deduplicated
    /// by post id and capped at twice the per-day cap.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Cancelled`] if the token trips; no other
    /// error escapes.
    pub async fn fetch(
        &self,
        ticker: &str,
        keyword: &str,
        day: NaiveDate,
    ) -> Result<Vec<CandidatePost>, SentimentError> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for (sort, time_filter) in STRATEGIES {
            let end = self
                .run_strategy(ticker, keyword, day, sort, time_filter, &mut seen, &mut candidates)
                .await;
            match end {
                StrategyEnd::Exhausted => {}
                StrategyEnd::CapReached | StrategyEnd::Abandoned => break,
                StrategyEnd::Cancelled => return Err(SentimentError::Cancelled),
            }
        }

        tracing::debug!(
            ticker,
            keyword,
            %day,
            candidates = candidates.len(),
            "fetched candidates"
        );

        Ok(candidates)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_strategy(
        &self,
        ticker: &str,
        keyword: &str,
        day: NaiveDate,
        sort: SortOrder,
        time_filter: TimeFilter,
        seen: &mut HashSet<String>,
        out: &mut Vec<CandidatePost>,
    ) -> StrategyEnd {
        let (start, end) = day_bounds(day);
        let cap = self.settings.candidate_cap();
        let phrase = SearchQuery::phrase(keyword);
        let mut after: Option<String> = None;
        let mut scanned = 0usize;
        let mut rate_limit_waits = 0u32;

        while scanned < self.settings.search_limit {
            if self.cancel.is_cancelled() {
                return StrategyEnd::Cancelled;
            }

            let query = SearchQuery {
                query: phrase.clone(),
                sort,
                time_filter,
                limit: (self.settings.search_limit - scanned).min(MAX_PAGE_SIZE),
            };

            match self.source.search(&query, after.as_deref()).await {
                Ok(page) => {
                    if page.posts.is_empty() {
                        return StrategyEnd::Exhausted;
                    }
                    scanned += page.posts.len();
                    let past_day = sort == SortOrder::New
                        && page
                            .posts
                            .last()
                            .is_some_and(|p| p.created_utc < start.timestamp());

                    for raw in page.posts {
                        if !seen.insert(raw.id.clone()) {
                            continue;
                        }
                        let Some(post) = raw.into_candidate(keyword, ticker) else {
                            continue;
                        };
                        if !in_window(post.created_at, start, end) {
                            continue;
                        }
                        out.push(post);
                        if out.len() >= cap {
                            return StrategyEnd::CapReached;
                        }
                    }

                    // Newest-first listings never come back to the target day.
                    if past_day {
                        return StrategyEnd::Exhausted;
                    }
                    match page.after {
                        Some(next) => after = Some(next),
                        None => return StrategyEnd::Exhausted,
                    }
                    if !self.cancel.sleep(self.settings.inter_request_delay).await {
                        return StrategyEnd::Cancelled;
                    }
                }
                Err(SearchError::RateLimited { retry_after_secs }) => {
                    if rate_limit_waits >= MAX_RATE_LIMIT_RETRIES {
                        tracing::warn!(
                            ticker,
                            keyword,
                            sort = sort.as_str(),
                            attempts = rate_limit_waits,
                            "still rate limited, skipping keyword for this round"
                        );
                        return StrategyEnd::Abandoned;
                    }
                    rate_limit_waits += 1;
                    let wait = retry_after_secs
                        .map_or(self.settings.default_rate_limit_wait, Duration::from_secs);
                    tracing::warn!(
                        ticker,
                        keyword,
                        sort = sort.as_str(),
                        wait_secs = wait.as_secs(),
                        attempt = rate_limit_waits,
                        "rate limited by search source"
                    );
                    if !self.cancel.sleep(wait).await {
                        return StrategyEnd::Cancelled;
                    }
                }
                Err(SearchError::Transient(reason)) => {
                    let wait = jittered(self.settings.transient_backoff);
                    tracing::warn!(
                        ticker,
                        keyword,
                        sort = sort.as_str(),
                        delay_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        error = %reason,
                        "transient search failure, skipping keyword for this round"
                    );
                    if !self.cancel.sleep(wait).await {
                        return StrategyEnd::Cancelled;
                    }
                    return StrategyEnd::Abandoned;
                }
                Err(e) => {
                    tracing::error!(
                        ticker,
                        keyword,
                        sort = sort.as_str(),
                        error = %e,
                        "search failed, skipping keyword"
                    );
                    return StrategyEnd::Abandoned;
                }
            }
        }

        StrategyEnd::Exhausted
    }
}

fn in_window(at: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    at >= start && at < end
}

/// `base` ± 25 % jitter.
fn jittered(base: Duration) -> Duration {
    if base.is_zero() {
        return base;
    }
    base.mul_f64(rand::random::<f64>() * 0.5 + 0.75)
}
