//! Per-day ranking and capping of fetched candidates.

use chrono::NaiveDate;
use pitsent_core::{day_bounds, CandidatePost};

/// Keep candidates created on `day` (UTC) that mention `keyword` in their
/// title or body, ordered by upvotes descending and truncated to
/// `per_day_cap`.
///
/// The sort is stable, so equal upvote counts keep arrival order.
#[must_use]
pub fn select_for_day(
    candidates: Vec<CandidatePost>,
    keyword: &str,
    day: NaiveDate,
    per_day_cap: usize,
) -> Vec<CandidatePost> {
    let (start, end) = day_bounds(day);

    let mut matched: Vec<CandidatePost> = candidates
        .into_iter()
        .filter(|p| p.created_at >= start && p.created_at < end)
        .filter(|p| p.mentions(keyword))
        .collect();

    matched.sort_by(|a, b| b.upvote_count.cmp(&a.upvote_count));
    matched.truncate(per_day_cap);
    matched
}
