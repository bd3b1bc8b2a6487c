//! UTC calendar-day helpers shared by collection and aggregation.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Half-open UTC bounds `[start, start + 24h)` for a calendar day.
#[must_use]
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// Every calendar date in `[start, end]`, ascending. Empty when `start > end`.
#[must_use]
pub fn date_range_inclusive(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Number of calendar days in `[start, end]`, or 0 when `start > end`.
#[must_use]
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> usize {
    let span = (end - start).num_days();
    usize::try_from(span + 1).unwrap_or(0)
}

/// The UTC calendar date before `now`.
#[must_use]
pub fn yesterday_utc(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive() - Duration::days(1)
}
