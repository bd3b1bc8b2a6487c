//! Point-in-time aggregation of stored posts into one signal value.
//!
//! The window for `as_of` is `[as_of - lookback_days, as_of]` in whole UTC
//! days, and post age is measured from `as_of`, never from the wall clock.
//! Nothing created after `as_of` can reach the signal.

use chrono::{Days, NaiveDate};
use pitsent_core::{day_bounds, AppConfig, CalculationMethod, CandidatePost, SentimentSignal};

use crate::error::SentimentError;
use crate::scorer::SentimentScorer;
use crate::store::PostStore;

#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Post count at which confidence reaches 1.0.
    pub evidence_floor: u32,
    /// Below this confidence the value is withheld.
    pub min_confidence: f64,
    pub signal_name: String,
}

impl AggregatorSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            evidence_floor: config.evidence_floor,
            min_confidence: config.min_confidence,
            signal_name: config.signal_name.clone(),
        }
    }
}

pub struct SentimentAggregator<'a> {
    store: &'a dyn PostStore,
    scorer: &'a dyn SentimentScorer,
    settings: AggregatorSettings,
}

impl<'a> SentimentAggregator<'a> {
    #[must_use]
    pub fn new(
        store: &'a dyn PostStore,
        scorer: &'a dyn SentimentScorer,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            store,
            scorer,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Compute the signal for `ticker` as of the end of `as_of`.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::DataIntegrity`] if the store query fails.
    pub async fn aggregate(
        &self,
        ticker: &str,
        as_of: NaiveDate,
        lookback_days: u32,
        search_terms: &str,
    ) -> Result<SentimentSignal, SentimentError> {
        let window_start = as_of
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        let (from, _) = day_bounds(window_start);
        let (_, until) = day_bounds(as_of);

        let posts = self.store.posts_in_window(ticker, from, until).await?;
        let signal = self.fold(ticker, as_of, &posts, search_terms);

        tracing::debug!(
            ticker,
            %as_of,
            posts = signal.posts_analyzed,
            confidence = signal.confidence,
            method = %signal.calculation_method,
            "aggregated signal"
        );

        Ok(signal)
    }

    #[allow(clippy::cast_precision_loss)]
    fn fold(
        &self,
        ticker: &str,
        as_of: NaiveDate,
        posts: &[CandidatePost],
        search_terms: &str,
    ) -> SentimentSignal {
        let n = posts.len();
        let mut signal = SentimentSignal {
            as_of_date: as_of,
            ticker: ticker.to_string(),
            signal_name: self.settings.signal_name.clone(),
            value: None,
            confidence: 0.0,
            posts_analyzed: u32::try_from(n).unwrap_or(u32::MAX),
            calculation_method: CalculationMethod::FallbackNoData,
            search_terms: search_terms.to_string(),
        };
        if n == 0 {
            return signal;
        }

        let mut weighted_sum = 0.0_f64;
        let mut total_weight = 0.0_f64;
        let mut plain_sum = 0.0_f64;
        for post in posts {
            let score = clamp_score(self.scorer.score(&post.text()));
            let weight = post_weight(post, as_of);
            weighted_sum += score * weight;
            total_weight += weight;
            plain_sum += score;
        }

        let (value, method) = if total_weight > 0.0 {
            (
                weighted_sum / total_weight,
                CalculationMethod::EngagementRecencyWeighted,
            )
        } else {
            (plain_sum / n as f64, CalculationMethod::UnweightedMean)
        };

        signal.confidence = confidence(n, self.settings.evidence_floor);
        if signal.confidence < self.settings.min_confidence {
            signal.calculation_method = CalculationMethod::InsufficientEvidence;
        } else {
            signal.value = Some(value);
            signal.calculation_method = method;
        }
        signal
    }
}

/// `min(n / floor, 1.0)`.
#[allow(clippy::cast_precision_loss)]
fn confidence(n: usize, evidence_floor: u32) -> f64 {
    if evidence_floor == 0 {
        return 1.0;
    }
    (n as f64 / f64::from(evidence_floor)).min(1.0)
}

/// `(max(upvotes, 0) + 2 × comments) × 1 / (1 + age_days)`.
#[allow(clippy::cast_precision_loss)]
fn post_weight(post: &CandidatePost, as_of: NaiveDate) -> f64 {
    let engagement = post.upvote_count.max(0) as f64 + 2.0 * post.comment_count.max(0) as f64;
    let age_days = (as_of - post.created_at.date_naive()).num_days().max(0);
    engagement / (1.0 + age_days as f64)
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{DateTime, TimeZone, Utc};

    fn settings() -> AggregatorSettings {
        AggregatorSettings {
            evidence_floor: 50,
            min_confidence: 0.0,
            signal_name: "SENTIMENT_RDDT".to_string(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn post(
        id: &str,
        title: &str,
        created_at: DateTime<Utc>,
        upvotes: i64,
        comments: i64,
    ) -> CandidatePost {
        CandidatePost {
            natural_id: id.to_string(),
            title: title.to_string(),
            body: String::new(),
            author: None,
            forum: "gaming".to_string(),
            created_at,
            upvote_count: upvotes,
            comment_count: comments,
            source_url: String::new(),
            matched_keyword: "EA".to_string(),
            owning_ticker: "EA".to_string(),
        }
    }

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    /// "up" scores +1.0, "down" scores -1.0, anything else 0.
    fn polar(text: &str) -> f64 {
        if text.contains("up") {
            1.0
        } else if text.contains("down") {
            -1.0
        } else {
            0.0
        }
    }

    #[tokio::test]
    async fn no_posts_falls_back_with_zero_confidence() {
        let store = MemoryStore::new();
        let aggregator = SentimentAggregator::new(&store, &polar, settings());

        let signal = aggregator
            .aggregate("EA", date(2024, 1, 5), 30, "ea")
            .await
            .unwrap();

        assert_eq!(signal.calculation_method, CalculationMethod::FallbackNoData);
        assert!(signal.confidence.abs() < f64::EPSILON);
        assert_eq!(signal.posts_analyzed, 0);
        assert_eq!(signal.value, None);
    }

    #[tokio::test]
    async fn higher_engagement_pulls_toward_its_sentiment() {
        let store = MemoryStore::new();
        store.seed_posts([
            post("a", "up", noon(2024, 1, 5), 100, 0),
            post("b", "down", noon(2024, 1, 5), 10, 0),
        ]);
        let aggregator = SentimentAggregator::new(&store, &polar, settings());

        let signal = aggregator
            .aggregate("EA", date(2024, 1, 5), 30, "ea")
            .await
            .unwrap();

        let value = signal.value.unwrap();
        let unweighted = 0.0;
        assert!(value > unweighted && value < 1.0, "got {value}");
        assert!(value > 0.5, "expected closer to A, got {value}");
        assert_eq!(
            signal.calculation_method,
            CalculationMethod::EngagementRecencyWeighted
        );
    }

    #[tokio::test]
    async fn posts_after_as_of_are_excluded() {
        let store = MemoryStore::new();
        store.seed_posts([
            post("past", "up", noon(2024, 1, 4), 1, 0),
            post("future", "down", Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap(), 1000, 0),
        ]);
        let aggregator = SentimentAggregator::new(&store, &polar, settings());

        let signal = aggregator
            .aggregate("EA", date(2024, 1, 5), 30, "ea")
            .await
            .unwrap();

        assert_eq!(signal.posts_analyzed, 1);
        assert!((signal.value.unwrap() - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn window_start_day_is_inclusive() {
        let store = MemoryStore::new();
        store.seed_posts([
            post("edge", "up", Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap(), 1, 0),
            post("old", "down", Utc.with_ymd_and_hms(2024, 1, 3, 23, 59, 59).unwrap(), 1, 0),
        ]);
        let aggregator = SentimentAggregator::new(&store, &polar, settings());

        let signal = aggregator
            .aggregate("EA", date(2024, 1, 5), 1, "ea")
            .await
            .unwrap();

        assert_eq!(signal.posts_analyzed, 1);
    }

    #[tokio::test]
    async fn zero_engagement_uses_unweighted_mean() {
        let store = MemoryStore::new();
        store.seed_posts([
            post("a", "up", noon(2024, 1, 5), 0, 0),
            post("b", "up", noon(2024, 1, 5), 0, 0),
            post("c", "down", noon(2024, 1, 5), -3, 0),
        ]);
        let aggregator = SentimentAggregator::new(&store, &polar, settings());

        let signal = aggregator
            .aggregate("EA", date(2024, 1, 5), 30, "ea")
            .await
            .unwrap();

        assert_eq!(signal.calculation_method, CalculationMethod::UnweightedMean);
        assert!((signal.value.unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn confidence_saturates_at_the_evidence_floor() {
        let store = MemoryStore::new();
        store.seed_posts((0..60).map(|i| post(&format!("p{i}"), "meh", noon(2024, 1, 5), 1, 0)));
        let aggregator = SentimentAggregator::new(&store, &polar, settings());

        let signal = aggregator
            .aggregate("EA", date(2024, 1, 5), 30, "ea")
            .await
            .unwrap();

        assert_eq!(signal.posts_analyzed, 60);
        assert!((signal.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(signal.value, Some(0.0));
    }

    #[tokio::test]
    async fn low_confidence_withholds_value() {
        let store = MemoryStore::new();
        store.seed_posts([post("a", "up", noon(2024, 1, 5), 5, 0)]);
        let mut settings = settings();
        settings.min_confidence = 0.1;
        let aggregator = SentimentAggregator::new(&store, &polar, settings);

        let signal = aggregator
            .aggregate("EA", date(2024, 1, 5), 30, "ea")
            .await
            .unwrap();

        assert_eq!(signal.value, None);
        assert!((signal.confidence - 0.02).abs() < 1e-12);
        assert_eq!(
            signal.calculation_method,
            CalculationMethod::InsufficientEvidence
        );
    }

    #[test]
    fn weight_decays_with_age_from_as_of() {
        let fresh = post("a", "", noon(2024, 1, 5), 5, 2);
        let older = post("b", "", noon(2024, 1, 2), 5, 2);
        assert!((post_weight(&fresh, date(2024, 1, 5)) - 9.0).abs() < 1e-12);
        assert!((post_weight(&older, date(2024, 1, 5)) - 9.0 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        assert!((clamp_score(3.0) - 1.0).abs() < f64::EPSILON);
        assert!(clamp_score(f64::NAN).abs() < f64::EPSILON);
    }
}
