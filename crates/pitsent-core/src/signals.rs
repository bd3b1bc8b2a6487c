use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How a signal value was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    /// No posts in the lookback window.
    FallbackNoData,
    /// Engagement × recency weighted mean.
    EngagementRecencyWeighted,
    /// Plain mean, used when every weight is zero.
    UnweightedMean,
    /// Posts were found but confidence fell below the configured minimum.
    InsufficientEvidence,
}

impl CalculationMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CalculationMethod::FallbackNoData => "fallback_no_data",
            CalculationMethod::EngagementRecencyWeighted => "engagement_recency_weighted",
            CalculationMethod::UnweightedMean => "unweighted_mean",
            CalculationMethod::InsufficientEvidence => "insufficient_evidence",
        }
    }
}

impl std::fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One point-in-time signal value for a (date, ticker) pair.
///
/// `value` is `None` when there is no opinion to report; `Some(0.0)` is a
/// neutral opinion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSignal {
    pub as_of_date: NaiveDate,
    pub ticker: String,
    pub signal_name: String,
    pub value: Option<f64>,
    pub confidence: f64,
    pub posts_analyzed: u32,
    pub calculation_method: CalculationMethod,
    pub search_terms: String,
}
