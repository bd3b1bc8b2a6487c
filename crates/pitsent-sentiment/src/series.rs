//! Daily signal series with full (date, ticker) coverage.

use std::collections::HashSet;

use chrono::NaiveDate;
use pitsent_core::{date_range_inclusive, days_inclusive, KeywordRegistry, SentimentSignal};

use crate::aggregator::SentimentAggregator;
use crate::error::SentimentError;

pub struct SignalSeriesBuilder<'a> {
    aggregator: &'a SentimentAggregator<'a>,
    registry: &'a KeywordRegistry,
}

impl<'a> SignalSeriesBuilder<'a> {
    #[must_use]
    pub fn new(aggregator: &'a SentimentAggregator<'a>, registry: &'a KeywordRegistry) -> Self {
        Self {
            aggregator,
            registry,
        }
    }

    /// One signal per (date, ticker) over `[start, end]`, date-major and in
    /// ticker input order. Duplicate tickers are collapsed.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::InvalidDateRange`] when `start > end`,
    /// [`SentimentError::CoverageInvariant`] when the row count does not equal
    /// tickers × days, or any aggregation error.
    pub async fn build(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
        lookback_days: u32,
    ) -> Result<Vec<SentimentSignal>, SentimentError> {
        if start > end {
            return Err(SentimentError::InvalidDateRange { start, end });
        }

        let mut unique = HashSet::new();
        let tickers: Vec<&str> = tickers
            .iter()
            .map(String::as_str)
            .filter(|t| unique.insert(*t))
            .collect();
        let terms: Vec<String> = tickers.iter().map(|t| self.search_terms(t)).collect();

        let mut signals = Vec::with_capacity(tickers.len() * days_inclusive(start, end));
        for as_of in date_range_inclusive(start, end) {
            for (ticker, terms) in tickers.iter().zip(&terms) {
                let signal = self
                    .aggregator
                    .aggregate(ticker, as_of, lookback_days, terms)
                    .await?;
                signals.push(signal);
            }
        }

        ensure_coverage(&signals, tickers.len() * days_inclusive(start, end))?;

        tracing::info!(
            tickers = tickers.len(),
            %start,
            %end,
            rows = signals.len(),
            "built signal series"
        );

        Ok(signals)
    }

    /// Lowercased ticker followed by its keywords, comma separated.
    fn search_terms(&self, ticker: &str) -> String {
        let mut seen = HashSet::new();
        let mut terms = vec![ticker.to_lowercase()];
        seen.insert(ticker.to_lowercase());
        if let Ok(entries) = self.registry.keywords_for(ticker) {
            for entry in entries {
                let term = entry.keyword.to_lowercase();
                if seen.insert(term.clone()) {
                    terms.push(term);
                }
            }
        }
        terms.join(", ")
    }
}

fn ensure_coverage(signals: &[SentimentSignal], expected: usize) -> Result<(), SentimentError> {
    let distinct: HashSet<(NaiveDate, &str)> = signals
        .iter()
        .map(|s| (s.as_of_date, s.ticker.as_str()))
        .collect();
    if signals.len() != expected || distinct.len() != expected {
        return Err(SentimentError::CoverageInvariant {
            expected,
            actual: distinct.len().min(signals.len()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::aggregator::AggregatorSettings;
    use crate::cancel::CancelToken;
    use crate::collector::DayCollector;
    use crate::fetcher::{FetchSettings, PostFetcher};
    use crate::store::MemoryStore;
    use crate::testing::{at, raw_post, ScriptedSource};
    use crate::types::SortOrder;
    use pitsent_core::{CalculationMethod, KeywordEntry};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn registry() -> KeywordRegistry {
        KeywordRegistry::new(vec![
            KeywordEntry {
                ticker: "EA".to_string(),
                keyword: "EA".to_string(),
                priority: 1,
                company_uid: None,
            },
            KeywordEntry {
                ticker: "EA".to_string(),
                keyword: "Electronic Arts".to_string(),
                priority: 2,
                company_uid: None,
            },
        ])
        .unwrap()
    }

    fn settings() -> AggregatorSettings {
        AggregatorSettings {
            evidence_floor: 50,
            min_confidence: 0.0,
            signal_name: "SENTIMENT_RDDT".to_string(),
        }
    }

    fn fixed(_: &str) -> f64 {
        0.8
    }

    #[tokio::test]
    async fn collect_then_build_three_day_series() {
        let source = ScriptedSource::new();
        let mut post = raw_post("ea1", "EA roadmap", at(2024, 1, 1, 15), 5);
        post.num_comments = 2;
        source.push_posts("EA", SortOrder::Top, vec![post]);

        let store = MemoryStore::new();
        let cancel = CancelToken::new();
        let fetch_settings = FetchSettings {
            per_day_cap: 200,
            search_limit: 100,
            inter_request_delay: Duration::ZERO,
            transient_backoff: Duration::ZERO,
            default_rate_limit_wait: Duration::ZERO,
        };
        let fetcher = PostFetcher::new(&source, fetch_settings, cancel.clone());
        let collector = DayCollector::new(fetcher, &store, &store, cancel);
        let tickers = vec!["EA".to_string()];
        let days = date_range_inclusive(date(1), date(3));
        collector
            .collect_range(&registry(), &tickers, &days, at(2024, 2, 1, 0))
            .await
            .unwrap();
        assert_eq!(store.post_count(), 1);

        let registry = registry();
        let aggregator = SentimentAggregator::new(&store, &fixed, settings());
        let builder = SignalSeriesBuilder::new(&aggregator, &registry);
        let signals = builder.build(&tickers, date(1), date(3), 1).await.unwrap();

        assert_eq!(signals.len(), 3);
        let dates: Vec<_> = signals.iter().map(|s| s.as_of_date).collect();
        assert_eq!(dates, vec![date(1), date(2), date(3)]);

        let first = &signals[0];
        assert_eq!(first.posts_analyzed, 1);
        assert!((first.confidence - 0.02).abs() < 1e-12);
        assert!((first.value.unwrap() - 0.8).abs() < 1e-12);
        assert_eq!(first.search_terms, "ea, electronic arts");

        let last = &signals[2];
        assert_eq!(last.posts_analyzed, 0);
        assert!(last.confidence.abs() < f64::EPSILON);
        assert_eq!(last.calculation_method, CalculationMethod::FallbackNoData);
    }

    #[tokio::test]
    async fn every_pair_is_covered_date_major() {
        let store = MemoryStore::new();
        let registry = registry();
        let aggregator = SentimentAggregator::new(&store, &fixed, settings());
        let builder = SignalSeriesBuilder::new(&aggregator, &registry);
        let tickers = vec!["RBLX".to_string(), "EA".to_string(), "RBLX".to_string()];

        let signals = builder.build(&tickers, date(1), date(4), 30).await.unwrap();

        assert_eq!(signals.len(), 8);
        assert_eq!(signals[0].ticker, "RBLX");
        assert_eq!(signals[1].ticker, "EA");
        assert_eq!(signals[1].as_of_date, date(1));
        assert_eq!(signals[2].as_of_date, date(2));
        assert_eq!(signals[0].search_terms, "rblx");
    }

    #[tokio::test]
    async fn reversed_range_is_rejected() {
        let store = MemoryStore::new();
        let registry = registry();
        let aggregator = SentimentAggregator::new(&store, &fixed, settings());
        let builder = SignalSeriesBuilder::new(&aggregator, &registry);

        let result = builder
            .build(&["EA".to_string()], date(3), date(1), 30)
            .await;

        assert!(matches!(result, Err(SentimentError::InvalidDateRange { .. })));
    }

    #[test]
    fn duplicate_rows_break_coverage() {
        let row = SentimentSignal {
            as_of_date: date(1),
            ticker: "EA".to_string(),
            signal_name: "SENTIMENT_RDDT".to_string(),
            value: None,
            confidence: 0.0,
            posts_analyzed: 0,
            calculation_method: CalculationMethod::FallbackNoData,
            search_terms: "ea".to_string(),
        };
        let err = ensure_coverage(&[row.clone(), row], 2).unwrap_err();
        assert!(matches!(
            err,
            SentimentError::CoverageInvariant {
                expected: 2,
                actual: 1
            }
        ));
    }
}
