//! Point-in-time Reddit sentiment pipeline.
//!
//! Collection side: keywords are searched per UTC day, ranked and capped per
//! ticker, then stored behind a processing ledger so completed days are never
//! fetched twice. Signal side: stored posts in a trailing lookback window are
//! scored and folded into one confidence-weighted value per (ticker, date).

pub mod aggregator;
pub mod cancel;
pub mod collector;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod scorer;
pub mod selector;
pub mod series;
pub mod sources;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

pub use aggregator::{AggregatorSettings, SentimentAggregator};
pub use cancel::CancelToken;
pub use collector::{CollectSummary, DayCollector, UnitFailure, UnitOutcome};
pub use error::{SearchError, SentimentError, StoreError};
pub use export::{export_signals_csv, write_signals_csv};
pub use fetcher::{FetchSettings, PostFetcher};
pub use scorer::{lexicon_score, LexiconScorer, SentimentScorer};
pub use selector::select_for_day;
pub use series::SignalSeriesBuilder;
pub use sources::{RedditSearchClient, SearchSource};
pub use store::{Ledger, MemoryStore, PgStore, PostStore};
pub use types::{RawPost, SearchPage, SearchQuery, SortOrder, TimeFilter};
