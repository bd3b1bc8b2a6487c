//! Shared configuration and domain types for the point-in-time sentiment pipeline.

pub mod app_config;
pub mod config;
pub mod dates;
pub mod keywords;
pub mod ledger;
pub mod posts;
pub mod signals;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, RedditConfig};
pub use config::{load_app_config, load_app_config_from_env, load_reddit_config};
pub use dates::{date_range_inclusive, day_bounds, days_inclusive, yesterday_utc};
pub use keywords::{load_keywords, KeywordEntry, KeywordRegistry, KeywordsFile, RegistryError};
pub use ledger::{LedgerStatus, ProcessingLedgerEntry};
pub use posts::CandidatePost;
pub use signals::{CalculationMethod, SentimentSignal};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read keywords file {path}: {source}")]
    KeywordsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse keywords file: {0}")]
    KeywordsFileParse(#[from] serde_yaml::Error),

    #[error("keywords validation failed: {0}")]
    Validation(String),
}
