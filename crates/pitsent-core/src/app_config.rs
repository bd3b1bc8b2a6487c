use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide settings, built once in `main` and passed into every component.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub keywords_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub per_day_cap: usize,
    pub search_limit: usize,
    pub request_timeout_secs: u64,
    pub inter_request_delay_ms: u64,
    pub transient_backoff_secs: u64,
    pub default_rate_limit_wait_secs: u64,
    pub lookback_days: u32,
    pub evidence_floor: u32,
    pub min_confidence: f64,
    pub signal_name: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("keywords_path", &self.keywords_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("per_day_cap", &self.per_day_cap)
            .field("search_limit", &self.search_limit)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("inter_request_delay_ms", &self.inter_request_delay_ms)
            .field("transient_backoff_secs", &self.transient_backoff_secs)
            .field(
                "default_rate_limit_wait_secs",
                &self.default_rate_limit_wait_secs,
            )
            .field("lookback_days", &self.lookback_days)
            .field("evidence_floor", &self.evidence_floor)
            .field("min_confidence", &self.min_confidence)
            .field("signal_name", &self.signal_name)
            .finish()
    }
}

/// Credentials for the Reddit search API (client-credentials OAuth).
///
/// Only the `collect` command needs these, so they are loaded separately from
/// [`AppConfig`].
#[derive(Clone)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl std::fmt::Debug for RedditConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
