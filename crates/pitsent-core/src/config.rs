use crate::app_config::{AppConfig, Environment, RedditConfig};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Load Reddit API credentials from the process environment.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnvVar`] naming the first missing variable.
pub fn load_reddit_config() -> Result<RedditConfig, ConfigError> {
    build_reddit_config(|key| std::env::var(key))
}

fn build_reddit_config<F>(lookup: F) -> Result<RedditConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    Ok(RedditConfig {
        client_id: require("REDDIT_CLIENT_ID")?,
        client_secret: require("REDDIT_CLIENT_SECRET")?,
        user_agent: require("REDDIT_USER_AGENT")?,
    })
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("PITSENT_ENV", "development"))?;
    let log_level = or_default("PITSENT_LOG_LEVEL", "info");
    let keywords_path = PathBuf::from(or_default(
        "PITSENT_KEYWORDS_PATH",
        "./config/keywords.yaml",
    ));

    let db_max_connections: u32 = parse_as(
        "PITSENT_DB_MAX_CONNECTIONS",
        &or_default("PITSENT_DB_MAX_CONNECTIONS", "5"),
    )?;
    let db_min_connections: u32 = parse_as(
        "PITSENT_DB_MIN_CONNECTIONS",
        &or_default("PITSENT_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs: u64 = parse_as(
        "PITSENT_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("PITSENT_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let per_day_cap: usize = parse_as(
        "PITSENT_PER_DAY_CAP",
        &or_default("PITSENT_PER_DAY_CAP", "200"),
    )?;
    if per_day_cap == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PITSENT_PER_DAY_CAP".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let search_limit: usize = parse_as(
        "PITSENT_SEARCH_LIMIT",
        &or_default("PITSENT_SEARCH_LIMIT", "100"),
    )?;
    let request_timeout_secs: u64 = parse_as(
        "PITSENT_REQUEST_TIMEOUT_SECS",
        &or_default("PITSENT_REQUEST_TIMEOUT_SECS", "30"),
    )?;
    let inter_request_delay_ms: u64 = parse_as(
        "PITSENT_INTER_REQUEST_DELAY_MS",
        &or_default("PITSENT_INTER_REQUEST_DELAY_MS", "300"),
    )?;
    let transient_backoff_secs: u64 = parse_as(
        "PITSENT_TRANSIENT_BACKOFF_SECS",
        &or_default("PITSENT_TRANSIENT_BACKOFF_SECS", "5"),
    )?;
    let default_rate_limit_wait_secs: u64 = parse_as(
        "PITSENT_DEFAULT_RATE_LIMIT_WAIT_SECS",
        &or_default("PITSENT_DEFAULT_RATE_LIMIT_WAIT_SECS", "60"),
    )?;

    let lookback_days: u32 = parse_as(
        "PITSENT_LOOKBACK_DAYS",
        &or_default("PITSENT_LOOKBACK_DAYS", "30"),
    )?;
    let evidence_floor: u32 = parse_as(
        "PITSENT_EVIDENCE_FLOOR",
        &or_default("PITSENT_EVIDENCE_FLOOR", "50"),
    )?;
    if evidence_floor == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PITSENT_EVIDENCE_FLOOR".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let min_confidence: f64 = parse_as(
        "PITSENT_MIN_CONFIDENCE",
        &or_default("PITSENT_MIN_CONFIDENCE", "0.0"),
    )?;
    if !(0.0..=1.0).contains(&min_confidence) {
        return Err(ConfigError::InvalidEnvVar {
            var: "PITSENT_MIN_CONFIDENCE".to_string(),
            reason: format!("{min_confidence} is outside [0, 1]"),
        });
    }
    let signal_name = or_default("PITSENT_SIGNAL_NAME", "SENTIMENT_RDDT");

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        keywords_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        per_day_cap,
        search_limit,
        request_timeout_secs,
        inter_request_delay_ms,
        transient_backoff_secs,
        default_rate_limit_wait_secs,
        lookback_days,
        evidence_floor,
        min_confidence,
        signal_name,
    })
}

fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PITSENT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
