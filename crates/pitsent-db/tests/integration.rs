//! Offline tests for pitsent-db pool configuration and row conversions.
//! These tests do not require a live database connection.

use chrono::{NaiveDate, TimeZone, Utc};
use pitsent_core::{AppConfig, Environment, KeywordEntry, LedgerStatus};
use pitsent_db::{CompanyKeywordRow, DbError, PoolConfig, ProcessingLogRow, RedditPostRow, RunType};
use std::path::PathBuf;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        keywords_path: PathBuf::from("./config/keywords.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        per_day_cap: 200,
        search_limit: 100,
        request_timeout_secs: 30,
        inter_request_delay_ms: 300,
        transient_backoff_secs: 5,
        default_rate_limit_wait_secs: 60,
        lookback_days: 30,
        evidence_floor: 50,
        min_confidence: 0.0,
        signal_name: "SENTIMENT_RDDT".to_string(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

fn log_row(status: &str) -> ProcessingLogRow {
    ProcessingLogRow {
        id: 1,
        ticker: "EA".to_string(),
        processed_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        posts_found: 12,
        posts_inserted: 10,
        processing_started_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).unwrap(),
        processing_completed_at: None,
        status: status.to_string(),
        error_message: None,
    }
}

#[test]
fn processing_log_row_converts_to_entry() {
    let entry = log_row("completed").into_entry().unwrap();
    assert_eq!(entry.status, LedgerStatus::Completed);
    assert_eq!(entry.posts_found, 12);
    assert_eq!(entry.posts_inserted, 10);
    assert_eq!(entry.ticker, "EA");
}

#[test]
fn processing_log_row_rejects_unknown_status() {
    let err = log_row("done").into_entry().unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidColumnValue { column: "status", .. }
    ));
}

#[test]
fn reddit_post_row_maps_columns_to_candidate() {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let row = RedditPostRow {
        id: 9,
        reddit_id: "abc123".to_string(),
        title: "Battlefield is back".to_string(),
        content: "body".to_string(),
        author: Some("someone".to_string()),
        subreddit: "gaming".to_string(),
        created_datetime: created,
        upvotes: 5,
        num_comments: 2,
        url: "https://reddit.com/r/gaming/abc123".to_string(),
        ticker: "EA".to_string(),
        keyword_matched: "Battlefield".to_string(),
        collected_at: created,
    };

    let post = row.into_candidate();
    assert_eq!(post.natural_id, "abc123");
    assert_eq!(post.body, "body");
    assert_eq!(post.forum, "gaming");
    assert_eq!(post.upvote_count, 5);
    assert_eq!(post.comment_count, 2);
    assert_eq!(post.matched_keyword, "Battlefield");
    assert_eq!(post.owning_ticker, "EA");
}

#[test]
fn company_keyword_row_converts_to_entry() {
    let row = CompanyKeywordRow {
        id: 3,
        ticker: "RBLX".to_string(),
        keyword: "Robux".to_string(),
        priority: 2,
        company_uid: Some("uid-1".to_string()),
        created_at: Utc::now(),
    };
    let entry = KeywordEntry::from(row);
    assert_eq!(entry.keyword, "Robux");
    assert_eq!(entry.priority, 2);
    assert_eq!(entry.company_uid.as_deref(), Some("uid-1"));
}

#[test]
fn run_type_strings() {
    assert_eq!(RunType::Collect.as_str(), "collect");
    assert_eq!(RunType::Signals.as_str(), "signals");
}
