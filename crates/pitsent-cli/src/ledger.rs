//! `ledger status`: recent processing-ledger rows.

use chrono::{Duration, Utc};
use clap::Subcommand;
use pitsent_core::{AppConfig, LedgerStatus};

/// `in_progress` rows older than this are reported as likely abandoned.
const STALE_AFTER_HOURS: i64 = 6;

#[derive(Debug, Subcommand)]
pub enum LedgerCommands {
    /// List the most recently started ledger rows
    Status {
        /// Filter to one ticker
        #[arg(long)]
        ticker: Option<String>,

        /// Filter by status (in_progress, completed, failed, skipped)
        #[arg(long, value_parser = parse_status)]
        status: Option<LedgerStatus>,

        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

fn parse_status(raw: &str) -> Result<LedgerStatus, String> {
    raw.parse()
}

pub(crate) async fn run(config: &AppConfig, command: LedgerCommands) -> anyhow::Result<()> {
    let LedgerCommands::Status {
        ticker,
        status,
        limit,
    } = command;

    let pool = crate::connect(config).await?;
    let ticker = ticker.map(|t| t.trim().to_uppercase());
    let rows = pitsent_db::list_processing_log(&pool, ticker.as_deref(), status, limit).await?;

    if rows.is_empty() {
        println!("no ledger rows");
        return Ok(());
    }

    let stale_before = Utc::now() - Duration::hours(STALE_AFTER_HOURS);
    println!(
        "{:<8} {:<10} {:<12} {:>6} {:>8}  {:<20} error",
        "ticker", "date", "status", "found", "inserted", "started"
    );
    for row in rows {
        let entry = row.into_entry()?;
        let stale = entry.status == LedgerStatus::InProgress && entry.started_at < stale_before;
        println!(
            "{:<8} {:<10} {:<12} {:>6} {:>8}  {:<20} {}{}",
            entry.ticker,
            entry.processed_date.to_string(),
            entry.status.as_str(),
            entry.posts_found,
            entry.posts_inserted,
            entry.started_at.format("%Y-%m-%d %H:%M:%S"),
            if stale { "(stale) " } else { "" },
            entry.error_message.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
