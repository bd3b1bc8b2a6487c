//! `collect`: fetch, rank and store posts for each (ticker, day).
//!
//! Completed days are skipped via the processing ledger, so re-running a
//! range only fetches what is missing. Ctrl-C cancels the run and leaves the
//! in-flight unit `in_progress` for the next run.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use pitsent_core::{date_range_inclusive, yesterday_utc, AppConfig, KeywordRegistry};
use pitsent_db::RunType;
use pitsent_sentiment::{
    CancelToken, CollectSummary, DayCollector, FetchSettings, Ledger, MemoryStore, PgStore,
    PostFetcher, PostStore, RedditSearchClient, SentimentError,
};

use crate::fail_run_best_effort;
use crate::keywords::{load_registry, resolve_tickers, KeywordSource};

#[derive(Debug, Args)]
pub struct CollectArgs {
    /// Single UTC day to collect (YYYY-MM-DD); defaults to yesterday
    #[arg(long, conflicts_with_all = ["start_date", "end_date"])]
    pub date: Option<NaiveDate>,

    /// First day of an inclusive range
    #[arg(long, requires = "end_date")]
    pub start_date: Option<NaiveDate>,

    /// Last day of an inclusive range
    #[arg(long, requires = "start_date")]
    pub end_date: Option<NaiveDate>,

    /// Restrict to these tickers (default: every ticker in the registry)
    #[arg(long, num_args = 1..)]
    pub tickers: Vec<String>,

    /// Override PITSENT_PER_DAY_CAP
    #[arg(long)]
    pub per_day_cap: Option<usize>,

    /// Fetch and rank without writing to the database
    #[arg(long)]
    pub dry_run: bool,

    /// Override the keywords YAML path
    #[arg(long)]
    pub keywords_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = KeywordSource::Yaml)]
    pub keywords_source: KeywordSource,
}

/// Days selected by `--date`, `--start-date/--end-date`, or yesterday.
pub(crate) fn resolve_days(
    date: Option<NaiveDate>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<NaiveDate>> {
    match (date, start, end) {
        (Some(day), _, _) => Ok(vec![day]),
        (None, Some(start), Some(end)) => {
            if start > end {
                anyhow::bail!("--start-date {start} is after --end-date {end}");
            }
            Ok(date_range_inclusive(start, end))
        }
        (None, None, None) => Ok(vec![yesterday_utc(now)]),
        _ => anyhow::bail!("--start-date and --end-date must be given together"),
    }
}

pub(crate) async fn run(config: &AppConfig, args: CollectArgs) -> anyhow::Result<()> {
    let now = Utc::now();
    let days = resolve_days(args.date, args.start_date, args.end_date, now)?;

    let mut settings = FetchSettings::from_app_config(config);
    if let Some(cap) = args.per_day_cap {
        if cap == 0 {
            anyhow::bail!("--per-day-cap must be at least 1");
        }
        settings.per_day_cap = cap;
    }

    let reddit = pitsent_core::load_reddit_config()?;
    let source = RedditSearchClient::new(&reddit, config.request_timeout_secs)?;
    let cancel = CancelToken::new();
    spawn_interrupt_handler(cancel.clone());

    if args.dry_run {
        let registry = load_registry(
            config,
            args.keywords_source,
            args.keywords_file.as_deref(),
            None,
        )
        .await?;
        let tickers = resolve_tickers(&registry, &args.tickers);
        println!(
            "dry-run: collecting {} ticker(s) over {} day(s) without writing to the database",
            tickers.len(),
            days.len()
        );

        let store = MemoryStore::new();
        let fetcher = PostFetcher::new(&source, settings, cancel.clone());
        let summary = run_range(
            fetcher, &store, &store, cancel, &registry, &tickers, &days, now,
        )
        .await?;
        print_summary(&summary);
        return Ok(());
    }

    let pool = crate::connect(config).await?;
    let registry = load_registry(
        config,
        args.keywords_source,
        args.keywords_file.as_deref(),
        Some(&pool),
    )
    .await?;
    let tickers = resolve_tickers(&registry, &args.tickers);

    let run = pitsent_db::create_collection_run(&pool, RunType::Collect, "cli").await?;
    if let Err(e) = pitsent_db::start_collection_run(&pool, run.id).await {
        fail_run_best_effort(&pool, run.id, "collect", format!("{e:#}")).await;
        return Err(e.into());
    }

    tracing::info!(
        run_id = run.id,
        tickers = tickers.len(),
        days = days.len(),
        per_day_cap = settings.per_day_cap,
        "starting collection"
    );

    let store = PgStore::new(pool.clone());
    let fetcher = PostFetcher::new(&source, settings, cancel.clone());
    let result = run_range(
        fetcher, &store, &store, cancel, &registry, &tickers, &days, now,
    )
    .await;

    match result {
        Ok(summary) => {
            print_summary(&summary);
            if summary.has_failures() {
                let message = format!("{} unit(s) failed", summary.failed);
                fail_run_best_effort(&pool, run.id, "collect", message.clone()).await;
                anyhow::bail!(message);
            }
            let records = i32::try_from(summary.posts_inserted).unwrap_or(i32::MAX);
            pitsent_db::complete_collection_run(&pool, run.id, records).await?;
            Ok(())
        }
        Err(e) => {
            fail_run_best_effort(&pool, run.id, "collect", format!("{e:#}")).await;
            Err(e.into())
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_range(
    fetcher: PostFetcher<'_>,
    store: &dyn PostStore,
    ledger: &dyn Ledger,
    cancel: CancelToken,
    registry: &KeywordRegistry,
    tickers: &[String],
    days: &[NaiveDate],
    now: DateTime<Utc>,
) -> Result<CollectSummary, SentimentError> {
    let collector = DayCollector::new(fetcher, store, ledger, cancel);
    collector.collect_range(registry, tickers, days, now).await
}

fn spawn_interrupt_handler(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            cancel.cancel();
        }
    });
}

fn print_summary(summary: &CollectSummary) {
    println!(
        "completed: {}  already processed: {}  not closed: {}  failed: {}",
        summary.completed, summary.already_processed, summary.not_closed, summary.failed
    );
    println!(
        "posts found: {}  posts inserted: {}",
        summary.posts_found, summary.posts_inserted
    );
    for failure in &summary.failures {
        println!("  FAILED {} {}: {}", failure.ticker, failure.day, failure.error);
    }
}
