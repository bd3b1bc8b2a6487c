//! `signals build`: aggregate stored posts into a daily series.

use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};
use pitsent_core::{yesterday_utc, AppConfig, SentimentSignal};
use pitsent_db::RunType;
use pitsent_sentiment::{
    export_signals_csv, write_signals_csv, AggregatorSettings, LexiconScorer, PgStore,
    SentimentAggregator, SignalSeriesBuilder,
};

use crate::fail_run_best_effort;
use crate::keywords::{load_registry, resolve_tickers, KeywordSource};

#[derive(Debug, Subcommand)]
pub enum SignalsCommands {
    /// Build one signal per (date, ticker) and export it
    Build(BuildArgs),
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// First as-of date (default: the end date)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last as-of date (default: yesterday, UTC)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Restrict to these tickers (default: every ticker in the registry)
    #[arg(long, num_args = 1..)]
    pub tickers: Vec<String>,

    /// Override PITSENT_LOOKBACK_DAYS
    #[arg(long)]
    pub lookback_days: Option<u32>,

    /// Write the series as CSV to this path
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Skip upserting into sentiment_signals
    #[arg(long)]
    pub no_persist: bool,

    /// Override the keywords YAML path
    #[arg(long)]
    pub keywords_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = KeywordSource::Yaml)]
    pub keywords_source: KeywordSource,
}

pub(crate) async fn run(config: &AppConfig, command: SignalsCommands) -> anyhow::Result<()> {
    match command {
        SignalsCommands::Build(args) => run_build(config, args).await,
    }
}

async fn run_build(config: &AppConfig, args: BuildArgs) -> anyhow::Result<()> {
    let end = args.end.unwrap_or_else(|| yesterday_utc(Utc::now()));
    let start = args.start.unwrap_or(end);
    if start > end {
        anyhow::bail!("--start {start} is after --end {end}");
    }
    let lookback_days = args.lookback_days.unwrap_or(config.lookback_days);

    let pool = crate::connect(config).await?;
    let registry = load_registry(
        config,
        args.keywords_source,
        args.keywords_file.as_deref(),
        Some(&pool),
    )
    .await?;
    let tickers = resolve_tickers(&registry, &args.tickers);

    let run = pitsent_db::create_collection_run(&pool, RunType::Signals, "cli").await?;
    if let Err(e) = pitsent_db::start_collection_run(&pool, run.id).await {
        fail_run_best_effort(&pool, run.id, "signals", format!("{e:#}")).await;
        return Err(e.into());
    }

    let store = PgStore::new(pool.clone());
    let scorer = LexiconScorer;
    let settings = AggregatorSettings::from_app_config(config);
    let evidence_floor = settings.evidence_floor;
    let aggregator = SentimentAggregator::new(&store, &scorer, settings);
    let builder = SignalSeriesBuilder::new(&aggregator, &registry);

    let signals = match builder.build(&tickers, start, end, lookback_days).await {
        Ok(signals) => signals,
        Err(e) => {
            fail_run_best_effort(&pool, run.id, "signals", format!("{e:#}")).await;
            return Err(e.into());
        }
    };

    if let Err(e) = write_outputs(&pool, &args, &signals, lookback_days, evidence_floor).await {
        fail_run_best_effort(&pool, run.id, "signals", format!("{e:#}")).await;
        return Err(e);
    }

    let records = i32::try_from(signals.len()).unwrap_or(i32::MAX);
    pitsent_db::complete_collection_run(&pool, run.id, records).await?;

    let with_value = signals.iter().filter(|s| s.value.is_some()).count();
    tracing::info!(
        run_id = run.id,
        rows = signals.len(),
        with_value,
        %start,
        %end,
        "signal series built"
    );
    Ok(())
}

async fn write_outputs(
    pool: &sqlx::PgPool,
    args: &BuildArgs,
    signals: &[SentimentSignal],
    lookback_days: u32,
    evidence_floor: u32,
) -> anyhow::Result<()> {
    match &args.output {
        Some(path) => {
            let rows = export_signals_csv(path, signals)?;
            println!("wrote {rows} row(s) to {}", path.display());
        }
        None if args.no_persist => {
            write_signals_csv(std::io::stdout().lock(), signals)?;
        }
        None => {}
    }

    if !args.no_persist {
        let metadata = serde_json::json!({
            "lookback_days": lookback_days,
            "evidence_floor": evidence_floor,
            "data_source": "reddit",
            "scorer": "lexicon",
        });
        let stored = pitsent_db::upsert_sentiment_signals(pool, signals, &metadata).await?;
        println!("stored {stored} signal row(s)");
    }

    Ok(())
}
