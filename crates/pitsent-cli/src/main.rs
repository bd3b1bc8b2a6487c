mod collect;
mod db;
mod keywords;
mod ledger;
mod signals;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::collect::CollectArgs;
use crate::db::DbCommands;
use crate::keywords::KeywordsCommands;
use crate::ledger::LedgerCommands;
use crate::signals::SignalsCommands;

#[derive(Debug, Parser)]
#[command(name = "pitsent")]
#[command(about = "Point-in-time Reddit sentiment signals")]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Inspect the keyword registry
    Keywords {
        #[command(subcommand)]
        command: KeywordsCommands,
    },
    /// Collect posts for one or more UTC days
    Collect(CollectArgs),
    /// Build and export signal series
    Signals {
        #[command(subcommand)]
        command: SignalsCommands,
    },
    /// Inspect the processing ledger
    Ledger {
        #[command(subcommand)]
        command: LedgerCommands,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = pitsent_core::load_app_config()?;

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_level.clone()
    };
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Db { command }) => db::run(&config, command).await,
        Some(Commands::Keywords { command }) => keywords::run(&config, command).await,
        Some(Commands::Collect(args)) => collect::run(&config, args).await,
        Some(Commands::Signals { command }) => signals::run(&config, command).await,
        Some(Commands::Ledger { command }) => ledger::run(&config, command).await,
        None => {
            println!("pitsent: no command given (see --help)");
            Ok(())
        }
    }
}

/// Connect using the configured pool settings.
pub(crate) async fn connect(config: &pitsent_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = pitsent_db::PoolConfig::from_app_config(config);
    let pool = pitsent_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

/// Attempt to mark a collection run as failed, logging any secondary error.
pub(crate) async fn fail_run_best_effort(
    pool: &sqlx::PgPool,
    run_id: i64,
    context: &'static str,
    message: String,
) {
    if let Err(mark_err) = pitsent_db::fail_collection_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {context} run as failed"
        );
    }
}

/// Comma- or space-separated ticker list, uppercased and deduplicated.
pub(crate) fn normalize_tickers(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for ticker in raw
        .iter()
        .flat_map(|t| t.split(','))
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
    {
        if !out.contains(&ticker) {
            out.push(ticker);
        }
    }
    out
}
