//! `db` sub-commands: migrations, connectivity, keyword seeding.

use anyhow::Context;
use clap::Subcommand;
use pitsent_core::AppConfig;

#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
    /// Load the keywords YAML into the company_keywords table
    Seed,
}

pub(crate) async fn run(config: &AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = crate::connect(config).await?;

    match command {
        DbCommands::Migrate => {
            let applied = pitsent_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations complete");
            println!("applied {applied} migration(s)");
        }
        DbCommands::Ping => {
            pitsent_db::ping(&pool).await?;
            println!("database reachable");
        }
        DbCommands::Seed => {
            let file = pitsent_core::load_keywords(&config.keywords_path).with_context(|| {
                format!("loading keywords from {}", config.keywords_path.display())
            })?;
            let entries = file.entries();
            let count = pitsent_db::seed_company_keywords(&pool, &entries).await?;
            tracing::info!(
                companies = file.companies.len(),
                keywords = count,
                "seeded company keywords"
            );
            println!(
                "seeded {count} keyword(s) for {} companies",
                file.companies.len()
            );
        }
    }

    Ok(())
}
