//! Keyword registry loading shared by every command, plus `keywords list`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Subcommand, ValueEnum};
use pitsent_core::{AppConfig, KeywordEntry, KeywordRegistry};

/// Where the ticker → keyword registry comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum KeywordSource {
    /// Static YAML file (`PITSENT_KEYWORDS_PATH` or `--keywords-file`)
    #[default]
    Yaml,
    /// The `company_keywords` table
    Db,
}

#[derive(Debug, Subcommand)]
pub enum KeywordsCommands {
    /// Print every ticker's keywords in priority order
    List {
        #[arg(long, value_enum, default_value_t = KeywordSource::Yaml)]
        source: KeywordSource,

        /// Override the keywords YAML path
        #[arg(long)]
        keywords_file: Option<PathBuf>,
    },
}

pub(crate) async fn run(config: &AppConfig, command: KeywordsCommands) -> anyhow::Result<()> {
    match command {
        KeywordsCommands::List {
            source,
            keywords_file,
        } => {
            let registry = load_registry(config, source, keywords_file.as_deref(), None).await?;
            for ticker in registry.tickers() {
                let entries = registry.keywords_for(ticker)?;
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|e| format!("{} (p{})", e.keyword, e.priority))
                    .collect();
                println!("{ticker:<8} {}", rendered.join(", "));
            }
            Ok(())
        }
    }
}

/// Build the registry from the chosen source.
///
/// With `Db`, `pool` is reused when given; otherwise a connection is opened.
pub(crate) async fn load_registry(
    config: &AppConfig,
    source: KeywordSource,
    keywords_file: Option<&Path>,
    pool: Option<&sqlx::PgPool>,
) -> anyhow::Result<KeywordRegistry> {
    let registry = match source {
        KeywordSource::Yaml => {
            let path = keywords_file.unwrap_or(config.keywords_path.as_path());
            let file = pitsent_core::load_keywords(path)
                .with_context(|| format!("loading keywords from {}", path.display()))?;
            file.registry()?
        }
        KeywordSource::Db => {
            let rows = match pool {
                Some(pool) => pitsent_db::list_company_keywords(pool, None).await?,
                None => {
                    let pool = crate::connect(config).await?;
                    pitsent_db::list_company_keywords(&pool, None).await?
                }
            };
            let entries: Vec<KeywordEntry> = rows.into_iter().map(KeywordEntry::from).collect();
            KeywordRegistry::new(entries)?
        }
    };

    if registry.is_empty() {
        anyhow::bail!("keyword registry is empty");
    }
    tracing::debug!(
        source = ?source,
        tickers = registry.tickers().len(),
        "loaded keyword registry"
    );
    Ok(registry)
}

/// `requested` when non-empty, otherwise every ticker in the registry.
pub(crate) fn resolve_tickers(registry: &KeywordRegistry, requested: &[String]) -> Vec<String> {
    let requested = crate::normalize_tickers(requested);
    if requested.is_empty() {
        registry.tickers().to_vec()
    } else {
        requested
    }
}
