use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ConfigError;

/// Priority assigned to keywords that do not declare one.
pub const DEFAULT_PRIORITY: i32 = 999;

/// One search keyword for a tracked ticker. Lower `priority` wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub ticker: String,
    pub keyword: String,
    pub priority: i32,
    pub company_uid: Option<String>,
}

impl KeywordEntry {
    /// The entry used when a ticker has no registered keywords: the ticker
    /// symbol itself.
    #[must_use]
    pub fn ticker_fallback(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            keyword: ticker.to_string(),
            priority: DEFAULT_PRIORITY,
            company_uid: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no keywords registered for ticker {0}")]
    NotFound(String),

    #[error("ticker {ticker} lists keyword '{keyword}' more than once")]
    DuplicateKeyword { ticker: String, keyword: String },

    #[error("ticker {0} has an empty keyword")]
    EmptyKeyword(String),
}

/// Immutable ticker → keywords map, built once per run.
///
/// Keywords for a ticker are kept sorted by priority ascending; entries with
/// equal priority keep the order they were registered in.
#[derive(Debug, Clone, Default)]
pub struct KeywordRegistry {
    by_ticker: HashMap<String, Vec<KeywordEntry>>,
    tickers: Vec<String>,
    ticker_fallback: bool,
}

impl KeywordRegistry {
    /// Build a registry from entries in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateKeyword`] when a ticker repeats a
    /// keyword (case-insensitive) and [`RegistryError::EmptyKeyword`] for blank
    /// keywords.
    pub fn new(entries: Vec<KeywordEntry>) -> Result<Self, RegistryError> {
        let mut by_ticker: HashMap<String, Vec<KeywordEntry>> = HashMap::new();
        let mut tickers = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for entry in entries {
            if entry.keyword.trim().is_empty() {
                return Err(RegistryError::EmptyKeyword(entry.ticker));
            }
            if !seen.insert((entry.ticker.clone(), entry.keyword.to_lowercase())) {
                return Err(RegistryError::DuplicateKeyword {
                    ticker: entry.ticker,
                    keyword: entry.keyword,
                });
            }
            if !by_ticker.contains_key(&entry.ticker) {
                tickers.push(entry.ticker.clone());
            }
            by_ticker.entry(entry.ticker.clone()).or_default().push(entry);
        }

        for list in by_ticker.values_mut() {
            list.sort_by_key(|e| e.priority);
        }

        Ok(Self {
            by_ticker,
            tickers,
            ticker_fallback: false,
        })
    }

    /// When enabled, unknown tickers resolve to the ticker symbol itself
    /// instead of [`RegistryError::NotFound`].
    #[must_use]
    pub fn with_ticker_fallback(mut self, enabled: bool) -> Self {
        self.ticker_fallback = enabled;
        self
    }

    /// Keywords for `ticker`, sorted by priority.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if the ticker is unknown and the
    /// ticker fallback is disabled.
    pub fn keywords_for(&self, ticker: &str) -> Result<Vec<KeywordEntry>, RegistryError> {
        match self.by_ticker.get(ticker) {
            Some(list) => Ok(list.clone()),
            None if self.ticker_fallback => Ok(vec![KeywordEntry::ticker_fallback(ticker)]),
            None => Err(RegistryError::NotFound(ticker.to_string())),
        }
    }

    /// Registered tickers in first-seen order.
    #[must_use]
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// All entries, grouped by ticker in registration order.
    #[must_use]
    pub fn entries(&self) -> Vec<KeywordEntry> {
        self.tickers
            .iter()
            .filter_map(|t| self.by_ticker.get(t))
            .flatten()
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordSpec {
    pub keyword: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyKeywords {
    pub ticker: String,
    pub name: Option<String>,
    pub company_uid: Option<String>,
    pub keywords: Vec<KeywordSpec>,
}

/// On-disk form of the static keyword registry (`config/keywords.yaml`).
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordsFile {
    pub companies: Vec<CompanyKeywords>,
}

impl KeywordsFile {
    /// Flatten into registry entries, preserving file order.
    #[must_use]
    pub fn entries(&self) -> Vec<KeywordEntry> {
        self.companies
            .iter()
            .flat_map(|c| {
                c.keywords.iter().map(|k| KeywordEntry {
                    ticker: c.ticker.clone(),
                    keyword: k.keyword.trim().to_string(),
                    priority: k.priority,
                    company_uid: c.company_uid.clone(),
                })
            })
            .collect()
    }

    /// Build a [`KeywordRegistry`] from this file.
    ///
    /// # Errors
    ///
    /// Propagates [`RegistryError`] from [`KeywordRegistry::new`].
    pub fn registry(&self) -> Result<KeywordRegistry, RegistryError> {
        KeywordRegistry::new(self.entries())
    }
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// Load and validate the keyword registry from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_keywords(path: &Path) -> Result<KeywordsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::KeywordsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: KeywordsFile =
        serde_yaml::from_str(&content).map_err(ConfigError::KeywordsFileParse)?;

    validate_keywords(&file)?;

    Ok(file)
}

fn validate_keywords(file: &KeywordsFile) -> Result<(), ConfigError> {
    let mut seen_tickers = HashSet::new();

    for company in &file.companies {
        let ticker = company.ticker.trim();
        if ticker.is_empty() {
            return Err(ConfigError::Validation(
                "ticker must be non-empty".to_string(),
            ));
        }
        if ticker != company.ticker || ticker.to_uppercase() != ticker {
            return Err(ConfigError::Validation(format!(
                "ticker '{}' must be upper-case without surrounding whitespace",
                company.ticker
            )));
        }
        if !seen_tickers.insert(ticker.to_string()) {
            return Err(ConfigError::Validation(format!(
                "duplicate ticker: '{ticker}'"
            )));
        }
        if company.keywords.is_empty() {
            return Err(ConfigError::Validation(format!(
                "ticker '{ticker}' has no keywords"
            )));
        }
    }

    file.registry()
        .map(|_| ())
        .map_err(|e| ConfigError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ticker: &str, keyword: &str, priority: i32) -> KeywordEntry {
        KeywordEntry {
            ticker: ticker.to_string(),
            keyword: keyword.to_string(),
            priority,
            company_uid: None,
        }
    }

    fn keyword_names(list: &[KeywordEntry]) -> Vec<&str> {
        list.iter().map(|e| e.keyword.as_str()).collect()
    }

    #[test]
    fn keywords_sorted_by_priority() {
        let registry = KeywordRegistry::new(vec![
            entry("EA", "Madden", 3),
            entry("EA", "Electronic Arts", 1),
            entry("EA", "FIFA", 2),
        ])
        .unwrap();
        let list = registry.keywords_for("EA").unwrap();
        assert_eq!(keyword_names(&list), vec!["Electronic Arts", "FIFA", "Madden"]);
    }

    #[test]
    fn equal_priorities_keep_registration_order() {
        let registry = KeywordRegistry::new(vec![
            entry("TTWO", "GTA", 2),
            entry("TTWO", "Take-Two", 1),
            entry("TTWO", "Rockstar Games", 2),
            entry("TTWO", "2K Games", 2),
        ])
        .unwrap();
        let list = registry.keywords_for("TTWO").unwrap();
        assert_eq!(
            keyword_names(&list),
            vec!["Take-Two", "GTA", "Rockstar Games", "2K Games"]
        );
    }

    #[test]
    fn unknown_ticker_without_fallback_is_not_found() {
        let registry = KeywordRegistry::new(vec![entry("EA", "FIFA", 1)]).unwrap();
        assert_eq!(
            registry.keywords_for("RBLX"),
            Err(RegistryError::NotFound("RBLX".to_string()))
        );
    }

    #[test]
    fn unknown_ticker_with_fallback_uses_symbol() {
        let registry = KeywordRegistry::new(vec![])
            .unwrap()
            .with_ticker_fallback(true);
        let list = registry.keywords_for("RBLX").unwrap();
        assert_eq!(list, vec![KeywordEntry::ticker_fallback("RBLX")]);
    }

    #[test]
    fn duplicate_keyword_rejected_case_insensitively() {
        let err = KeywordRegistry::new(vec![entry("EA", "FIFA", 1), entry("EA", "fifa", 2)])
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateKeyword { .. }));
    }

    #[test]
    fn same_keyword_allowed_across_tickers() {
        let registry =
            KeywordRegistry::new(vec![entry("SONY", "PS5", 1), entry("EA", "PS5", 9)]).unwrap();
        assert_eq!(registry.tickers(), &["SONY".to_string(), "EA".to_string()]);
    }

    #[test]
    fn blank_keyword_rejected() {
        let err = KeywordRegistry::new(vec![entry("EA", "  ", 1)]).unwrap_err();
        assert_eq!(err, RegistryError::EmptyKeyword("EA".to_string()));
    }

    #[test]
    fn yaml_round_trips_into_registry() {
        let yaml = r"
companies:
  - ticker: EA
    name: Electronic Arts
    keywords:
      - keyword: Electronic Arts
        priority: 1
      - keyword: Battlefield
  - ticker: RBLX
    company_uid: rblx-uid
    keywords:
      - keyword: Roblox
        priority: 1
";
        let file: KeywordsFile = serde_yaml::from_str(yaml).unwrap();
        validate_keywords(&file).unwrap();
        let registry = file.registry().unwrap();
        assert_eq!(registry.tickers(), &["EA".to_string(), "RBLX".to_string()]);
        let ea = registry.keywords_for("EA").unwrap();
        assert_eq!(ea[1].priority, DEFAULT_PRIORITY);
        let rblx = registry.keywords_for("RBLX").unwrap();
        assert_eq!(rblx[0].company_uid.as_deref(), Some("rblx-uid"));
    }

    #[test]
    fn validate_rejects_duplicate_ticker() {
        let yaml = r"
companies:
  - ticker: EA
    keywords: [{ keyword: FIFA }]
  - ticker: EA
    keywords: [{ keyword: Madden }]
";
        let file: KeywordsFile = serde_yaml::from_str(yaml).unwrap();
        let err = validate_keywords(&file).unwrap_err();
        assert!(err.to_string().contains("duplicate ticker"));
    }

    #[test]
    fn validate_rejects_lowercase_ticker() {
        let yaml = r"
companies:
  - ticker: ea
    keywords: [{ keyword: FIFA }]
";
        let file: KeywordsFile = serde_yaml::from_str(yaml).unwrap();
        assert!(validate_keywords(&file).is_err());
    }

    #[test]
    fn validate_rejects_ticker_without_keywords() {
        let yaml = r"
companies:
  - ticker: EA
    keywords: []
";
        let file: KeywordsFile = serde_yaml::from_str(yaml).unwrap();
        let err = validate_keywords(&file).unwrap_err();
        assert!(err.to_string().contains("has no keywords"));
    }

    #[test]
    fn load_keywords_reports_missing_file() {
        let err = load_keywords(Path::new("/nonexistent/keywords.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::KeywordsFileIo { .. }));
    }
}
