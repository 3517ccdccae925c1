//! Digest settings: built-in defaults, optional YAML file, CLI overrides.
//!
//! Precedence, lowest first:
//!
//! 1. [`DigestConfig::default`]
//! 2. a YAML file passed with `--config`
//! 3. individual CLI flags ([`DigestConfig::apply_overrides`])
//!
//! # Example file
//!
//! ```yaml
//! search: Whirlpool
//! keywords: [dryer, washer]
//! lookback_days: 3
//! display_language: uk
//! ```

use crate::cli::Cli;
use crate::language::Alphabet;
use chrono::{Duration, NaiveDate};
use itertools::Itertools;
use serde::Deserialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DigestConfig {
    /// Search term sent to the article source.
    pub search: String,
    /// Keywords in priority order.
    pub keywords: Vec<String>,
    /// Fixed start date for the search; overrides `lookback_days`.
    pub from: Option<NaiveDate>,
    /// How many days back to search when no `from` date is given.
    pub lookback_days: i64,
    pub sort_by: String,
    /// Characters of context on each side of a keyword match.
    pub window: usize,
    /// Upper bound on snippets per article.
    pub max_snippets: usize,
    /// Language content is normalized into before keyword matching.
    pub working_language: String,
    /// Language the reader sees.
    pub display_language: String,
    pub subject: String,
    /// `<h2>` at the top of the digest.
    pub heading: String,
    /// OAuth client secrets downloaded from the Google Cloud console.
    pub credentials_file: PathBuf,
    /// Cached authorized-user token, written after consent or refresh.
    pub token_file: PathBuf,
    pub endpoint: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            search: "Whirlpool".to_string(),
            keywords: vec!["dryer".to_string(), "washer".to_string()],
            from: None,
            lookback_days: 7,
            sort_by: "publishedAt".to_string(),
            window: 120,
            max_snippets: 2,
            working_language: "en".to_string(),
            display_language: "uk".to_string(),
            subject: "Important news".to_string(),
            heading: "Important News".to_string(),
            credentials_file: PathBuf::from("credentials.json"),
            token_file: PathBuf::from("token.json"),
            endpoint: "https://newsapi.org/v2/everything".to_string(),
        }
    }
}

impl DigestConfig {
    /// Parse a YAML settings file; absent keys keep their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let raw = fs::read_to_string(path).await?;
        let config = Self::from_yaml(&raw)?;
        info!("Loaded digest configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, Box<dyn Error>> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Apply the CLI flags that were actually given.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(search) = &cli.search {
            self.search = search.clone();
        }
        if !cli.keywords.is_empty() {
            self.keywords = cli.keywords.clone();
        }
        if let Some(from) = cli.from {
            self.from = Some(from);
        }
        if let Some(window) = cli.window {
            self.window = window;
        }
        if let Some(max_snippets) = cli.max_snippets {
            self.max_snippets = max_snippets;
        }
        if let Some(lang) = &cli.display_language {
            self.display_language = lang.clone();
        }
        if let Some(subject) = &cli.subject {
            self.subject = subject.clone();
        }
    }

    /// Trim keywords, drop blanks and case-insensitive duplicates.
    pub fn normalize(&mut self) {
        self.keywords = self
            .keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .unique_by(|k| k.to_lowercase())
            .collect();
    }

    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.search.trim().is_empty() {
            return Err("search term must not be empty".into());
        }
        if self.keywords.is_empty() {
            return Err("at least one keyword is required".into());
        }
        if self.max_snippets == 0 {
            return Err("max_snippets must be at least 1".into());
        }
        if self.lookback_days < 0 || Duration::try_days(self.lookback_days).is_none() {
            return Err(format!("lookback_days {} is out of range", self.lookback_days).into());
        }
        self.display_alphabet()?;
        Ok(())
    }

    pub fn display_alphabet(&self) -> Result<Alphabet, Box<dyn Error>> {
        Alphabet::from_code(&self.display_language).ok_or_else(|| {
            format!("unsupported display language {:?} (expected uk, ru or en)", self.display_language).into()
        })
    }

    /// Start date of the search window relative to `today`.
    pub fn from_date(&self, today: NaiveDate) -> Result<NaiveDate, Box<dyn Error>> {
        if let Some(from) = self.from {
            return Ok(from);
        }
        Duration::try_days(self.lookback_days)
            .and_then(|back| today.checked_sub_signed(back))
            .ok_or_else(|| format!("lookback_days {} reaches outside the calendar", self.lookback_days).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults() {
        let config = DigestConfig::default();
        assert_eq!(config.keywords, vec!["dryer", "washer"]);
        assert_eq!(config.window, 120);
        assert_eq!(config.max_snippets, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_override() {
        let config = DigestConfig::from_yaml(
            "search: Bosch\nkeywords: [oven]\nfrom: 2025-11-29\ndisplay_language: ru\n",
        )
        .unwrap();
        assert_eq!(config.search, "Bosch");
        assert_eq!(config.keywords, vec!["oven"]);
        assert_eq!(config.from, NaiveDate::from_ymd_opt(2025, 11, 29));
        assert_eq!(config.display_alphabet().unwrap(), Alphabet::Russian);
        assert_eq!(config.window, 120);
    }

    #[test]
    fn test_example_file_parses() {
        let config = DigestConfig::from_yaml(include_str!("../digest.example.yaml")).unwrap();
        assert_eq!(config, DigestConfig::default());
    }

    #[test]
    fn test_yaml_rejects_unknown_keys() {
        assert!(DigestConfig::from_yaml("serch: typo\n").is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config = DigestConfig::from_yaml("search: Bosch\nwindow: 50\n").unwrap();
        let cli = Cli::parse_from([
            "news_digest",
            "--api-key",
            "k",
            "--recipient",
            "r@example.com",
            "-k",
            "Dryer",
            "-k",
            "dishwasher",
            "--max-snippets",
            "3",
        ]);
        config.apply_overrides(&cli);
        assert_eq!(config.search, "Bosch");
        assert_eq!(config.window, 50);
        assert_eq!(config.keywords, vec!["Dryer", "dishwasher"]);
        assert_eq!(config.max_snippets, 3);
    }

    #[test]
    fn test_normalize_keywords() {
        let mut config = DigestConfig {
            keywords: vec![" dryer ".into(), "".into(), "DRYER".into(), "washer".into()],
            ..DigestConfig::default()
        };
        config.normalize();
        assert_eq!(config.keywords, vec!["dryer", "washer"]);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let no_keywords = DigestConfig {
            keywords: vec![],
            ..DigestConfig::default()
        };
        assert!(no_keywords.validate().is_err());

        let zero_max = DigestConfig {
            max_snippets: 0,
            ..DigestConfig::default()
        };
        assert!(zero_max.validate().is_err());

        let bad_lang = DigestConfig {
            display_language: "de".into(),
            ..DigestConfig::default()
        };
        assert!(bad_lang.validate().unwrap_err().to_string().contains("de"));
    }

    #[test]
    fn test_from_date() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 6).unwrap();
        let config = DigestConfig::default();
        assert_eq!(config.from_date(today).unwrap(), NaiveDate::from_ymd_opt(2025, 11, 29).unwrap());

        let fixed = DigestConfig {
            from: NaiveDate::from_ymd_opt(2025, 1, 1),
            ..DigestConfig::default()
        };
        assert_eq!(fixed.from_date(today).unwrap(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn test_out_of_range_lookback_is_an_error() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 6).unwrap();
        let huge = DigestConfig::from_yaml("lookback_days: 9223372036854775807\n").unwrap();
        assert!(huge.validate().is_err());
        assert!(huge.from_date(today).is_err());

        let past_calendar = DigestConfig {
            lookback_days: 1_000_000_000,
            ..DigestConfig::default()
        };
        assert!(past_calendar.from_date(today).is_err());

        let negative = DigestConfig {
            lookback_days: -1,
            ..DigestConfig::default()
        };
        assert!(negative.validate().is_err());
    }
}
