//! Command-line interface definitions for News Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials come from the environment (a `.env` file is loaded first);
//! every digest setting in [`crate::config::DigestConfig`] can be overridden
//! with a flag.

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the News Digest application.
///
/// # Examples
///
/// ```sh
/// # Keys from the environment, defaults for everything else
/// API_KEY=... RECIPIENT=me@example.com news_digest
///
/// # Settings file plus a one-off keyword list, printed instead of sent
/// news_digest -c digest.yaml -k dryer -k washer --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// NewsAPI key
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Address the digest is sent to
    #[arg(short, long, env = "RECIPIENT")]
    pub recipient: String,

    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Search term sent to NewsAPI
    #[arg(short, long)]
    pub search: Option<String>,

    /// Keyword to look for (repeatable, in priority order)
    #[arg(short, long = "keyword")]
    pub keywords: Vec<String>,

    /// Oldest publication date to include (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Characters of context on each side of a keyword
    #[arg(long)]
    pub window: Option<usize>,

    /// Maximum snippets per article
    #[arg(long)]
    pub max_snippets: Option<usize>,

    /// Language code the digest is translated into (uk, ru, en)
    #[arg(long)]
    pub display_language: Option<String>,

    /// Email subject line
    #[arg(long)]
    pub subject: Option<String>,

    /// Print the digest to stdout instead of emailing it
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "news_digest",
            "--api-key",
            "secret",
            "--recipient",
            "me@example.com",
            "--from",
            "2025-11-29",
            "--dry-run",
        ]);

        assert_eq!(cli.api_key, "secret");
        assert_eq!(cli.recipient, "me@example.com");
        assert_eq!(cli.from, NaiveDate::from_ymd_opt(2025, 11, 29));
        assert!(cli.dry_run);
        assert!(cli.keywords.is_empty());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "news_digest",
            "--api-key",
            "secret",
            "-r",
            "me@example.com",
            "-c",
            "/tmp/digest.yaml",
            "-s",
            "Bosch",
            "-k",
            "oven",
            "-k",
            "hob",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/digest.yaml")));
        assert_eq!(cli.search.as_deref(), Some("Bosch"));
        assert_eq!(cli.keywords, vec!["oven", "hob"]);
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_cli_rejects_bad_date() {
        let result = Cli::try_parse_from([
            "news_digest",
            "--api-key",
            "secret",
            "-r",
            "me@example.com",
            "--from",
            "29/11/2025",
        ]);
        assert!(result.is_err());
    }
}
