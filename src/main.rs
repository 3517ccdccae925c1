//! # News Digest
//!
//! Fetches news articles for a search term and keeps the ones
//! relevant to a keyword set, whatever language they are written in. It
//! emails a short HTML digest of translated, keyword-centred snippets.
//!
//! ## Usage
//!
//! ```sh
//! API_KEY=... RECIPIENT=me@example.com news_digest -c digest.yaml
//! ```
//!
//! ## Architecture
//!
//! The application runs one pass, start to finish:
//! 1. **Fetching**: Search NewsAPI for the configured term
//! 2. **Filtering**: Keep articles whose content, normalized to the working
//!    language, mentions a keyword
//! 3. **Extraction**: Cut non-overlapping windows around keyword matches and
//!    clean them into prose
//! 4. **Translation**: Translate titles and snippets into the display language
//! 5. **Delivery**: Send the assembled HTML through Gmail

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cleaner;
mod cli;
mod config;
mod digest;
mod language;
mod mailer;
mod models;
mod snippets;
mod sources;
mod translate;
mod utils;

use cli::Cli;
use config::DigestConfig;
use mailer::gmail::GmailMailer;
use mailer::{Deliver, Preview};
use sources::newsapi::{NewsApiClient, NewsQuery};
use translate::{GoogleTranslate, Translator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load .env before clap reads API_KEY / RECIPIENT.
    let _ = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_digest starting up");

    let args = Cli::parse();
    debug!(config = ?args.config, dry_run = args.dry_run, "Parsed CLI arguments");

    // ---- Settings ----
    let mut config = match &args.config {
        Some(path) => DigestConfig::load(path).await?,
        None => DigestConfig::default(),
    };
    config.apply_overrides(&args);
    config.normalize();
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e);
    }
    let display_alphabet = config.display_alphabet()?;
    let from = config.from_date(Local::now().date_naive())?;
    info!(
        search = %config.search,
        keywords = ?config.keywords,
        %from,
        display_language = display_alphabet.code(),
        "Configuration ready"
    );

    // ---- Fetch ----
    let source = NewsApiClient::new(&config.endpoint, args.api_key.as_str())?;
    let query = NewsQuery {
        search: &config.search,
        from,
        sort_by: &config.sort_by,
    };
    let articles = source.fetch_articles(&query).await?;
    info!(count = articles.len(), "Total articles to analyze");

    // ---- Assemble ----
    let mut translator = Translator::new(GoogleTranslate::new()?, config.working_language.as_str(), display_alphabet);
    let digest = digest::build_digest(&mut translator, &articles, &config).await;
    if digest.is_empty() {
        warn!("No relevant articles found; sending an empty digest");
    }

    // ---- Deliver ----
    let delivered = if args.dry_run {
        Preview.deliver(&args.recipient, &config.subject, &digest.html).await
    } else {
        GmailMailer::new(config.credentials_file.clone(), config.token_file.clone())?
            .deliver(&args.recipient, &config.subject, &digest.html)
            .await
    };
    if let Err(e) = delivered {
        error!(recipient = %args.recipient, error = %e, "Failed to deliver digest");
        return Err(e);
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        included = digest.included,
        skipped = digest.skipped,
        cache_entries = translator.cache().len(),
        cache_hits = translator.cache().hits(),
        cache_misses = translator.cache().misses(),
        "Execution complete"
    );

    Ok(())
}
