//! Best-effort translation with a per-run memo cache.
//!
//! # Architecture
//!
//! - [`Translate`]: the remote capability, `translate(text, source, target)`
//! - [`GoogleTranslate`]: production backend, the public mobile translate page
//! - [`Translator`]: adapter that owns a backend, the [`TranslationCache`] and
//!   the working/display language pair
//!
//! Every adapter call is fail-open. A backend error never reaches the caller;
//! it comes back as [`Translation::Unavailable`] carrying the original text, so
//! callers can still tell whether translation really happened.

use crate::language::{needs_translation, Alphabet};
use crate::utils::truncate_for_log;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::error::Error;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use url::Url;

/// Remote translation capability.
///
/// Implementors may fail for any reason (network, quota, malformed input);
/// [`Translator`] absorbs those failures.
pub trait Translate {
    /// Translate `text` from `source` (`"auto"` to detect) into `target`.
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, Box<dyn Error>>;
}

/// Outcome of a translation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// The backend returned a translation.
    Translated(String),
    /// Translation was skipped; the text is the input unchanged.
    NotNeeded(String),
    /// The backend failed; the text is the input unchanged.
    Unavailable(String),
}

impl Translation {
    pub fn text(&self) -> &str {
        match self {
            Self::Translated(t) | Self::NotNeeded(t) | Self::Unavailable(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Translated(t) | Self::NotNeeded(t) | Self::Unavailable(t) => t,
        }
    }

    pub fn was_translated(&self) -> bool {
        matches!(self, Self::Translated(_))
    }
}

/// Exact-text memo of translation outcomes for one run.
///
/// Failed lookups are cached too, so a text costs at most one remote call.
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: HashMap<String, Translation>,
    hits: usize,
    misses: usize,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&mut self, text: &str) -> Option<Translation> {
        match self.entries.get(text) {
            Some(found) => {
                self.hits += 1;
                Some(found.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    fn store(&mut self, text: &str, outcome: Translation) {
        self.entries.insert(text.to_string(), outcome);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

/// Translation adapter between the working and display languages.
#[derive(Debug)]
pub struct Translator<T> {
    backend: T,
    working_language: String,
    display: Alphabet,
    cache: TranslationCache,
}

impl<T: Translate> Translator<T> {
    pub fn new(backend: T, working_language: impl Into<String>, display: Alphabet) -> Self {
        Self {
            backend,
            working_language: working_language.into(),
            display,
            cache: TranslationCache::new(),
        }
    }

    /// Translate into the working language, falling back to `text` on failure.
    pub async fn to_working_language(&self, text: &str) -> Translation {
        self.remote(text, &self.working_language).await
    }

    /// Memoized [`Translator::to_working_language`].
    pub async fn to_working_language_cached(&mut self, text: &str) -> Translation {
        if let Some(hit) = self.cache.lookup(text) {
            debug!(text = %truncate_for_log(text, 60), "Translation cache hit");
            return hit;
        }
        let outcome = self.to_working_language(text).await;
        self.cache.store(text, outcome.clone());
        outcome
    }

    /// Translate into the display language when the text looks foreign.
    pub async fn to_display_language(&self, text: &str) -> Translation {
        if !needs_translation(text, self.display) {
            return Translation::NotNeeded(text.to_string());
        }
        self.remote(text, self.display.code()).await
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    #[cfg(test)]
    pub fn backend(&self) -> &T {
        &self.backend
    }

    async fn remote(&self, text: &str, target: &str) -> Translation {
        if text.trim().is_empty() {
            return Translation::NotNeeded(text.to_string());
        }
        match self.backend.translate(text, "auto", target).await {
            Ok(translated) => Translation::Translated(translated),
            Err(e) => {
                warn!(
                    %target,
                    error = %e,
                    text = %truncate_for_log(text, 80),
                    "Translation failed; keeping original text"
                );
                Translation::Unavailable(text.to_string())
            }
        }
    }
}

/// Longest input the mobile translate page accepts.
const MAX_TRANSLATE_CHARS: usize = 5000;

/// [`Translate`] backed by `translate.google.com/m`.
///
/// The page is plain HTML; the translation is the text of the first
/// `div.result-container`.
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    client: Client,
    endpoint: Url,
}

impl GoogleTranslate {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        Self::with_endpoint("https://translate.google.com/m")
    }

    pub fn with_endpoint(endpoint: &str) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (news_digest)")
            .build()?;
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
        })
    }

    fn request_url(&self, text: &str, source: &str, target: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("sl", source)
            .append_pair("tl", target)
            .append_pair("q", text);
        url
    }
}

impl Translate for GoogleTranslate {
    #[instrument(level = "debug", skip_all, fields(%source, %target))]
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, Box<dyn Error>> {
        let chars = text.chars().count();
        if chars > MAX_TRANSLATE_CHARS {
            return Err(format!("text too long to translate ({chars} > {MAX_TRANSLATE_CHARS} chars)").into());
        }

        let t0 = Instant::now();
        let resp = self
            .client
            .get(self.request_url(text, source, target))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("translate request failed with status {status}").into());
        }
        let body = resp.text().await?;
        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, bytes = body.len(), "Translate page fetched");

        parse_translation(&body)?.ok_or_else(|| "translate page had no result container".into())
    }
}

/// Pull the translated text out of the mobile translate page.
fn parse_translation(html: &str) -> Result<Option<String>, Box<dyn Error>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("div.result-container")?;
    Ok(document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty()))
}


#[cfg(test)]
mod tests {
    use super::testing::Dictionary;
    use super::*;

    #[tokio::test]
    async fn test_working_language_translation() {
        let translator = Translator::new(
            Dictionary::with(&[("Сушарка", "Dryer")]),
            "en",
            Alphabet::Ukrainian,
        );
        let out = translator.to_working_language("Сушарка").await;
        assert_eq!(out, Translation::Translated("Dryer".to_string()));
        assert!(out.was_translated());
    }

    #[tokio::test]
    async fn test_failure_is_fail_open() {
        let translator = Translator::new(Dictionary::failing(), "en", Alphabet::Ukrainian);
        let out = translator.to_working_language("Сушарка").await;
        assert_eq!(out, Translation::Unavailable("Сушарка".to_string()));
        assert_eq!(out.into_text(), "Сушарка");

        let out = translator.to_display_language("Dryer recall").await;
        assert_eq!(out, Translation::Unavailable("Dryer recall".to_string()));
    }

    #[tokio::test]
    async fn test_cache_makes_one_call_per_distinct_text() {
        let mut translator = Translator::new(Dictionary::default(), "en", Alphabet::Ukrainian);
        for _ in 0..3 {
            translator.to_working_language_cached("one").await;
            translator.to_working_language_cached("two").await;
        }
        assert_eq!(translator.backend().calls(), 2);
        assert_eq!(translator.cache().len(), 2);
        assert_eq!(translator.cache().misses(), 2);
        assert_eq!(translator.cache().hits(), 4);
    }

    #[tokio::test]
    async fn test_cache_remembers_failures() {
        let mut translator = Translator::new(Dictionary::failing(), "en", Alphabet::Ukrainian);
        let first = translator.to_working_language_cached("x y z").await;
        let second = translator.to_working_language_cached("x y z").await;
        assert_eq!(first, second);
        assert_eq!(translator.backend().calls(), 1);
    }

    #[tokio::test]
    async fn test_display_translation_skipped_when_not_needed() {
        let translator = Translator::new(
            Dictionary::with(&[("Dryer recall", "Відкликання сушарок")]),
            "en",
            Alphabet::Ukrainian,
        );
        let skipped = translator.to_display_language("Відкликання сушарок").await;
        assert_eq!(skipped, Translation::NotNeeded("Відкликання сушарок".to_string()));
        assert_eq!(translator.backend().calls(), 0);

        let translated = translator.to_display_language("Dryer recall").await;
        assert_eq!(translated.text(), "Відкликання сушарок");
        assert_eq!(translator.backend().calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_text_is_never_sent() {
        let translator = Translator::new(Dictionary::default(), "en", Alphabet::Ukrainian);
        assert_eq!(
            translator.to_display_language("   ").await,
            Translation::NotNeeded("   ".to_string())
        );
        assert_eq!(translator.backend().calls(), 0);
    }

    #[test]
    fn test_parse_translation() {
        let html = r#"<html><body><div class="header">x</div>
            <div class="result-container"> The dryer broke </div></body></html>"#;
        assert_eq!(
            parse_translation(html).unwrap(),
            Some("The dryer broke".to_string())
        );
        assert_eq!(parse_translation("<html><body></body></html>").unwrap(), None);
    }

    #[test]
    fn test_request_url_encodes_text() {
        let backend = GoogleTranslate::new().unwrap();
        let url = backend.request_url("Сушарка & co", "auto", "en");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("sl".to_string(), "auto".to_string()),
                ("tl".to_string(), "en".to_string()),
                ("q".to_string(), "Сушарка & co".to_string()),
            ]
        );
        assert_eq!(url.path(), "/m");
    }
}
