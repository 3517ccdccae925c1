//! Coarse script detection and language-agnostic keyword matching.
//!
//! [`needs_translation`] is not a language detector. It only asks two
//! questions: does the text contain CJK ideographs (always foreign), and does
//! it contain *any* letter of the display language's alphabet. When there is
//! no such letter the text is assumed to need translation, which can
//! over-translate brand names and very short strings. That is acceptable:
//! translating text that is already in the right language hands it back
//! essentially unchanged.

use crate::translate::{Translate, Translator};
use once_cell::sync::Lazy;
use regex::Regex;

static FOREIGN_SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x{4E00}-\x{9FFF}]").expect("FOREIGN_SCRIPT regex should compile"));
static UKRAINIAN_LETTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[а-яіїєґ]").expect("UKRAINIAN_LETTERS regex should compile"));
static RUSSIAN_LETTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[а-яё]").expect("RUSSIAN_LETTERS regex should compile"));
static ENGLISH_LETTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z]").expect("ENGLISH_LETTERS regex should compile"));

/// Lowercase alphabet of a supported display language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    Ukrainian,
    Russian,
    English,
}

impl Alphabet {
    /// Look up the alphabet for an ISO 639-1 language code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "uk" => Some(Self::Ukrainian),
            "ru" => Some(Self::Russian),
            "en" => Some(Self::English),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Ukrainian => "uk",
            Self::Russian => "ru",
            Self::English => "en",
        }
    }

    fn letters(&self) -> &'static Regex {
        match self {
            Self::Ukrainian => &UKRAINIAN_LETTERS,
            Self::Russian => &RUSSIAN_LETTERS,
            Self::English => &ENGLISH_LETTERS,
        }
    }
}

/// Decide whether `text` should be sent for translation into `display`.
pub fn needs_translation(text: &str, display: Alphabet) -> bool {
    if FOREIGN_SCRIPT.is_match(text) {
        return true;
    }
    !display.letters().is_match(&text.to_lowercase())
}

/// Case-insensitive substring check for any keyword, no translation.
pub fn contains_any_keyword<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    let lowered = text.to_lowercase();
    keywords
        .iter()
        .map(|k| k.as_ref().to_lowercase())
        .any(|k| !k.is_empty() && lowered.contains(&k))
}

/// Does `content` mention any keyword once normalized to the working language?
///
/// Empty content is never relevant and costs no translation call.
pub async fn content_contains_keywords_any_lang<T: Translate, S: AsRef<str>>(
    translator: &mut Translator<T>,
    content: &str,
    keywords: &[S],
) -> bool {
    if content.is_empty() {
        return false;
    }
    let normalized = translator.to_working_language_cached(content).await;
    contains_any_keyword(normalized.text(), keywords)
}
