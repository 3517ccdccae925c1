//! Data models for fetched articles and the NewsAPI response envelope.
//!
//! - [`Article`]: one search result, consumed once per run
//! - [`NewsApiResponse`]: the `/v2/everything` JSON envelope
//!
//! Field names follow the NewsAPI JSON schema (camelCase), mapped onto
//! snake_case with `#[serde(rename)]`.

use serde::{Deserialize, Deserializer, Serialize};

/// A news article as returned by the article source.
///
/// `content` is usually a truncated excerpt ending in a `[+N chars]` marker,
/// may carry HTML fragments, and may be in any language.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Article {
    /// The article headline.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    /// Canonical article URL.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    /// Excerpt of the article body. Empty when the source sent none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    /// Publication timestamp as sent by the source (ISO 8601).
    #[serde(default, rename = "publishedAt")]
    pub published_at: Option<String>,
}

/// Envelope of a NewsAPI search response.
///
/// On failure NewsAPI answers `"status": "error"` with `code` and `message`
/// and no articles.
#[derive(Debug, Deserialize)]
pub struct NewsApiResponse {
    pub status: String,
    #[serde(default, rename = "totalResults")]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// NewsAPI sends explicit `null`s for missing text fields.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
