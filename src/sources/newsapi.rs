//! NewsAPI `/v2/everything` search client.
//!
//! One GET per run with `q`, `from`, `sortBy` and `apiKey` query parameters.
//! The API key travels in the query string, so request URLs are never logged.

use crate::models::{Article, NewsApiResponse};
use crate::utils::truncate_for_log;
use chrono::NaiveDate;
use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::error::Error;
use tracing::{debug, info, instrument};
use url::Url;

/// Search parameters for one fetch.
#[derive(Debug, Clone)]
pub struct NewsQuery<'a> {
    pub search: &'a str,
    pub from: NaiveDate,
    pub sort_by: &'a str,
}

#[derive(Debug, Clone)]
pub struct NewsApiClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl NewsApiClient {
    pub fn new(endpoint: &str, api_key: impl Into<String>) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            client: Client::builder().build()?,
            endpoint: Url::parse(endpoint)?,
            api_key: api_key.into(),
        })
    }

    fn request_url(&self, query: &NewsQuery<'_>) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", query.search)
            .append_pair("from", &query.from.format("%Y-%m-%d").to_string())
            .append_pair("sortBy", query.sort_by)
            .append_pair("apiKey", &self.api_key);
        url
    }

    /// Fetch every article the search returns.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, on an `"error"` status envelope, and on a
    /// non-success HTTP status whose body is not a NewsAPI envelope.
    #[instrument(level = "info", skip_all, fields(search = %query.search, from = %query.from))]
    pub async fn fetch_articles(&self, query: &NewsQuery<'_>) -> Result<Vec<Article>, Box<dyn Error>> {
        let resp = self
            .client
            .get(self.request_url(query))
            .header(USER_AGENT, "Mozilla/5.0")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!(%status, bytes = body.len(), "NewsAPI responded");

        let articles = parse_response(status, &body)?;
        info!(count = articles.len(), "Fetched NewsAPI articles");
        Ok(articles)
    }
}

fn parse_response(status: StatusCode, body: &str) -> Result<Vec<Article>, Box<dyn Error>> {
    let parsed = match serde_json::from_str::<NewsApiResponse>(body) {
        Ok(parsed) => parsed,
        Err(e) if status.is_success() => return Err(e.into()),
        Err(_) => {
            return Err(format!(
                "NewsAPI request failed with status {status}: {}",
                truncate_for_log(body, 200)
            )
            .into());
        }
    };

    if parsed.status != "ok" {
        return Err(format!(
            "NewsAPI returned {} ({}): {}",
            parsed.status,
            parsed.code.as_deref().unwrap_or("unknown"),
            parsed.message.as_deref().unwrap_or("no message"),
        )
        .into());
    }

    debug!(total_results = ?parsed.total_results, "NewsAPI envelope parsed");
    Ok(parsed.articles)
}
