//! Gmail API delivery (`users.messages.send`).

use super::mime::{build_message, encode_raw};
use super::oauth::authorize;
use super::Deliver;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, instrument};

const SEND_ENDPOINT: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

#[derive(Debug, Serialize)]
struct SendRequest {
    raw: String,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
    #[serde(default, rename = "threadId")]
    thread_id: Option<String>,
}

/// Sends mail as the authorized Gmail user.
#[derive(Debug, Clone)]
pub struct GmailMailer {
    client: Client,
    credentials_file: PathBuf,
    token_file: PathBuf,
}

impl GmailMailer {
    pub fn new(credentials_file: PathBuf, token_file: PathBuf) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            client: Client::builder().build()?,
            credentials_file,
            token_file,
        })
    }
}

impl Deliver for GmailMailer {
    #[instrument(level = "info", skip_all, fields(%to))]
    async fn deliver(&self, to: &str, subject: &str, html: &str) -> Result<(), Box<dyn Error>> {
        let user = authorize(&self.client, &self.credentials_file, &self.token_file).await?;
        let token = user.token.as_deref().ok_or("authorized user has no access token")?;

        let t0 = Instant::now();
        let request = SendRequest {
            raw: encode_raw(&build_message(to, subject, html)),
        };
        let resp = self
            .client
            .post(SEND_ENDPOINT)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("Gmail send failed with status {status}: {body}").into());
        }

        let sent: SentMessage = resp.json().await?;
        info!(
            message_id = %sent.id,
            thread_id = ?sent.thread_id,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Digest email sent"
        );
        Ok(())
    }
}
