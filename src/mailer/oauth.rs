//! Google OAuth 2.0 for an installed application.
//!
//! Credentials live in two files:
//!
//! - the client secrets downloaded from the Cloud console (`credentials.json`,
//!   with an `installed` or `web` section)
//! - the authorized-user token (`token.json`), in the same layout the Google
//!   client libraries write, so an existing token file can be reused
//!
//! [`authorize`] returns a usable access token. It reuses the stored token
//! while it is fresh, refreshes it when it has expired, and falls back to the
//! interactive consent flow (loopback redirect to `127.0.0.1`) when there is
//! nothing to refresh. The token file is rewritten whenever the token changes.

use chrono::{DateTime, Duration, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, instrument, warn};
use url::{form_urlencoded, Url};

pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// OAuth client registration from the Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_json(raw: &str) -> Result<Self, Box<dyn Error>> {
        let file: ClientSecretsFile = serde_json::from_str(raw)?;
        file.installed
            .or(file.web)
            .ok_or_else(|| "client secrets file has no \"installed\" or \"web\" section".into())
    }
}

/// A stored, authorized user credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedUser {
    /// Current access token.
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Access token expiry; `None` means the token never expires.
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl AuthorizedUser {
    /// Whether the access token can be used at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.token.is_some()
            && self
                .expiry
                .is_none_or(|exp| now < exp - Duration::seconds(EXPIRY_SKEW_SECS))
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    fn apply(&mut self, resp: TokenResponse, now: DateTime<Utc>) {
        self.token = Some(resp.access_token);
        self.expiry = resp.expires_in.map(|secs| now + Duration::seconds(secs));
        if let Some(refresh) = resp.refresh_token {
            self.refresh_token = Some(refresh);
        }
        if let Some(scope) = resp.scope {
            self.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Query parameters Google appends to the loopback redirect.
#[derive(Debug, Default, PartialEq)]
struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Produce a fresh authorized user, persisting it to `token_file` if it changed.
#[instrument(level = "info", skip_all, fields(token_file = %token_file.display()))]
pub async fn authorize(
    client: &Client,
    credentials_file: &Path,
    token_file: &Path,
) -> Result<AuthorizedUser, Box<dyn Error>> {
    let stored = load_authorized_user(token_file).await;

    if let Some(user) = &stored {
        if user.is_valid_at(Utc::now()) {
            debug!("Stored access token is still valid");
            return Ok(user.clone());
        }
    }

    let user = match stored {
        Some(mut user) if user.can_refresh() => {
            info!("Access token expired; refreshing");
            refresh(client, &mut user).await?;
            user
        }
        _ => {
            let raw = fs::read_to_string(credentials_file).await.map_err(|e| {
                format!("cannot read client secrets {}: {e}", credentials_file.display())
            })?;
            let secrets = ClientSecrets::from_json(&raw)?;
            run_consent_flow(client, &secrets).await?
        }
    };

    save_authorized_user(token_file, &user).await?;
    Ok(user)
}

/// Read the token file; a missing or unreadable file means "no credential".
async fn load_authorized_user(path: &Path) -> Option<AuthorizedUser> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!(error = %e, "No stored token");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!(error = %e, "Stored token is unreadable; ignoring it");
            None
        }
    }
}

async fn save_authorized_user(path: &Path, user: &AuthorizedUser) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(user)?;
    fs::write(path, json).await?;
    info!(path = %path.display(), "Saved OAuth token");
    Ok(())
}

async fn refresh(client: &Client, user: &mut AuthorizedUser) -> Result<(), Box<dyn Error>> {
    let refresh_token = user
        .refresh_token
        .clone()
        .ok_or("stored credential has no refresh token")?;
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token.as_str()),
        ("client_id", user.client_id.as_str()),
        ("client_secret", user.client_secret.as_str()),
    ];
    let resp = request_token(client, &user.token_uri, &form).await?;
    user.apply(resp, Utc::now());
    Ok(())
}

/// Interactive consent: print the URL, wait for the loopback redirect.
async fn run_consent_flow(client: &Client, secrets: &ClientSecrets) -> Result<AuthorizedUser, Box<dyn Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let redirect_uri = loopback_redirect_uri(port);
    let state: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(30)
        .map(char::from)
        .collect();

    let url = consent_url(secrets, &redirect_uri, &state)?;
    info!(port, "Waiting for OAuth consent");
    println!("Please visit this URL to authorize this application: {url}");

    let code = loop {
        let (mut stream, _) = listener.accept().await?;
        let mut request_line = String::new();
        BufReader::new(&mut stream).read_line(&mut request_line).await?;

        let params = parse_redirect(&request_line);
        if params.code.is_none() && params.error.is_none() {
            stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await?;
            continue;
        }

        let body = "The authentication flow has completed. You may close this window.";
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await?;

        if let Some(error) = params.error {
            return Err(format!("OAuth consent failed: {error}").into());
        }
        if params.state.as_deref() != Some(state.as_str()) {
            return Err("OAuth redirect state mismatch".into());
        }
        if let Some(code) = params.code {
            break code;
        }
    };

    let form = [
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("client_id", secrets.client_id.as_str()),
        ("client_secret", secrets.client_secret.as_str()),
        ("redirect_uri", redirect_uri.as_str()),
    ];
    let resp = request_token(client, &secrets.token_uri, &form).await?;

    let mut user = AuthorizedUser {
        token: None,
        refresh_token: None,
        token_uri: secrets.token_uri.clone(),
        client_id: secrets.client_id.clone(),
        client_secret: secrets.client_secret.clone(),
        scopes: vec![GMAIL_SEND_SCOPE.to_string()],
        expiry: None,
    };
    user.apply(resp, Utc::now());
    info!("OAuth consent completed");
    Ok(user)
}

/// The redirect must name the address the listener is bound to.
fn loopback_redirect_uri(port: u16) -> String {
    format!("http://127.0.0.1:{port}/")
}

fn consent_url(secrets: &ClientSecrets, redirect_uri: &str, state: &str) -> Result<Url, Box<dyn Error>> {
    let mut url = Url::parse(&secrets.auth_uri)?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &secrets.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", GMAIL_SEND_SCOPE)
        .append_pair("state", state)
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");
    Ok(url)
}

/// Parse `GET /?code=...&state=... HTTP/1.1`.
fn parse_redirect(request_line: &str) -> RedirectParams {
    let mut params = RedirectParams::default();
    let Some(target) = request_line.split_whitespace().nth(1) else {
        return params;
    };
    let Some((_, query)) = target.split_once('?') else {
        return params;
    };

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => params.code = Some(value.into_owned()),
            "state" => params.state = Some(value.into_owned()),
            "error" => params.error = Some(value.into_owned()),
            _ => {}
        }
    }
    params
}

async fn request_token(
    client: &Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, Box<dyn Error>> {
    let resp = client.post(token_uri).form(form).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(format!("token endpoint returned {status}: {body}").into());
    }
    Ok(resp.json::<TokenResponse>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(token: Option<&str>, expiry: Option<DateTime<Utc>>) -> AuthorizedUser {
        AuthorizedUser {
            token: token.map(str::to_string),
            refresh_token: Some("refresh".to_string()),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            scopes: vec![GMAIL_SEND_SCOPE.to_string()],
            expiry,
        }
    }

    #[test]
    fn test_token_validity() {
        let now = Utc.with_ymd_and_hms(2025, 12, 1, 12, 0, 0).unwrap();
        assert!(user(Some("t"), None).is_valid_at(now));
        assert!(user(Some("t"), Some(now + Duration::minutes(10))).is_valid_at(now));
        assert!(!user(Some("t"), Some(now + Duration::seconds(30))).is_valid_at(now));
        assert!(!user(Some("t"), Some(now - Duration::minutes(1))).is_valid_at(now));
        assert!(!user(None, None).is_valid_at(now));
    }

    #[test]
    fn test_authorized_user_file_format() {
        let json = r#"{
            "token": "ya29.token",
            "refresh_token": "1//refresh",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "id.apps.googleusercontent.com",
            "client_secret": "secret",
            "scopes": ["https://www.googleapis.com/auth/gmail.send"],
            "universe_domain": "googleapis.com",
            "account": "",
            "expiry": "2025-12-01T12:00:00.123456Z"
        }"#;
        let user: AuthorizedUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.token.as_deref(), Some("ya29.token"));
        assert!(user.can_refresh());
        assert!(user.expiry.is_some());

        let round: AuthorizedUser = serde_json::from_str(&serde_json::to_string(&user).unwrap()).unwrap();
        assert_eq!(round, user);
    }

    #[test]
    fn test_apply_token_response() {
        let now = Utc.with_ymd_and_hms(2025, 12, 1, 12, 0, 0).unwrap();
        let mut u = user(None, None);
        u.apply(
            TokenResponse {
                access_token: "fresh".to_string(),
                expires_in: Some(3599),
                refresh_token: None,
                scope: Some(GMAIL_SEND_SCOPE.to_string()),
            },
            now,
        );
        assert_eq!(u.token.as_deref(), Some("fresh"));
        assert_eq!(u.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(u.expiry, Some(now + Duration::seconds(3599)));
        assert!(u.is_valid_at(now));
    }

    #[test]
    fn test_client_secrets_sections() {
        let installed = r#"{"installed": {"client_id": "a", "client_secret": "b",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "redirect_uris": ["http://localhost"]}}"#;
        assert_eq!(ClientSecrets::from_json(installed).unwrap().client_id, "a");

        let web = r#"{"web": {"client_id": "w", "client_secret": "s"}}"#;
        let secrets = ClientSecrets::from_json(web).unwrap();
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);

        assert!(ClientSecrets::from_json(r#"{"other": {}}"#).is_err());
    }

    #[test]
    fn test_consent_url() {
        let secrets = ClientSecrets::from_json(r#"{"installed": {"client_id": "cid", "client_secret": "s"}}"#).unwrap();
        let url = consent_url(&secrets, "http://localhost:8080/", "xyz").unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "cid");
        assert_eq!(pairs["redirect_uri"], "http://localhost:8080/");
        assert_eq!(pairs["scope"], GMAIL_SEND_SCOPE);
        assert_eq!(pairs["state"], "xyz");
        assert_eq!(pairs["response_type"], "code");
    }

    #[test]
    fn test_loopback_redirect_uri_matches_listener() {
        let uri = loopback_redirect_uri(8123);
        assert_eq!(uri, "http://127.0.0.1:8123/");
        let parsed = Url::parse(&uri).unwrap();
        assert_eq!(parsed.host_str(), Some("127.0.0.1"));
        assert_eq!(parsed.port(), Some(8123));
    }

    #[test]
    fn test_parse_redirect() {
        let params = parse_redirect("GET /?state=abc&code=4%2F0AbC+d&scope=x HTTP/1.1\r\n");
        assert_eq!(params.code.as_deref(), Some("4/0AbC d"));
        assert_eq!(params.state.as_deref(), Some("abc"));
        assert_eq!(params.error, None);

        let denied = parse_redirect("GET /?error=access_denied&state=abc HTTP/1.1");
        assert_eq!(denied.error.as_deref(), Some("access_denied"));

        let spaced = parse_redirect("GET /?code=a%20b+c&state=s%26t HTTP/1.1");
        assert_eq!(spaced.code.as_deref(), Some("a b c"));
        assert_eq!(spaced.state.as_deref(), Some("s&t"));

        assert_eq!(parse_redirect("GET /favicon.ico HTTP/1.1"), RedirectParams::default());
        assert_eq!(parse_redirect(""), RedirectParams::default());
    }
}
