//! Minimal RFC 2045/2046 message builder for the digest email.
//!
//! The message is `multipart/alternative` with a short plain-text notice for
//! clients that cannot render HTML, followed by the base64-encoded HTML part.
//! Non-ASCII subjects use RFC 2047 encoded words.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use rand::distr::Alphanumeric;
use rand::Rng;

pub const PLAIN_TEXT_FALLBACK: &str = "Your email client does not support HTML.";

const BASE64_LINE: usize = 76;

/// Build the full message text with a random MIME boundary.
pub fn build_message(to: &str, subject: &str, html: &str) -> String {
    let token: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    build_message_with_boundary(to, subject, html, &format!("=_digest_{token}"))
}

pub fn build_message_with_boundary(to: &str, subject: &str, html: &str, boundary: &str) -> String {
    let mut msg = String::new();
    msg.push_str(&format!("To: {}\r\n", single_line(to)));
    msg.push_str(&format!("Subject: {}\r\n", encode_header(&single_line(subject))));
    msg.push_str("MIME-Version: 1.0\r\n");
    msg.push_str(&format!(
        "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\r\n"
    ));

    msg.push_str(&format!("--{boundary}\r\n"));
    msg.push_str("Content-Type: text/plain; charset=\"utf-8\"\r\n");
    msg.push_str("Content-Transfer-Encoding: 7bit\r\n\r\n");
    msg.push_str(PLAIN_TEXT_FALLBACK);
    msg.push_str("\r\n\r\n");

    msg.push_str(&format!("--{boundary}\r\n"));
    msg.push_str("Content-Type: text/html; charset=\"utf-8\"\r\n");
    msg.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    msg.push_str(&wrap_base64(html.as_bytes()));
    msg.push_str(&format!("--{boundary}--\r\n"));
    msg
}

/// Encode a full message for the Gmail API `raw` field.
pub fn encode_raw(message: &str) -> String {
    URL_SAFE.encode(message.as_bytes())
}

/// Header values must not smuggle in extra header lines.
fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

fn wrap_base64(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE * 2 + 2);
    for chunk in encoded.as_bytes().chunks(BASE64_LINE) {
        // base64 output is ASCII, so every chunk is valid UTF-8.
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str("\r\n");
    }
    out
}
