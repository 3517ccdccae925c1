//! Digest delivery.
//!
//! # Submodules
//!
//! - [`mime`]: builds the `multipart/alternative` message
//! - [`oauth`]: installed-app OAuth flow and token file handling
//! - [`gmail`]: sends the message through the Gmail API
//!
//! [`Deliver`] is the only thing the rest of the crate depends on.

pub mod gmail;
pub mod mime;
pub mod oauth;

use std::error::Error;

/// Sends an HTML digest to a single recipient.
pub trait Deliver {
    async fn deliver(&self, to: &str, subject: &str, html: &str) -> Result<(), Box<dyn Error>>;
}

/// Writes the digest to stdout instead of sending it (`--dry-run`).
#[derive(Debug, Default, Clone, Copy)]
pub struct Preview;

impl Deliver for Preview {
    async fn deliver(&self, to: &str, subject: &str, html: &str) -> Result<(), Box<dyn Error>> {
        println!("To: {to}\nSubject: {subject}\n\n{html}");
        Ok(())
    }
}
