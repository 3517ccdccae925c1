//! Article sources.
//!
//! A source turns a search query into a list of [`crate::models::Article`]s.
//! Only one source exists today:
//!
//! | Source | Module | Method |
//! |--------|--------|--------|
//! | NewsAPI | [`newsapi`] | `/v2/everything` JSON search |

pub mod newsapi;
