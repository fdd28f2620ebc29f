//! Pipeline error types.

use crate::browser::BrowserError;
use thiserror::Error;

/// Failures that end processing of a single lookup key with status `error`,
/// or a catalog download.
///
/// Absence (no results, missing fields, failed reveals) is not an error and
/// never shows up here.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Failed to load {url} after {attempts} attempts: {source}")]
    NavigationExhausted { url: String, attempts: u32, source: BrowserError },

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),
}
