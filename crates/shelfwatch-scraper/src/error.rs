use shelfwatch_core::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Failure of a single query against a loaded page.
///
/// Extractors treat every `PageError` as "this strategy found nothing".
#[derive(Debug, Error)]
pub enum PageError {
    #[error("invalid selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("script evaluation failed: {0}")]
    Evaluation(String),

    #[error("unexpected evaluation result: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {url} (HTTP 429)")]
    RateLimited { url: String },

    #[error("navigation to {url} timed out after {timeout_secs}s")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("browser error: {0}")]
    Browser(String),

    #[error(transparent)]
    Page(#[from] PageError),
}

/// Errors surfaced by [`crate::Refresher`].
///
/// Scrape-side failures never appear here: they degrade the extraction
/// result instead. Only lookups and storage writes can fail a refresh.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("source record {0} not found")]
    SourceNotFound(Uuid),

    #[error("source record {0} has no URL to scrape")]
    MissingSourceUrl(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}
