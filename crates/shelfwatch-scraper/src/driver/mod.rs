//! Page-loading backends.
//!
//! A [`BrowserDriver`] starts one isolated [`BrowserSession`] per extraction
//! attempt. Sessions are never reused: the caller closes each one on every
//! exit path.

mod chrome;
mod http;

use async_trait::async_trait;

use crate::error::ScraperError;
use crate::page::PageQuery;

pub use chrome::ChromeDriver;
pub use http::HttpDriver;

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Starts a fresh session with no cookies or storage from earlier runs.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Browser`] if the backend cannot be started.
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScraperError>;
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigates to `url` and waits for the load to settle.
    ///
    /// Returns the main document's HTTP status when the backend can observe
    /// it. A 429 is returned as a status, not as an error.
    async fn goto(&self, url: &str) -> Result<Option<u16>, ScraperError>;

    /// Clicks through a cookie or consent overlay if one is showing.
    /// Returns `true` when something was dismissed.
    async fn dismiss_consent(&self) -> Result<bool, ScraperError>;

    /// The currently loaded document.
    fn page(&self) -> &dyn PageQuery;

    /// Tears the session down. Safe to call more than once.
    async fn close(&mut self) -> Result<(), ScraperError>;
}
