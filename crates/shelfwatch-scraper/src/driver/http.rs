//! Plain-HTTP backend: fetches the document and serves it as static HTML.
//!
//! No scripts run, so client-rendered widgets are invisible to extractors.
//! Useful for server-rendered storefronts and for running without Chrome.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shelfwatch_core::ExtractionConfig;

use super::{BrowserDriver, BrowserSession};
use crate::error::ScraperError;
use crate::html_page::HtmlPage;
use crate::page::PageQuery;

pub struct HttpDriver {
    client: Client,
}

impl HttpDriver {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &ExtractionConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.nav_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BrowserDriver for HttpDriver {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScraperError> {
        // No cookie store is configured; sessions share only the connection pool.
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            page: HtmlPage::default(),
        }))
    }
}

struct HttpSession {
    client: Client,
    page: HtmlPage,
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn goto(&self, url: &str) -> Result<Option<u16>, ScraperError> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(url, status, bytes = body.len(), "fetched page");
        self.page.replace(body);
        Ok(Some(status))
    }

    async fn dismiss_consent(&self) -> Result<bool, ScraperError> {
        Ok(false)
    }

    fn page(&self) -> &dyn PageQuery {
        &self.page
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        self.page.replace(String::new());
        Ok(())
    }
}
