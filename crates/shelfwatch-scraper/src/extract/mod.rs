//! Field extractors: independent strategy cascades over a loaded page.
//!
//! Every strategy failure (an invalid selector, a script error, a missing
//! node) is downgraded to "no value" and the cascade moves on. Nothing in
//! this module returns an error.

mod description;
mod image;
pub(crate) mod jsonld;
mod price;
mod rating;
pub mod text;

use rust_decimal::Decimal;
use serde::Serialize;
use shelfwatch_core::{ExtractionConfig, ScrapeDiagnostics};

use crate::page::{ElementSnapshot, PageQuery};

pub use description::extract_description;
pub use image::{extract_image, is_logo};
pub use price::{extract_offer, OfferOutcome};
pub use rating::extract_rating;

/// The main content region, most specific first.
pub(crate) const MAIN_REGION_SELECTORS: [&str; 4] =
    ["main", "[role='main']", "#main-content", "#main"];

/// Everything one extraction attempt learned about a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub description: Option<String>,
    /// Absolute URL.
    pub image: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub unavailable: bool,
    pub rating_average: Option<f64>,
    pub http_status: Option<u16>,
    /// Strategy tags in the order they were attempted. Diagnostic only.
    pub probes: Vec<String>,
}

impl ExtractionResult {
    #[must_use]
    pub fn has_probe(&self, tag: &str) -> bool {
        self.probes.iter().any(|p| p == tag)
    }

    #[must_use]
    pub fn diagnostics(&self) -> ScrapeDiagnostics {
        ScrapeDiagnostics {
            http_status: self.http_status,
            unavailable: self.unavailable,
            probes: self.probes.clone(),
        }
    }
}

/// Ordered audit trail of strategy attempts.
#[derive(Debug, Default)]
pub struct Probes(Vec<String>);

impl Probes {
    pub fn push(&mut self, tag: impl Into<String>) {
        self.0.push(tag.into());
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

/// Runs every field extractor against `page`.
///
/// `page_url` is the URL the page was loaded from; relative image URLs are
/// resolved against it.
pub async fn extract_all(
    page: &dyn PageQuery,
    page_url: &str,
    http_status: Option<u16>,
    config: &ExtractionConfig,
) -> ExtractionResult {
    let mut probes = Probes::default();

    let description = extract_description(page, &mut probes).await;
    let image = extract_image(page, page_url, &mut probes).await;
    let offer = extract_offer(page, config, &mut probes).await;
    let rating_average = extract_rating(page, &mut probes).await;

    ExtractionResult {
        description,
        image,
        price: offer.price,
        currency: offer.currency,
        unavailable: offer.unavailable,
        rating_average,
        http_status,
        probes: probes.into_inner(),
    }
}

/// `select`, with failures logged and treated as no matches.
pub(crate) async fn select_or_empty(page: &dyn PageQuery, selector: &str) -> Vec<ElementSnapshot> {
    match page.select(selector).await {
        Ok(elements) => elements,
        Err(err) => {
            tracing::debug!(selector, error = %err, "page query failed; skipping strategy");
            Vec::new()
        }
    }
}

/// Elements of the main content region, falling back to `body`.
pub(crate) async fn main_region(page: &dyn PageQuery) -> Vec<ElementSnapshot> {
    for selector in MAIN_REGION_SELECTORS {
        let found = select_or_empty(page, selector).await;
        if !found.is_empty() {
            return found;
        }
    }
    select_or_empty(page, "body").await
}
