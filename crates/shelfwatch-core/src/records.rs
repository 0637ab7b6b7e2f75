use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The identity and canonical URL of a product page to scrape.
///
/// Owned by the persistence layer; the scraper only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: Uuid,
    /// `None` when the product was seeded without a storefront URL.
    pub source_url: Option<String>,
}

/// The current best-known commercial facts for a product.
///
/// `price` is either inside the configured sanity bound or `None`; the
/// reconciler is the only writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedEntity {
    pub id: Uuid,
    pub price: Option<Decimal>,
    /// ISO 4217 code, e.g. `"GBP"`.
    pub currency: Option<String>,
    /// Absolute cover image URL.
    pub image: Option<String>,
}

impl PersistedEntity {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            price: None,
            currency: None,
            image: None,
        }
    }
}

/// Scrape-derived detail for a [`PersistedEntity`], 1:1 with its parent.
///
/// The detail's lifecycle belongs to the parent entity: stores must delete it
/// together with the entity and never independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub entity_id: Uuid,
    pub description: Option<String>,
    pub rating_average: Option<f64>,
    /// Free-form diagnostic bag; see [`ScrapeDiagnostics`] for the shape the
    /// scraper writes.
    pub specs: serde_json::Value,
    pub last_scraped_at: Option<DateTime<Utc>>,
}

impl DetailRecord {
    #[must_use]
    pub fn empty(entity_id: Uuid) -> Self {
        Self {
            entity_id,
            description: None,
            rating_average: None,
            specs: serde_json::Value::Object(serde_json::Map::new()),
            last_scraped_at: None,
        }
    }

    /// Decodes the diagnostic bag, if it has the shape the scraper writes.
    #[must_use]
    pub fn diagnostics(&self) -> Option<ScrapeDiagnostics> {
        serde_json::from_value(self.specs.clone()).ok()
    }
}

/// What the scraper records about each attempt inside [`DetailRecord::specs`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeDiagnostics {
    pub http_status: Option<u16>,
    pub unavailable: bool,
    pub probes: Vec<String>,
}
