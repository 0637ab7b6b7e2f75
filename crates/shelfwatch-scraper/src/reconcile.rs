//! Merges an extraction result into persisted records.
//!
//! Availability is authoritative over price: an unavailable product never
//! keeps a price, whatever the price strategies found.

use chrono::{DateTime, Utc};
use shelfwatch_core::{DetailRecord, ExtractionConfig, PersistedEntity};

use crate::extract::ExtractionResult;

/// Applies `result` to `entity`. Returns `true` if any field changed, i.e.
/// the entity needs saving.
pub fn reconcile_entity(
    result: &ExtractionResult,
    entity: &mut PersistedEntity,
    config: &ExtractionConfig,
) -> bool {
    let mut changed = false;

    if let Some(image) = &result.image {
        if entity.image.as_ref() != Some(image) {
            entity.image = Some(image.clone());
            changed = true;
        }
    }

    if result.unavailable {
        if entity.price.is_some() {
            entity.price = None;
            changed = true;
        }
    } else if let Some(price) = result.price {
        if config.price_in_bounds(price) && entity.price != Some(price) {
            entity.price = Some(price);
            changed = true;
        }
    }

    if let Some(currency) = &result.currency {
        if entity.currency.as_ref() != Some(currency) {
            entity.currency = Some(currency.clone());
            changed = true;
        }
    }

    changed
}

/// Records the attempt on `detail`. Description, rating and diagnostics are
/// replaced outright, absent values included.
pub fn apply_detail(result: &ExtractionResult, detail: &mut DetailRecord, now: DateTime<Utc>) {
    detail.description.clone_from(&result.description);
    detail.rating_average = result.rating_average;
    detail.specs = serde_json::to_value(result.diagnostics())
        .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()));
    detail.last_scraped_at = Some(now);
}
