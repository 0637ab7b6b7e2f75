//! Offline tests for shelfwatch-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use rust_decimal::Decimal;
use shelfwatch_core::{AppConfig, DetailRecord, ExtractionConfig, PersistedEntity};
use shelfwatch_db::{DetailRow, PoolConfig, ProductRow};
use uuid::Uuid;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: Some("postgres://example".to_string()),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        extraction: ExtractionConfig::default(),
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn product_row_maps_to_persisted_entity() {
    let id = Uuid::new_v4();
    let row = ProductRow {
        id,
        title: "Dune".to_string(),
        source_url: Some("https://shop.example/en-gb/products/dune".to_string()),
        price: Some(Decimal::new(699, 2)),
        currency: Some("GBP".to_string()),
        image: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let entity = PersistedEntity::from(row);
    assert_eq!(entity.id, id);
    assert_eq!(entity.price, Some(Decimal::new(699, 2)));
    assert_eq!(entity.currency.as_deref(), Some("GBP"));
    assert!(entity.image.is_none());
}

#[test]
fn detail_row_maps_to_detail_record() {
    let id = Uuid::new_v4();
    let scraped = Utc::now();
    let row = DetailRow {
        product_id: id,
        description: Some("A desert planet.".to_string()),
        rating_average: Some(4.5),
        specs: serde_json::json!({"http_status": 200, "unavailable": false, "probes": ["desc:selector"]}),
        last_scraped_at: Some(scraped),
    };

    let detail = DetailRecord::from(row);
    assert_eq!(detail.entity_id, id);
    assert_eq!(detail.last_scraped_at, Some(scraped));
    let diagnostics = detail.diagnostics().unwrap();
    assert_eq!(diagnostics.http_status, Some(200));
    assert_eq!(diagnostics.probes, vec!["desc:selector"]);
}
