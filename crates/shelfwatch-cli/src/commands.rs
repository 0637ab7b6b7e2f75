//! Command handlers, called from `main` once configuration is loaded.

use std::sync::Arc;

use shelfwatch_core::{AppConfig, ExtractionConfig};
use shelfwatch_scraper::{BrowserDriver, ChromeDriver, HttpDriver, RefreshPolicy, Refresher};
use uuid::Uuid;

pub(crate) fn build_driver(
    config: &ExtractionConfig,
    http: bool,
) -> anyhow::Result<Arc<dyn BrowserDriver>> {
    if http {
        let driver = HttpDriver::new(config)
            .map_err(|e| anyhow::anyhow!("failed to build HTTP driver: {e}"))?;
        Ok(Arc::new(driver))
    } else {
        Ok(Arc::new(ChromeDriver::new(config)))
    }
}

/// Runs one extraction against `url` and prints the result.
///
/// # Errors
///
/// Returns an error if the driver cannot be built or the result cannot be
/// serialized. Extraction failures show up in the printed probes instead.
pub(crate) async fn run_extract(config: &AppConfig, url: &str, http: bool) -> anyhow::Result<()> {
    let driver = build_driver(&config.extraction, http)?;
    let result = shelfwatch_scraper::scrape(driver.as_ref(), url, &config.extraction).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Refreshes product `id` against Postgres and prints its detail record.
///
/// # Errors
///
/// Returns an error if the database is unreachable, the product is unknown
/// or has no source URL, or a storage write fails.
pub(crate) async fn run_refresh(
    config: &AppConfig,
    id: Uuid,
    force: bool,
    http: bool,
) -> anyhow::Result<()> {
    let pool = shelfwatch_db::connect_pool_from_config(config).await?;
    let store = Arc::new(shelfwatch_db::PgCatalogStore::new(pool));
    let driver = build_driver(&config.extraction, http)?;
    let refresher = Refresher::new(store, driver, config.extraction.clone());

    let policy = if force {
        RefreshPolicy::Force
    } else {
        RefreshPolicy::RespectCooldown
    };
    let detail = refresher.refresh(id, policy).await?;
    println!("{}", serde_json::to_string_pretty(&detail)?);
    Ok(())
}

/// Applies pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub(crate) async fn run_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = shelfwatch_db::connect_pool_from_config(config).await?;
    shelfwatch_db::ping(&pool).await?;
    let applied = shelfwatch_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations complete");
    println!("applied {applied} migration(s)");
    Ok(())
}
