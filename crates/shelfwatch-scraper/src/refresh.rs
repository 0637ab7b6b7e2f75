//! The caller-facing refresh operation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use shelfwatch_core::{CatalogStore, DetailRecord, ExtractionConfig, StoreError};
use uuid::Uuid;

use crate::coordinator::{Admission, Coordinator, RefreshPolicy};
use crate::driver::BrowserDriver;
use crate::error::RefreshError;
use crate::reconcile::{apply_detail, reconcile_entity};
use crate::scrape::scrape;

type RefreshOutcome = Result<DetailRecord, RefreshError>;

/// Scrapes a product's source page and folds the result into storage.
///
/// Create one per process and share it: the single-flight and cooldown
/// guarantees only hold across callers of the same instance.
pub struct Refresher {
    store: Arc<dyn CatalogStore>,
    driver: Arc<dyn BrowserDriver>,
    config: Arc<ExtractionConfig>,
    coordinator: Coordinator<RefreshOutcome>,
}

impl Refresher {
    #[must_use]
    pub fn new(
        store: Arc<dyn CatalogStore>,
        driver: Arc<dyn BrowserDriver>,
        config: ExtractionConfig,
    ) -> Self {
        let coordinator = Coordinator::new(Duration::from_secs(config.cooldown_secs));
        Self {
            store,
            driver,
            config: Arc::new(config),
            coordinator,
        }
    }

    /// Refreshes product `id` and returns its detail record.
    ///
    /// Joins a refresh already in flight for `id` rather than starting a
    /// second one. Under [`RefreshPolicy::RespectCooldown`], a refresh
    /// requested inside the cooldown window returns the stored detail
    /// unchanged; if there is none yet, a run starts anyway.
    ///
    /// Navigation and extraction failures never surface here; they produce
    /// a detail record with whatever could be extracted.
    ///
    /// # Errors
    ///
    /// - [`RefreshError::SourceNotFound`] if no source record exists for `id`.
    /// - [`RefreshError::MissingSourceUrl`] if the record has no URL. Not retried.
    /// - [`RefreshError::Store`] if a storage read or write fails.
    pub async fn refresh(&self, id: Uuid, policy: RefreshPolicy) -> RefreshOutcome {
        let source = self
            .store
            .find_source_record(id)
            .await?
            .ok_or(RefreshError::SourceNotFound(id))?;
        let url = source
            .source_url
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty())
            .ok_or(RefreshError::MissingSourceUrl(id))?;

        let mut policy = policy;
        loop {
            match self
                .coordinator
                .admit(id, policy, || self.start_run(id, url.clone()))
            {
                Admission::Started(run) | Admission::Joined(run) => return run.await,
                Admission::CoolingDown => {
                    if let Some(detail) = self.store.find_detail(id).await? {
                        tracing::debug!(entity_id = %id, "inside cooldown; serving stored detail");
                        return Ok(detail);
                    }
                    policy = RefreshPolicy::Force;
                }
            }
        }
    }

    /// Like [`Refresher::refresh`], but on failure falls back to the detail
    /// already stored for `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns the refresh error when there is no stored detail to fall
    /// back to.
    pub async fn refresh_or_stale(&self, id: Uuid, policy: RefreshPolicy) -> RefreshOutcome {
        match self.refresh(id, policy).await {
            Ok(detail) => Ok(detail),
            Err(err) => {
                tracing::warn!(
                    entity_id = %id,
                    error = %err,
                    "refresh failed; trying stored detail"
                );
                match self.store.find_detail(id).await {
                    Ok(Some(detail)) => Ok(detail),
                    _ => Err(err),
                }
            }
        }
    }

    /// `true` while a refresh for `id` is running.
    #[must_use]
    pub fn is_refreshing(&self, id: Uuid) -> bool {
        self.coordinator.is_in_flight(id)
    }

    fn start_run(
        &self,
        id: Uuid,
        url: String,
    ) -> futures::future::BoxFuture<'static, RefreshOutcome> {
        let store = Arc::clone(&self.store);
        let driver = Arc::clone(&self.driver);
        let config = Arc::clone(&self.config);
        async move { run(store.as_ref(), driver.as_ref(), &config, id, &url).await }.boxed()
    }
}

async fn run(
    store: &dyn CatalogStore,
    driver: &dyn BrowserDriver,
    config: &ExtractionConfig,
    id: Uuid,
    url: &str,
) -> RefreshOutcome {
    tracing::info!(entity_id = %id, url, "refreshing product");
    let result = scrape(driver, url, config).await;

    let mut entity = store
        .load_entity(id)
        .await?
        .ok_or(StoreError::NotFound { kind: "entity", id })?;
    if reconcile_entity(&result, &mut entity, config) {
        store.save_entity(&entity).await?;
        tracing::info!(
            entity_id = %id,
            price = ?entity.price,
            currency = ?entity.currency,
            "entity updated"
        );
    }

    let mut detail = match store.find_detail(id).await? {
        Some(detail) => detail,
        None => store.create_detail(id).await?,
    };
    apply_detail(&result, &mut detail, Utc::now());
    store.save_detail(&detail).await?;
    Ok(detail)
}
