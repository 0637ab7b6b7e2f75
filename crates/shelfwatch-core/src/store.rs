//! The persistence contract the extraction core depends on.
//!
//! Listing, browsing and CRUD live elsewhere; this trait covers only the
//! reads and writes a refresh performs.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::records::{DetailRecord, PersistedEntity, SourceRecord};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_source_record(&self, id: Uuid) -> Result<Option<SourceRecord>, StoreError>;

    async fn load_entity(&self, id: Uuid) -> Result<Option<PersistedEntity>, StoreError>;

    async fn save_entity(&self, entity: &PersistedEntity) -> Result<(), StoreError>;

    async fn find_detail(&self, entity_id: Uuid) -> Result<Option<DetailRecord>, StoreError>;

    /// Creates an empty detail row for `entity_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the parent entity does not exist.
    async fn create_detail(&self, entity_id: Uuid) -> Result<DetailRecord, StoreError>;

    async fn save_detail(&self, detail: &DetailRecord) -> Result<(), StoreError>;

    /// Deletes an entity together with the detail it owns.
    ///
    /// Returns `false` when no entity with `id` existed.
    async fn delete_entity(&self, id: Uuid) -> Result<bool, StoreError>;
}
