//! In-process [`CatalogStore`] for tests and embedders that need no database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::records::{DetailRecord, PersistedEntity, SourceRecord};
use crate::store::{CatalogStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    sources: HashMap<Uuid, Option<String>>,
    entities: HashMap<Uuid, PersistedEntity>,
    details: HashMap<Uuid, DetailRecord>,
    entity_saves: usize,
    detail_saves: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a product with an empty entity and the given source URL.
    pub fn insert_product(&self, id: Uuid, source_url: Option<&str>) {
        let mut tables = self.lock();
        tables.sources.insert(id, source_url.map(str::to_owned));
        tables.entities.insert(id, PersistedEntity::new(id));
    }

    /// Replaces the stored entity without counting it as a reconciler write.
    pub fn seed_entity(&self, entity: PersistedEntity) {
        let mut tables = self.lock();
        tables.sources.entry(entity.id).or_insert(None);
        tables.entities.insert(entity.id, entity);
    }

    #[must_use]
    pub fn entity(&self, id: Uuid) -> Option<PersistedEntity> {
        self.lock().entities.get(&id).cloned()
    }

    #[must_use]
    pub fn detail(&self, id: Uuid) -> Option<DetailRecord> {
        self.lock().details.get(&id).cloned()
    }

    /// Number of `save_entity` calls observed so far.
    #[must_use]
    pub fn entity_saves(&self) -> usize {
        self.lock().entity_saves
    }

    #[must_use]
    pub fn detail_saves(&self) -> usize {
        self.lock().detail_saves
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_source_record(&self, id: Uuid) -> Result<Option<SourceRecord>, StoreError> {
        Ok(self.lock().sources.get(&id).map(|url| SourceRecord {
            id,
            source_url: url.clone(),
        }))
    }

    async fn load_entity(&self, id: Uuid) -> Result<Option<PersistedEntity>, StoreError> {
        Ok(self.lock().entities.get(&id).cloned())
    }

    async fn save_entity(&self, entity: &PersistedEntity) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables.entities.contains_key(&entity.id) {
            return Err(StoreError::NotFound {
                kind: "entity",
                id: entity.id,
            });
        }
        tables.entities.insert(entity.id, entity.clone());
        tables.entity_saves += 1;
        Ok(())
    }

    async fn find_detail(&self, entity_id: Uuid) -> Result<Option<DetailRecord>, StoreError> {
        Ok(self.lock().details.get(&entity_id).cloned())
    }

    async fn create_detail(&self, entity_id: Uuid) -> Result<DetailRecord, StoreError> {
        let mut tables = self.lock();
        if !tables.entities.contains_key(&entity_id) {
            return Err(StoreError::NotFound {
                kind: "entity",
                id: entity_id,
            });
        }
        let detail = tables
            .details
            .entry(entity_id)
            .or_insert_with(|| DetailRecord::empty(entity_id));
        Ok(detail.clone())
    }

    async fn save_detail(&self, detail: &DetailRecord) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables.entities.contains_key(&detail.entity_id) {
            return Err(StoreError::NotFound {
                kind: "entity",
                id: detail.entity_id,
            });
        }
        tables.details.insert(detail.entity_id, detail.clone());
        tables.detail_saves += 1;
        Ok(())
    }

    async fn delete_entity(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        let existed = tables.entities.remove(&id).is_some();
        tables.sources.remove(&id);
        tables.details.remove(&id);
        Ok(existed)
    }
}
