//! Postgres-backed [`CatalogStore`] over `products` and `product_details`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shelfwatch_core::{CatalogStore, DetailRecord, PersistedEntity, SourceRecord, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub title: String,
    pub source_url: Option<String>,
    /// `NUMERIC(10,2)`; `NULL` when unknown or the product is unavailable.
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for PersistedEntity {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            price: row.price,
            currency: row.currency,
            image: row.image,
        }
    }
}

/// A row from the `product_details` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DetailRow {
    pub product_id: Uuid,
    pub description: Option<String>,
    pub rating_average: Option<f64>,
    pub specs: serde_json::Value,
    pub last_scraped_at: Option<DateTime<Utc>>,
}

impl From<DetailRow> for DetailRecord {
    fn from(row: DetailRow) -> Self {
        Self {
            entity_id: row.product_id,
            description: row.description,
            rating_average: row.rating_average,
            specs: row.specs,
            last_scraped_at: row.last_scraped_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "catalog query failed");
    DbError::from(err).into()
}

fn entity_not_found(id: Uuid) -> StoreError {
    StoreError::NotFound { kind: "entity", id }
}

const SELECT_DETAIL: &str = "SELECT product_id, description, rating_average, specs, last_scraped_at \
                             FROM product_details WHERE product_id = $1";

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_source_record(&self, id: Uuid) -> Result<Option<SourceRecord>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, Option<String>)>(
            "SELECT id, source_url FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(|(id, source_url)| SourceRecord { id, source_url }))
    }

    async fn load_entity(&self, id: Uuid) -> Result<Option<PersistedEntity>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, title, source_url, price, currency, image, created_at, updated_at \
             FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(PersistedEntity::from))
    }

    async fn save_entity(&self, entity: &PersistedEntity) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE products \
             SET price = $2, currency = $3, image = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(entity.id)
        .bind(entity.price)
        .bind(&entity.currency)
        .bind(&entity.image)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(entity_not_found(entity.id));
        }
        Ok(())
    }

    async fn find_detail(&self, entity_id: Uuid) -> Result<Option<DetailRecord>, StoreError> {
        let row = sqlx::query_as::<_, DetailRow>(SELECT_DETAIL)
            .bind(entity_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        Ok(row.map(DetailRecord::from))
    }

    async fn create_detail(&self, entity_id: Uuid) -> Result<DetailRecord, StoreError> {
        // Inserting through the parent row turns a missing product into zero
        // rows instead of a foreign-key violation.
        sqlx::query(
            "INSERT INTO product_details (product_id) \
             SELECT id FROM products WHERE id = $1 \
             ON CONFLICT (product_id) DO NOTHING",
        )
        .bind(entity_id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        sqlx::query_as::<_, DetailRow>(SELECT_DETAIL)
            .bind(entity_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(DetailRecord::from)
            .ok_or_else(|| entity_not_found(entity_id))
    }

    async fn save_detail(&self, detail: &DetailRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO product_details \
                 (product_id, description, rating_average, specs, last_scraped_at) \
             SELECT id, $2, $3, $4::jsonb, $5 FROM products WHERE id = $1 \
             ON CONFLICT (product_id) DO UPDATE SET \
                 description     = EXCLUDED.description, \
                 rating_average  = EXCLUDED.rating_average, \
                 specs           = EXCLUDED.specs, \
                 last_scraped_at = EXCLUDED.last_scraped_at, \
                 updated_at      = NOW()",
        )
        .bind(detail.entity_id)
        .bind(&detail.description)
        .bind(detail.rating_average)
        .bind(&detail.specs)
        .bind(detail.last_scraped_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(entity_not_found(detail.entity_id));
        }
        Ok(())
    }

    async fn delete_entity(&self, id: Uuid) -> Result<bool, StoreError> {
        // product_details rows go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }
}
