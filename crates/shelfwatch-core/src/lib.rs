mod app_config;
mod config;
pub mod memory;
mod records;
pub mod store;

use thiserror::Error;

pub use app_config::{AppConfig, ExtractionConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use memory::MemoryStore;
pub use records::{DetailRecord, PersistedEntity, ScrapeDiagnostics, SourceRecord};
pub use store::{CatalogStore, StoreError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
