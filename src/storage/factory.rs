//! Storage factory for creating store instances

use std::sync::Arc;
use tracing::info;

use super::backends::{CouchBackend, MemoryBackend};
use super::config::{BackendType, StorageConfig};
use super::error::StorageResult;
use super::traits::DocumentStore;

/// Factory for creating store instances
pub struct StorageFactory;

impl StorageFactory {
    /// Create the configured store
    ///
    /// Called once at startup; the returned handle is shared by every
    /// component.
    pub fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn DocumentStore>> {
        match config.backend {
            BackendType::Memory => {
                info!("Using in-memory document store");
                Ok(Arc::new(MemoryBackend::new()))
            }
            BackendType::Couch => {
                info!("Using CouchDB document store at {}", config.couch.url);
                Ok(Arc::new(CouchBackend::new(&config.couch)?))
            }
        }
    }

    /// Create a test store instance (memory backend)
    #[cfg(test)]
    pub fn create_test_storage() -> Arc<dyn DocumentStore> {
        Arc::new(MemoryBackend::new())
    }
}
