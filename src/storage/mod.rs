//! Document store abstraction
//!
//! Every component talks to the store through the [`DocumentStore`] trait.
//! The handle is created once by [`StorageFactory`] and passed explicitly.

pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod schema;
pub mod traits;
pub mod types;


pub use backends::{CouchBackend, MemoryBackend};
pub use config::{BackendType, CouchConfig, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use factory::StorageFactory;
pub use schema::{AggregateDefinition, AggregateRule, CollectionSchema, IndexDefinition};
pub use traits::DocumentStore;
pub use types::{DocumentId, HealthStatus, Revision, StoredDocument, WriteReceipt};

/// Create the collection unless it already exists
///
/// Returns `true` when the collection was created by this call.
pub async fn ensure_collection(
    store: &dyn DocumentStore,
    schema: &CollectionSchema,
) -> StorageResult<bool> {
    if store.exists(&schema.name).await? {
        return Ok(false);
    }
    match store.create(schema).await {
        Ok(()) => Ok(true),
        // lost a race with another creator
        Err(StorageError::AlreadyExists(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
