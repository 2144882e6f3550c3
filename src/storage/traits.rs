//! Core trait definition for the document store capability

use async_trait::async_trait;
use serde_json::Value;

use super::error::StorageResult;
use super::schema::CollectionSchema;
use super::types::*;

/// Document store capability shared by every component
///
/// Constructed once at startup and passed around as `Arc<dyn DocumentStore>`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Check whether a collection exists
    async fn exists(&self, collection: &str) -> StorageResult<bool>;

    /// Create a collection and install its indexes and aggregates
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the collection exists.
    async fn create(&self, schema: &CollectionSchema) -> StorageResult<()>;

    /// Insert a new document, returning its store-assigned identity and revision
    async fn insert(&self, collection: &str, content: &Value) -> StorageResult<WriteReceipt>;

    /// Exact-key lookup through a secondary index
    ///
    /// Matches are returned in index order. A key with no match yields an
    /// empty vector, never an error.
    async fn get_by_index(
        &self,
        collection: &str,
        index: &str,
        key: &str,
    ) -> StorageResult<Vec<StoredDocument>>;

    /// Conditional write: replace the content of `id` if its current revision
    /// is `expected`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if `expected` is stale; the document
    /// is left unchanged.
    async fn put(
        &self,
        collection: &str,
        id: &DocumentId,
        content: &Value,
        expected: &Revision,
    ) -> StorageResult<Revision>;

    /// Read the rows emitted by a named aggregate
    async fn read_aggregate(&self, collection: &str, aggregate: &str) -> StorageResult<Vec<Value>>;

    /// Every document of a collection, in insertion order where the backend
    /// can provide it
    async fn all_documents(&self, collection: &str) -> StorageResult<Vec<StoredDocument>>;

    /// Check the health of the backend
    async fn health_check(&self) -> StorageResult<HealthStatus>;
}
