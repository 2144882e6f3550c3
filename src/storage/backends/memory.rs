//! In-memory document store
//!
//! Keeps secondary indexes up to date on every write so lookups never scan a
//! collection. Index entries and aggregate rows come back in insertion order.

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::storage::{
    error::{StorageError, StorageResult},
    schema::CollectionSchema,
    traits::DocumentStore,
    types::*,
};

/// In-memory storage backend
#[derive(Clone, Default)]
pub struct MemoryBackend {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

struct Entry {
    seq: u64,
    generation: u64,
    rev: Revision,
    content: Value,
}

struct Collection {
    schema: CollectionSchema,
    next_seq: u64,
    documents: HashMap<DocumentId, Entry>,
    /// index name -> key -> (insertion seq, id), kept sorted by seq
    indexes: HashMap<String, HashMap<String, Vec<(u64, DocumentId)>>>,
}

impl Collection {
    fn new(schema: CollectionSchema) -> Self {
        let indexes = schema
            .indexes
            .iter()
            .map(|i| (i.name.clone(), HashMap::new()))
            .collect();
        Self {
            schema,
            next_seq: 0,
            documents: HashMap::new(),
            indexes,
        }
    }

    fn index_add(&mut self, seq: u64, id: &DocumentId, content: &Value) {
        for def in &self.schema.indexes {
            if let Some(key) = def.key_of(content) {
                let postings = self
                    .indexes
                    .entry(def.name.clone())
                    .or_default()
                    .entry(key)
                    .or_default();
                let pos = postings.partition_point(|(s, _)| *s < seq);
                postings.insert(pos, (seq, id.clone()));
            }
        }
    }

    fn index_remove(&mut self, id: &DocumentId, content: &Value) {
        for def in &self.schema.indexes {
            let Some(key) = def.key_of(content) else {
                continue;
            };
            if let Some(keys) = self.indexes.get_mut(&def.name) {
                if let Some(postings) = keys.get_mut(&key) {
                    postings.retain(|(_, doc)| doc != id);
                    if postings.is_empty() {
                        keys.remove(&key);
                    }
                }
            }
        }
    }

    fn stored(&self, id: &DocumentId) -> Option<StoredDocument> {
        self.documents.get(id).map(|entry| StoredDocument {
            id: id.clone(),
            rev: entry.rev.clone(),
            content: entry.content.clone(),
        })
    }

    fn in_insertion_order(&self) -> Vec<(&DocumentId, &Entry)> {
        let mut entries: Vec<_> = self.documents.iter().collect();
        entries.sort_by_key(|(_, e)| e.seq);
        entries
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// CouchDB-style revision: generation counter plus a content digest
fn make_revision(generation: u64, content: &Value) -> Revision {
    let mut hasher = Sha256::new();
    hasher.update(generation.to_be_bytes());
    hasher.update(content.to_string().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    Revision(format!("{}-{}", generation, &digest[..32]))
}

fn missing_collection(collection: &str) -> StorageError {
    StorageError::not_found(format!("Collection not found: {}", collection))
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn exists(&self, collection: &str) -> StorageResult<bool> {
        Ok(self.collections.read().await.contains_key(collection))
    }

    async fn create(&self, schema: &CollectionSchema) -> StorageResult<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(&schema.name) {
            return Err(StorageError::already_exists(format!(
                "Collection already exists: {}",
                schema.name
            )));
        }
        collections.insert(schema.name.clone(), Collection::new(schema.clone()));
        Ok(())
    }

    async fn insert(&self, collection: &str, content: &Value) -> StorageResult<WriteReceipt> {
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| missing_collection(collection))?;

        let id = DocumentId::generate();
        let seq = coll.next_seq;
        coll.next_seq += 1;
        let rev = make_revision(1, content);

        coll.index_add(seq, &id, content);
        coll.documents.insert(
            id.clone(),
            Entry {
                seq,
                generation: 1,
                rev: rev.clone(),
                content: content.clone(),
            },
        );

        Ok(WriteReceipt { id, rev })
    }

    async fn get_by_index(
        &self,
        collection: &str,
        index: &str,
        key: &str,
    ) -> StorageResult<Vec<StoredDocument>> {
        let collections = self.collections.read().await;
        let coll = collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;

        let keys = coll.indexes.get(index).ok_or_else(|| {
            StorageError::not_found(format!("Index not found: {}/{}", collection, index))
        })?;

        Ok(keys
            .get(key)
            .map(|postings| postings.iter().filter_map(|(_, id)| coll.stored(id)).collect())
            .unwrap_or_default())
    }

    async fn put(
        &self,
        collection: &str,
        id: &DocumentId,
        content: &Value,
        expected: &Revision,
    ) -> StorageResult<Revision> {
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| missing_collection(collection))?;

        let (seq, generation, old_content) = match coll.documents.get(id) {
            Some(entry) if entry.rev != *expected => {
                return Err(StorageError::conflict(format!(
                    "Document {} is at revision {}, write presented {}",
                    id, entry.rev, expected
                )));
            }
            Some(entry) => (entry.seq, entry.generation + 1, entry.content.clone()),
            None => {
                return Err(StorageError::not_found(format!("Document not found: {}", id)));
            }
        };

        let rev = make_revision(generation, content);
        coll.index_remove(id, &old_content);
        coll.index_add(seq, id, content);
        coll.documents.insert(
            id.clone(),
            Entry {
                seq,
                generation,
                rev: rev.clone(),
                content: content.clone(),
            },
        );

        Ok(rev)
    }

    async fn read_aggregate(&self, collection: &str, aggregate: &str) -> StorageResult<Vec<Value>> {
        let collections = self.collections.read().await;
        let coll = collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;

        let definition = coll.schema.aggregate(aggregate).ok_or_else(|| {
            StorageError::not_found(format!("Aggregate not found: {}/{}", collection, aggregate))
        })?;

        Ok(coll
            .in_insertion_order()
            .into_iter()
            .filter_map(|(_, entry)| definition.rule.emit(&entry.content))
            .collect())
    }

    async fn all_documents(&self, collection: &str) -> StorageResult<Vec<StoredDocument>> {
        let collections = self.collections.read().await;
        let coll = collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;

        Ok(coll
            .in_insertion_order()
            .into_iter()
            .map(|(id, entry)| StoredDocument {
                id: id.clone(),
                rev: entry.rev.clone(),
                content: entry.content.clone(),
            })
            .collect())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus {
            healthy: true,
            backend_type: "memory".to_string(),
            latency_ms: 0,
            errors: vec![],
        })
    }
}
