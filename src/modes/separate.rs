//! Normalized layout: one collection of tagged records joined in memory

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::{InsertSummary, Mode, ModeService};
use crate::error::Result;
use crate::index::MatchPolicy;
use crate::join::JoinEvaluator;
use crate::model::{CityPair, Dataset, NormalizedRecord};
use crate::storage::{ensure_collection, CollectionSchema, DocumentStore, StorageError};

pub fn schema(collection: &str) -> CollectionSchema {
    CollectionSchema::plain(collection)
}

pub struct SeparateMode {
    store: Arc<dyn DocumentStore>,
    collection: String,
    cities: CityPair,
    join: JoinEvaluator,
}

impl SeparateMode {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        cities: CityPair,
        policy: MatchPolicy,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            cities,
            join: JoinEvaluator::new(policy),
        }
    }

    /// Read every record back and split it by kind
    pub async fn load(&self) -> Result<Dataset> {
        let docs = self.store.all_documents(&self.collection).await?;
        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            let record: NormalizedRecord = serde_json::from_value(doc.content).map_err(|e| {
                StorageError::malformed(format!("Record {} in {}: {}", doc.id, self.collection, e))
            })?;
            records.push(record);
        }
        Ok(Dataset::from_records(records))
    }
}

#[async_trait]
impl ModeService for SeparateMode {
    fn mode(&self) -> Mode {
        Mode::Separate
    }

    async fn create(&self) -> Result<bool> {
        let created = ensure_collection(self.store.as_ref(), &schema(&self.collection)).await?;
        info!("Collection {} ready (created: {})", self.collection, created);
        Ok(created)
    }

    async fn insert(&self, dataset: &Dataset) -> Result<InsertSummary> {
        let mut inserted = 0;
        for record in dataset.to_records() {
            let receipt = self
                .store
                .insert(&self.collection, &serde_json::to_value(&record)?)
                .await?;
            debug!("Inserted {} record {}", record.kind(), receipt.id);
            inserted += 1;
        }
        info!("Inserted {} record(s) into {}", inserted, self.collection);
        Ok(InsertSummary {
            inserted,
            merge: None,
        })
    }

    async fn query_a(&self) -> Result<Vec<String>> {
        let dataset = self.load().await?;
        self.join.query_a(&dataset, &self.cities)
    }

    async fn query_b(&self) -> Result<Vec<u64>> {
        let dataset = self.load().await?;
        self.join.query_b(&dataset)
    }
}
