//! Combined layout: one denormalized record per person
//!
//! Ingestion inserts the people, then hands the links and organizations to
//! the merge engine. Answers come straight from the `query-1` and `query-2`
//! aggregates, which are fixed at creation time for the configured cities.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::{InsertSummary, Mode, ModeService};
use crate::aggregate::{AggregateReader, LivesInWorksIn, SameCitySalaries};
use crate::error::Result;
use crate::index::{ByLastName, ByOrganization, TypedIndex};
use crate::merge::{MergeEngine, MergeSettings};
use crate::model::{CityPair, Dataset, DenormalizedEmploymentRecord};
use crate::storage::{ensure_collection, CollectionSchema, DocumentStore};

pub fn schema(collection: &str, cities: &CityPair) -> CollectionSchema {
    CollectionSchema::plain(collection)
        .with_index(ByLastName::definition())
        .with_index(ByOrganization::definition())
        .with_aggregate(LivesInWorksIn::definition(cities))
        .with_aggregate(SameCitySalaries::definition())
}

pub struct CombinedMode {
    store: Arc<dyn DocumentStore>,
    collection: String,
    cities: CityPair,
    engine: MergeEngine,
    aggregates: AggregateReader,
}

impl CombinedMode {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        cities: CityPair,
        settings: MergeSettings,
    ) -> Self {
        let collection = collection.into();
        Self {
            engine: MergeEngine::new(Arc::clone(&store), collection.clone(), settings),
            aggregates: AggregateReader::new(Arc::clone(&store), collection.clone()),
            store,
            collection,
            cities,
        }
    }
}

#[async_trait]
impl ModeService for CombinedMode {
    fn mode(&self) -> Mode {
        Mode::Combined
    }

    async fn create(&self) -> Result<bool> {
        let schema = schema(&self.collection, &self.cities);
        let created = ensure_collection(self.store.as_ref(), &schema).await?;
        info!("Collection {} ready (created: {})", self.collection, created);
        Ok(created)
    }

    async fn insert(&self, dataset: &Dataset) -> Result<InsertSummary> {
        let mut inserted = 0;
        for person in &dataset.people {
            let record = DenormalizedEmploymentRecord::from_person(person.clone());
            let receipt = self
                .store
                .insert(&self.collection, &serde_json::to_value(&record)?)
                .await?;
            debug!("Inserted {} as {}", person.display_name(), receipt.id);
            inserted += 1;
        }
        info!("Inserted {} record(s) into {}", inserted, self.collection);

        let report = self
            .engine
            .run(&dataset.links, &dataset.organizations)
            .await;
        Ok(InsertSummary {
            inserted,
            merge: Some(report),
        })
    }

    async fn query_a(&self) -> Result<Vec<String>> {
        self.aggregates.query_a().await
    }

    async fn query_b(&self) -> Result<Vec<u64>> {
        self.aggregates.query_b().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MatchPolicy;
    use crate::model::{EmploymentLink, Organization, Person};
    use crate::storage::MemoryBackend;

    fn person(first: &str, last: &str, city: &str) -> Person {
        Person {
            first_name: first.to_string(),
            last_name: last.to_string(),
            middle_initial: "A".to_string(),
            street: "1 Main".to_string(),
            city: city.to_string(),
            gender: "F".to_string(),
        }
    }

    fn org(name: &str, city: &str) -> Organization {
        Organization {
            organization_name: name.to_string(),
            city: city.to_string(),
        }
    }

    fn mode(store: Arc<dyn DocumentStore>) -> CombinedMode {
        CombinedMode::new(
            store,
            "employment-combined",
            CityPair::default(),
            MergeSettings::default(),
        )
    }

    #[test]
    fn test_schema_declares_indexes_and_aggregates() {
        let schema = schema("employment-combined", &CityPair::default());
        assert!(schema.index("by-name").is_some());
        assert!(schema.index("by-company").is_some());
        assert!(schema.aggregate("query-1").is_some());
        assert!(schema.aggregate("query-2").is_some());
    }

    #[tokio::test]
    async fn test_insert_merges_and_aggregates_answer() {
        let mode = mode(Arc::new(MemoryBackend::new()));
        mode.create().await.unwrap();

        let summary = mode
            .insert(&Dataset {
                people: vec![person("Jane", "Doe", "Lincoln"), person("Amy", "Lee", "Omaha")],
                organizations: vec![org("Acme", "Omaha"), org("Corp", "Omaha")],
                links: vec![
                    EmploymentLink::new("Doe", "Acme", 50000),
                    EmploymentLink::new("Lee", "Corp", 70000),
                ],
            })
            .await
            .unwrap();

        assert_eq!(summary.inserted, 2);
        let report = summary.merge.unwrap();
        assert!(report.is_successful());
        assert_eq!(report.records_patched, 2);

        assert_eq!(mode.query_a().await.unwrap(), vec!["Jane A. Doe".to_string()]);
        assert_eq!(mode.query_b().await.unwrap(), vec![70000]);
    }

    #[tokio::test]
    async fn test_partial_merge_failure_still_inserts() {
        let mode = CombinedMode::new(
            Arc::new(MemoryBackend::new()),
            "employment-combined",
            CityPair::default(),
            MergeSettings {
                policy: MatchPolicy::RequireUnique,
                concurrency: 2,
            },
        );
        mode.create().await.unwrap();

        let summary = mode
            .insert(&Dataset {
                people: vec![person("Jane", "Doe", "Omaha"), person("John", "Doe", "Omaha")],
                organizations: vec![org("Acme", "Omaha")],
                links: vec![EmploymentLink::new("Doe", "Acme", 50000)],
            })
            .await
            .unwrap();

        let report = summary.merge.unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(mode.query_b().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_dataset_answers_nothing() {
        let mode = mode(Arc::new(MemoryBackend::new()));
        mode.create().await.unwrap();
        mode.insert(&Dataset::default()).await.unwrap();

        assert!(mode.query_a().await.unwrap().is_empty());
        assert!(mode.query_b().await.unwrap().is_empty());
    }
}
