//! Common test utilities and helpers

#![allow(dead_code)]

use std::sync::Arc;

use workforce::index::MatchPolicy;
use workforce::merge::MergeSettings;
use workforce::model::{CityPair, Dataset, EmploymentLink, Organization, Person};
use workforce::modes::{CombinedMode, ModeService, SeparateMode};
use workforce::storage::{DocumentStore, MemoryBackend};

pub fn person(first: &str, mi: &str, last: &str, city: &str) -> Person {
    Person {
        first_name: first.to_string(),
        last_name: last.to_string(),
        middle_initial: mi.to_string(),
        street: "1 Main St".to_string(),
        city: city.to_string(),
        gender: "F".to_string(),
    }
}

pub fn org(name: &str, city: &str) -> Organization {
    Organization {
        organization_name: name.to_string(),
        city: city.to_string(),
    }
}

pub fn link(last: &str, organization: &str, salary: u64) -> EmploymentLink {
    EmploymentLink::new(last, organization, salary)
}

/// Both layouts over one fresh in-memory store
pub struct Layouts {
    pub store: Arc<dyn DocumentStore>,
    pub separate: SeparateMode,
    pub combined: CombinedMode,
}

impl Layouts {
    pub fn new(policy: MatchPolicy) -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryBackend::new());
        let cities = CityPair::default();
        Self {
            separate: SeparateMode::new(Arc::clone(&store), "employment", cities.clone(), policy),
            combined: CombinedMode::new(
                Arc::clone(&store),
                "employment-combined",
                cities,
                MergeSettings {
                    policy,
                    concurrency: 4,
                },
            ),
            store,
        }
    }

    /// Create both collections and ingest the dataset into each
    pub async fn load(policy: MatchPolicy, dataset: &Dataset) -> Self {
        let layouts = Self::new(policy);
        layouts.separate.create().await.unwrap();
        layouts.combined.create().await.unwrap();
        layouts.separate.insert(dataset).await.unwrap();
        let summary = layouts.combined.insert(dataset).await.unwrap();
        let report = summary.merge.unwrap();
        assert!(report.is_successful(), "{}", report.summary());
        layouts
    }
}

pub fn sorted<T: Ord>(mut values: Vec<T>) -> Vec<T> {
    values.sort();
    values
}
