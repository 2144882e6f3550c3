//! Reads the answers the store precomputes for the combined layout

use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::CityPair;
use crate::storage::{AggregateDefinition, AggregateRule, DocumentStore, StorageError};

/// A store-maintained aggregate with a checked row type
pub trait TypedAggregate {
    const NAME: &'static str;
    type Row: DeserializeOwned + Send;
}

/// `query-1`: display names of people living in one city and working in another
pub struct LivesInWorksIn;

impl TypedAggregate for LivesInWorksIn {
    const NAME: &'static str = "query-1";
    type Row = String;
}

impl LivesInWorksIn {
    pub fn definition(cities: &CityPair) -> AggregateDefinition {
        AggregateDefinition::new(
            Self::NAME,
            AggregateRule::DisplayNameByCities {
                cities: cities.clone(),
            },
        )
    }
}

/// `query-2`: salaries of people working in the city they live in
pub struct SameCitySalaries;

impl TypedAggregate for SameCitySalaries {
    const NAME: &'static str = "query-2";
    type Row = u64;
}

impl SameCitySalaries {
    pub fn definition() -> AggregateDefinition {
        AggregateDefinition::new(Self::NAME, AggregateRule::SalaryWhereCitiesMatch)
    }
}

#[derive(Clone)]
pub struct AggregateReader {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl AggregateReader {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Rows of an aggregate in store order, without further filtering
    pub async fn read<A: TypedAggregate>(&self) -> Result<Vec<A::Row>> {
        let rows = self.store.read_aggregate(&self.collection, A::NAME).await?;
        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| {
                    Error::from(StorageError::malformed(format!(
                        "{} row in {}: {}",
                        A::NAME,
                        self.collection,
                        e
                    )))
                })
            })
            .collect()
    }

    pub async fn query_a(&self) -> Result<Vec<String>> {
        self.read::<LivesInWorksIn>().await
    }

    pub async fn query_b(&self) -> Result<Vec<u64>> {
        self.read::<SameCitySalaries>().await
    }
}
