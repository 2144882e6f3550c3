//! The two storage layouts behind one service interface
//!
//! - [`separate`]: normalized records, answers joined in memory
//! - [`combined`]: denormalized records kept consistent by the merge engine,
//!   answers read from store aggregates

pub mod combined;
pub mod separate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::merge::{MergeReport, MergeSettings};
use crate::model::{CityPair, Dataset};
use crate::storage::DocumentStore;

pub use combined::CombinedMode;
pub use separate::SeparateMode;

/// Storage layout selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Separate,
    Combined,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Separate, Mode::Combined];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Separate => "separate",
            Mode::Combined => "combined",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "separate" => Ok(Mode::Separate),
            "combined" => Ok(Mode::Combined),
            other => Err(Error::Config(format!("Unknown mode: {}", other))),
        }
    }
}

/// Collection names, the `[collections]` configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionNames {
    #[serde(default = "default_separate")]
    pub separate: String,
    #[serde(default = "default_combined")]
    pub combined: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            separate: default_separate(),
            combined: default_combined(),
        }
    }
}

fn default_separate() -> String {
    "employment".to_string()
}

fn default_combined() -> String {
    "employment-combined".to_string()
}

/// What an insert did
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertSummary {
    pub inserted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeReport>,
}

/// Lifecycle and queries of one layout
#[async_trait]
pub trait ModeService: Send + Sync {
    fn mode(&self) -> Mode;

    /// Create the collection and its derived structures; `false` if it existed
    async fn create(&self) -> Result<bool>;

    async fn insert(&self, dataset: &Dataset) -> Result<InsertSummary>;

    /// Display names of people living in the home city and working in the work city
    async fn query_a(&self) -> Result<Vec<String>>;

    /// Salaries of people working in the city they live in
    async fn query_b(&self) -> Result<Vec<u64>>;
}

/// Both layouts over one shared store
#[derive(Clone)]
pub struct Services {
    separate: Arc<SeparateMode>,
    combined: Arc<CombinedMode>,
}

impl Services {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collections: &CollectionNames,
        cities: &CityPair,
        merge: &MergeSettings,
    ) -> Self {
        Self {
            separate: Arc::new(SeparateMode::new(
                Arc::clone(&store),
                &collections.separate,
                cities.clone(),
                merge.policy,
            )),
            combined: Arc::new(CombinedMode::new(
                store,
                &collections.combined,
                cities.clone(),
                merge.clone(),
            )),
        }
    }

    pub fn get(&self, mode: Mode) -> Arc<dyn ModeService> {
        match mode {
            Mode::Separate => Arc::clone(&self.separate) as Arc<dyn ModeService>,
            Mode::Combined => Arc::clone(&self.combined) as Arc<dyn ModeService>,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("separate".parse::<Mode>().unwrap(), Mode::Separate);
        assert_eq!(Mode::Combined.to_string(), "combined");
        assert!("both".parse::<Mode>().is_err());
    }

    #[test]
    fn test_collection_name_defaults() {
        let names: CollectionNames = toml::from_str("separate = \"people\"").unwrap();
        assert_eq!(names.separate, "people");
        assert_eq!(names.combined, "employment-combined");
    }

    #[tokio::test]
    async fn test_services_dispatch_by_mode() {
        let services = Services::new(
            Arc::new(MemoryBackend::new()),
            &CollectionNames::default(),
            &CityPair::default(),
            &MergeSettings::default(),
        );

        for mode in Mode::ALL {
            assert_eq!(services.get(mode).mode(), mode);
        }
    }
}
