//! Application configuration
//!
//! Layered in order: TOML file, `WORKFORCE_*` environment variables, CLI flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::merge::MergeSettings;
use crate::model::CityPair;
use crate::modes::CollectionNames;
use crate::storage::StorageConfig;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP surface binds to
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Explicit tracing filter; overrides the verbosity flag
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub collections: CollectionNames,

    /// Cities asked about by the first query
    #[serde(default)]
    pub query: CityPair,

    #[serde(default)]
    pub merge: MergeSettings,

    /// JSON seed file replacing the built-in dataset
    #[serde(default)]
    pub seed_file: Option<PathBuf>,

    /// Verbosity from `-v` flags
    #[serde(skip)]
    pub verbose: u8,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_level: None,
            storage: StorageConfig::default(),
            collections: CollectionNames::default(),
            query: CityPair::default(),
            merge: MergeSettings::default(),
            seed_file: None,
            verbose: 0,
        }
    }
}

impl AppConfig {
    /// Read the TOML file if given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `WORKFORCE_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(listen) = lookup("WORKFORCE_LISTEN") {
            self.listen = listen;
        }
        if let Some(level) = lookup("WORKFORCE_LOG_LEVEL") {
            self.log_level = Some(level);
        }
        if let Some(name) = lookup("WORKFORCE_SEPARATE_COLLECTION") {
            self.collections.separate = name;
        }
        if let Some(name) = lookup("WORKFORCE_COMBINED_COLLECTION") {
            self.collections.combined = name;
        }
        if let Some(city) = lookup("WORKFORCE_HOME_CITY") {
            self.query.home_city = city;
        }
        if let Some(city) = lookup("WORKFORCE_WORK_CITY") {
            self.query.work_city = city;
        }
        if let Some(policy) = lookup("WORKFORCE_MERGE_POLICY") {
            self.merge.policy = policy.parse()?;
        }
        if let Some(limit) = lookup("WORKFORCE_MERGE_CONCURRENCY") {
            self.merge.concurrency = limit.parse().map_err(|e| {
                Error::Config(format!("Invalid WORKFORCE_MERGE_CONCURRENCY: {}", e))
            })?;
        }
        if let Some(path) = lookup("WORKFORCE_SEED_FILE") {
            self.seed_file = Some(PathBuf::from(path));
        }
        self.storage.apply_env(&lookup)?;
        Ok(())
    }

    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_listen(mut self, listen: impl Into<String>) -> Self {
        self.listen = listen.into();
        self
    }

    /// Tracing filter: the configured level, else derived from verbosity
    pub fn log_level(&self) -> String {
        if let Some(level) = &self.log_level {
            return level.clone();
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            2 => "trace",
            _ => "trace,hyper=debug,tower=debug",
        }
        .to_string()
    }
}
