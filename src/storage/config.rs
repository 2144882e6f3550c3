//! Storage configuration types and utilities

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{StorageError, StorageResult};

/// Storage backend type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// In-process store (default, used for tests and demos)
    #[default]
    Memory,
    /// CouchDB over HTTP
    Couch,
}

impl std::str::FromStr for BackendType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "couch" | "couchdb" => Ok(Self::Couch),
            other => Err(StorageError::configuration(format!(
                "Unknown storage backend: {}",
                other
            ))),
        }
    }
}

/// Main storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: BackendType,

    /// CouchDB connection settings, used when `backend = "couch"`
    #[serde(default)]
    pub couch: CouchConfig,
}

/// CouchDB connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchConfig {
    /// Server root URL
    #[serde(default = "default_couch_url")]
    pub url: String,

    /// Basic-auth user name
    #[serde(default)]
    pub username: Option<String>,

    /// Basic-auth password
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Per-request timeout
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for CouchConfig {
    fn default() -> Self {
        Self {
            url: default_couch_url(),
            username: None,
            password: None,
            timeout: default_timeout(),
        }
    }
}

fn default_couch_url() -> String {
    "http://couch:5984".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

impl StorageConfig {
    /// Apply `WORKFORCE_STORAGE_*` / `WORKFORCE_COUCH_*` overrides
    ///
    /// `lookup` abstracts the environment so callers and tests can supply
    /// their own source.
    pub fn apply_env<F>(&mut self, lookup: F) -> StorageResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("WORKFORCE_STORAGE_TYPE") {
            self.backend = backend.parse()?;
        }
        if let Some(url) = lookup("WORKFORCE_COUCH_URL") {
            self.couch.url = url;
        }
        if let Some(user) = lookup("WORKFORCE_COUCH_USER") {
            self.couch.username = Some(user);
        }
        if let Some(password) = lookup("WORKFORCE_COUCH_PASSWORD") {
            self.couch.password = Some(password);
        }
        if let Some(secs) = lookup("WORKFORCE_COUCH_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|e| {
                StorageError::configuration(format!("Invalid WORKFORCE_COUCH_TIMEOUT_SECS: {}", e))
            })?;
            self.couch.timeout = Duration::from_secs(secs);
        }
        Ok(())
    }
}
