use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// More than one record matched a key under the require-unique policy
    #[error("Ambiguous key: {matches} records match {key:?} in {index}")]
    Ambiguous {
        index: String,
        key: String,
        matches: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Seed data error: {0}")]
    Seed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub fn ambiguous(index: impl Into<String>, key: impl Into<String>, matches: usize) -> Self {
        Error::Ambiguous {
            index: index.into(),
            key: key.into(),
            matches,
        }
    }

    /// Revision mismatch on a conditional write
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Storage(e) if e.is_conflict())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Storage(e) if e.is_not_found())
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Error::Ambiguous { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
