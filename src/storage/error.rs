//! Error types for the document store layer

use std::fmt;
use thiserror::Error;

/// Result type for store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Store error taxonomy
#[derive(Error, Debug)]
pub enum StorageError {
    /// Document or collection not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Revision mismatch on a conditional write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Collection already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Store unreachable or returned a transport-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Store returned a shape that could not be interpreted
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Serialization of outgoing content failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    pub fn not_found<E: fmt::Display>(item: E) -> Self {
        Self::NotFound(item.to_string())
    }

    pub fn conflict<E: fmt::Display>(msg: E) -> Self {
        Self::Conflict(msg.to_string())
    }

    pub fn already_exists<E: fmt::Display>(msg: E) -> Self {
        Self::AlreadyExists(msg.to_string())
    }

    pub fn transport<E: fmt::Display>(msg: E) -> Self {
        Self::Transport(msg.to_string())
    }

    pub fn malformed<E: fmt::Display>(msg: E) -> Self {
        Self::Malformed(msg.to_string())
    }

    pub fn serialization<E: fmt::Display>(err: E) -> Self {
        Self::Serialization(err.to_string())
    }

    pub fn configuration<E: fmt::Display>(msg: E) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if the store could not be reached
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::malformed(err)
        } else {
            Self::transport(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::conflict("doc abc at 1-x");
        assert_eq!(err.to_string(), "Conflict: doc abc at 1-x");

        let err = StorageError::malformed("rows missing");
        assert_eq!(err.to_string(), "Malformed response: rows missing");
    }

    #[test]
    fn test_classification_helpers() {
        assert!(StorageError::conflict("x").is_conflict());
        assert!(!StorageError::conflict("x").is_not_found());
        assert!(StorageError::not_found("x").is_not_found());
        assert!(StorageError::transport("down").is_transport());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StorageError = json_err.into();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
