//! Unified error types for docindex.
//!
//! This module wraps the errors of the index, transaction and configuration
//! layers and presents a consistent interface to users.

use docindex_concurrency::TransactionError;
use docindex_core::IndexError;
use docindex_storage::{ConfigError, IndexInitError};
use thiserror::Error;

/// All docindex errors.
///
/// This is the canonical error type for all collection operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No revision of the document is visible to the transaction
    #[error("not found: {0}")]
    NotFound(String),

    /// A revision of the document is already visible to the transaction
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Another transaction modified the document first
    #[error("conflict: {0}")]
    Conflict(String),

    /// The index cannot hold another revision
    #[error("capacity exhausted: {0}")]
    Capacity(String),

    /// The transaction is committed, aborted or unknown
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for docindex operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Retryable errors (conflicts) may succeed when the transaction is
    /// restarted with fresh reads.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Check if this is a serious error.
    ///
    /// The encompassing transaction should be aborted.
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Capacity(_))
    }
}

// Convert from index errors
impl From<IndexError> for Error {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::DuplicateKey { key } => Error::DuplicateKey(key),
            IndexError::NotFound { key } => Error::NotFound(key),
            IndexError::Conflict {
                key,
                expected: Some(expected),
                actual,
            } => Error::Conflict(format!(
                "revision conflict on {}: expected {}, got {}",
                key, expected, actual
            )),
            conflict @ IndexError::Conflict { .. } => Error::Conflict(conflict.to_string()),
            capacity @ IndexError::Capacity { .. } => Error::Capacity(capacity.to_string()),
        }
    }
}

impl From<TransactionError> for Error {
    fn from(e: TransactionError) -> Self {
        Error::Transaction(e.to_string())
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

impl From<IndexInitError> for Error {
    fn from(e: IndexInitError) -> Self {
        match e {
            IndexInitError::Config(config) => config.into(),
            alloc @ IndexInitError::Allocation { .. } => Error::Capacity(alloc.to_string()),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
