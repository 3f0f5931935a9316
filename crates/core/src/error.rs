//! Error types for index operations
//!
//! The four variants are the complete failure taxonomy of the index:
//!
//! | Variant | Raised by | Class |
//! |---------|-----------|-------|
//! | DuplicateKey | insert | business |
//! | NotFound | update, delete | business |
//! | Conflict | update, delete | business, retryable |
//! | Capacity | insert, growth | fatal |
//!
//! Business failures are returned to the caller of the surrounding operation.
//! Fatal failures should abort the encompassing transaction.

use crate::types::RevisionId;
use thiserror::Error;

/// Result type for index operations
pub type Result<T> = std::result::Result<T, IndexError>;

/// Failure of an index operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// A revision of the key is already visible to the inserting transaction
    #[error("duplicate key: {key}")]
    DuplicateKey {
        /// The conflicting key
        key: String,
    },

    /// No revision of the key is visible to the transaction
    #[error("document not found: {key}")]
    NotFound {
        /// The missing key
        key: String,
    },

    /// The key was modified by a transaction the caller did not see
    #[error("revision conflict on {key}: found {actual}")]
    Conflict {
        /// The contended key
        key: String,
        /// Revision the caller based its write on, when it named one
        expected: Option<RevisionId>,
        /// Revision found in the index
        actual: RevisionId,
    },

    /// The slot array is full or could not be grown
    #[error("index capacity exhausted: {used} of {capacity} slots in use")]
    Capacity {
        /// Occupied slots at the time of failure
        used: usize,
        /// Slot array size at the time of failure
        capacity: usize,
    },
}

impl IndexError {
    /// Conflicts may succeed when the transaction is retried with fresh reads
    pub fn is_retryable(&self) -> bool {
        matches!(self, IndexError::Conflict { .. })
    }

    /// Capacity failures should abort the encompassing transaction
    pub fn is_fatal(&self) -> bool {
        matches!(self, IndexError::Capacity { .. })
    }

    /// The key named by the error, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            IndexError::DuplicateKey { key }
            | IndexError::NotFound { key }
            | IndexError::Conflict { key, .. } => Some(key),
            IndexError::Capacity { .. } => None,
        }
    }
}
