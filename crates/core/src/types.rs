//! Core identifier types for the document index
//!
//! This module defines the identifiers used throughout the system:
//! - [`TxnId`]: Transaction-local identifier stamped into revision intervals
//! - [`RevisionId`]: Version stamp used for optimistic conflict detection
//! - [`CollectionId`]: Unique identifier for a document collection

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transaction-local identifier
///
/// Transaction ids are allocated monotonically by the transaction manager,
/// starting at 1. The value 0 is reserved as the "still current" sentinel
/// stored in a revision's `valid_to` field, see [`TxnId::NONE`].
///
/// # Examples
///
/// ```
/// use docindex_core::types::TxnId;
///
/// let id = TxnId::new(7);
/// assert!(!id.is_none());
/// assert!(TxnId::NONE.is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxnId(u64);

impl TxnId {
    /// Sentinel meaning "no transaction" / "still current"
    pub const NONE: TxnId = TxnId(0);

    /// Wrap a raw transaction id
    pub const fn new(raw: u64) -> Self {
        TxnId(raw)
    }

    /// Raw numeric value
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// True for the sentinel value 0
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for TxnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn#{}", self.0)
    }
}

impl From<u64> for TxnId {
    fn from(raw: u64) -> Self {
        TxnId(raw)
    }
}

/// Revision stamp of a document
///
/// Assigned monotonically by the document store when a revision record is
/// created. Two revisions of the same key never share a `RevisionId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RevisionId(u64);

impl RevisionId {
    /// Wrap a raw revision id
    pub const fn new(raw: u64) -> Self {
        RevisionId(raw)
    }

    /// Raw numeric value
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RevisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rev#{}", self.0)
    }
}

impl From<u64> for RevisionId {
    fn from(raw: u64) -> Self {
        RevisionId(raw)
    }
}

/// Unique identifier for a document collection
///
/// Used to tag log output so that events from several collections living in
/// one process can be told apart.
///
/// # Examples
///
/// ```
/// use docindex_core::types::CollectionId;
///
/// let id1 = CollectionId::new();
/// let id2 = CollectionId::new();
/// assert_ne!(id1, id2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(Uuid);

impl CollectionId {
    /// Create a new random CollectionId using UUID v4
    pub fn new() -> Self {
        CollectionId(Uuid::new_v4())
    }

    /// Create CollectionId from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        CollectionId(Uuid::from_bytes(bytes))
    }

    /// Get raw bytes representation
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for CollectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
