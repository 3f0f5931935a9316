//! Document revision records
//!
//! A [`RevisionRecord`] is one version of one document. Records are owned by
//! the document store and shared with the index through [`RevisionHandle`];
//! the index never decides when a record's memory is released.
//!
//! ## Validity interval
//!
//! ```text
//! valid_from = creating transaction (set once)
//! valid_to   = retiring transaction, or 0 while the revision is current
//! ```
//!
//! `valid_to` is the only field that changes after a record is published.
//! It is written by the index while the index write lock is held, which is
//! what makes the single store race-free. The atomic exists so that shared
//! handles are `Sync`, not to provide synchronization of its own.

use crate::types::{RevisionId, TxnId};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared, non-owning (from the index's point of view) reference to a revision
pub type RevisionHandle = Arc<RevisionRecord>;

/// One revision of a document
#[derive(Debug)]
pub struct RevisionRecord {
    key: String,
    valid_from: TxnId,
    valid_to: AtomicU64,
    revision_id: RevisionId,
    payload: Value,
}

impl RevisionRecord {
    /// Create a live revision created by `valid_from`
    pub fn new(
        key: impl Into<String>,
        valid_from: TxnId,
        revision_id: RevisionId,
        payload: Value,
    ) -> Self {
        Self {
            key: key.into(),
            valid_from,
            valid_to: AtomicU64::new(0),
            revision_id,
            payload,
        }
    }

    /// Wrap into a shareable handle
    pub fn into_handle(self) -> RevisionHandle {
        Arc::new(self)
    }

    /// Document key
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Creating transaction
    #[inline]
    pub fn valid_from(&self) -> TxnId {
        self.valid_from
    }

    /// Retiring transaction, [`TxnId::NONE`] while current
    #[inline]
    pub fn valid_to(&self) -> TxnId {
        TxnId::new(self.valid_to.load(Ordering::Acquire))
    }

    /// Revision stamp
    #[inline]
    pub fn revision_id(&self) -> RevisionId {
        self.revision_id
    }

    /// Document body
    #[inline]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// True while no transaction has retired this revision
    #[inline]
    pub fn is_current(&self) -> bool {
        self.valid_to().is_none()
    }

    /// Stamp the retiring transaction.
    ///
    /// Callers must hold the write lock of the index the record is published
    /// in. Passing [`TxnId::NONE`] clears a retirement (rollback).
    pub fn set_valid_to(&self, txn: TxnId) {
        self.valid_to.store(txn.as_u64(), Ordering::Release);
    }
}
