//! Transaction handle and its index-facing context
//!
//! A [`Transaction`] is owned by one worker thread for its whole lifetime.
//! It carries:
//! - Its local id (stamped into `valid_from` / `valid_to` of revisions)
//! - Its status (Active → Committed | Aborted)
//! - The revisions it observed per key, used for revision-conflict checks
//! - The ids that were uncommitted when it began, for "is active" queries
//!
//! Dropping a transaction that is still active aborts it.

use crate::manager::{ActiveTracking, TxnRegistry};
use chrono::{DateTime, Utc};
use docindex_core::{IndexError, RevisionId, TransactionContext, TxnId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Status of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing; reads and writes are allowed
    Active,
    /// Transaction committed; its writes are visible to others
    Committed,
    /// Transaction aborted; its writes are rolled back
    Aborted {
        /// Human-readable reason
        reason: String,
    },
}

impl TransactionStatus {
    /// Short name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            TransactionStatus::Active => "active",
            TransactionStatus::Committed => "committed",
            TransactionStatus::Aborted { .. } => "aborted",
        }
    }
}

/// Errors from transaction lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// Operation requires an active transaction
    #[error("transaction {txn_id} is not active ({state})")]
    NotActive {
        /// The transaction
        txn_id: TxnId,
        /// Its current state name
        state: &'static str,
    },

    /// The manager has no record of this transaction
    #[error("unknown transaction {0}")]
    Unknown(TxnId),
}

/// A running transaction
pub struct Transaction {
    txn_id: TxnId,
    pub(crate) status: TransactionStatus,
    started_at: DateTime<Utc>,
    /// Revision observed per key (reads, own writes, pinned expectations)
    observed: FxHashMap<String, RevisionId>,
    /// Ids in flight or awaiting rollback when this transaction began
    snapshot: FxHashSet<TxnId>,
    tracking: ActiveTracking,
    registry: Arc<TxnRegistry>,
}

impl Transaction {
    pub(crate) fn new(
        txn_id: TxnId,
        snapshot: FxHashSet<TxnId>,
        tracking: ActiveTracking,
        registry: Arc<TxnRegistry>,
    ) -> Self {
        Self {
            txn_id,
            status: TransactionStatus::Active,
            started_at: Utc::now(),
            observed: FxHashMap::default(),
            snapshot,
            tracking,
            registry,
        }
    }

    /// Local transaction id
    #[inline]
    pub fn id(&self) -> TxnId {
        self.txn_id
    }

    /// Current status
    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    /// Wall-clock start time
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// True while the transaction may read and write
    pub fn is_open(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Fail unless the transaction is active
    pub fn ensure_active(&self) -> Result<(), TransactionError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(TransactionError::NotActive {
                txn_id: self.txn_id,
                state: self.status.name(),
            })
        }
    }

    /// Remember the revision read (or written) for `key`
    ///
    /// Later writes to `key` are checked against this revision.
    pub fn record_read(&mut self, key: &str, revision: RevisionId) {
        self.observed.insert(key.to_string(), revision);
    }

    /// Pin the revision a subsequent update or delete of `key` must find
    pub fn expect_revision(&mut self, key: &str, revision: RevisionId) {
        self.record_read(key, revision);
    }

    /// Drop the remembered revision for `key` (after deleting it)
    pub fn forget(&mut self, key: &str) {
        self.observed.remove(key);
    }

    /// Revision remembered for `key`, if any
    pub fn observed_revision(&self, key: &str) -> Option<RevisionId> {
        self.observed.get(key).copied()
    }

    /// Number of keys with a remembered revision
    pub fn read_set_len(&self) -> usize {
        self.observed.len()
    }
}

impl TransactionContext for Transaction {
    fn txn_id(&self) -> TxnId {
        self.txn_id
    }

    fn is_active(&self, txn: TxnId) -> bool {
        match self.tracking {
            ActiveTracking::Tracked => self.snapshot.contains(&txn),
            ActiveTracking::Disabled => false,
        }
    }

    fn check_revision(&self, key: &str, current: RevisionId) -> docindex_core::Result<()> {
        match self.observed.get(key) {
            Some(&expected) if expected != current => Err(IndexError::Conflict {
                key: key.to_string(),
                expected: Some(expected),
                actual: current,
            }),
            _ => Ok(()),
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.is_open() && self.registry.abandon(self.txn_id) {
            debug!(txn_id = self.txn_id.as_u64(), "transaction dropped while active");
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("txn_id", &self.txn_id)
            .field("status", &self.status)
            .field("read_set", &self.observed.len())
            .finish()
    }
}
