//! Transaction manager for allocating ids and tracking commit state
//!
//! Provides the "is this transaction still uncommitted" answer that the
//! index visibility predicate depends on:
//! 1. `begin()` allocates an id, snapshots the uncommitted set and registers
//!    the id as in flight, all under one registry lock
//! 2. `commit()` removes it; its writes become visible to transactions that
//!    begin afterwards
//! 3. `abort()` moves it to the aborted set; it stays uncommitted until the
//!    collection has rolled its writes back and calls `forget_aborted()`
//!
//! ## Lifecycle
//!
//! ```text
//! begin ──► Active ──commit──► Committed
//!              │
//!              └──abort──► Aborted ──rollback + forget_aborted──► (gone)
//! ```
//!
//! Aborted ids are reported as uncommitted so that a reader racing with the
//! rollback never observes a write that is about to disappear.
//!
//! A transaction dropped while still active is aborted on the spot and
//! queued as abandoned; the collection rolls it back on its next vacuum.

use crate::transaction::{Transaction, TransactionError, TransactionStatus};
use docindex_core::TxnId;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// How "is transaction active" queries are answered
///
/// `Tracked` answers from the set of uncommitted ids captured when the asking
/// transaction began, which isolates concurrent uncommitted writers.
/// `Disabled` always answers "not active", which is only correct when at most
/// one writer runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveTracking {
    /// Consult the begin-time snapshot of in-flight and aborted transactions
    #[default]
    Tracked,
    /// Treat every other transaction as committed
    Disabled,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// In-flight ids, each mapped to the oldest id that was in flight when
    /// it began (its snapshot low-water mark)
    active: BTreeMap<TxnId, TxnId>,
    /// Aborted ids whose writes may still be in the index
    aborted: FxHashSet<TxnId>,
    /// Subset of `aborted` dropped without commit or abort; nobody else
    /// will roll these back
    abandoned: Vec<TxnId>,
}

/// Registry of uncommitted transactions
#[derive(Debug, Default)]
pub(crate) struct TxnRegistry {
    state: RwLock<RegistryState>,
    total_abandoned: AtomicU64,
}

impl TxnRegistry {
    /// True if `txn` is in flight or aborted
    fn is_uncommitted(&self, txn: TxnId) -> bool {
        let state = self.state.read();
        state.active.contains_key(&txn) || state.aborted.contains(&txn)
    }

    /// Allocate the next id and capture the ids it must treat as uncommitted
    ///
    /// Allocation and capture share the write lock; otherwise a smaller id
    /// could register after the snapshot and be mistaken for committed.
    fn register(&self, next_txn_id: &AtomicU64) -> (TxnId, FxHashSet<TxnId>) {
        let mut state = self.state.write();
        let txn_id = TxnId::new(next_txn_id.fetch_add(1, Ordering::SeqCst));
        let snapshot: FxHashSet<TxnId> = state
            .active
            .keys()
            .chain(state.aborted.iter())
            .copied()
            .collect();
        let low_water = state.active.keys().next().copied().unwrap_or(txn_id);
        state.active.insert(txn_id, low_water);
        (txn_id, snapshot)
    }

    fn complete(&self, txn: TxnId) -> bool {
        self.state.write().active.remove(&txn).is_some()
    }

    fn mark_aborted(&self, txn: TxnId) -> bool {
        let mut state = self.state.write();
        let was_active = state.active.remove(&txn).is_some();
        if was_active {
            state.aborted.insert(txn);
        }
        was_active
    }

    /// Abort a transaction that went away while active
    pub(crate) fn abandon(&self, txn: TxnId) -> bool {
        let mut state = self.state.write();
        if state.active.remove(&txn).is_none() {
            return false;
        }
        state.aborted.insert(txn);
        state.abandoned.push(txn);
        self.total_abandoned.fetch_add(1, Ordering::Relaxed);
        true
    }

    fn take_abandoned(&self) -> Vec<TxnId> {
        std::mem::take(&mut self.state.write().abandoned)
    }

    fn forget_aborted(&self, txn: TxnId) -> bool {
        self.state.write().aborted.remove(&txn)
    }

    /// Oldest snapshot low-water mark, or the next id to be handed out
    ///
    /// Read under the registry lock that `register` allocates ids under, so a
    /// transaction beginning after this call always gets an id at or above
    /// the returned value.
    fn horizon(&self, next_txn_id: &AtomicU64) -> TxnId {
        let state = self.state.read();
        state
            .active
            .values()
            .min()
            .copied()
            .unwrap_or_else(|| TxnId::new(next_txn_id.load(Ordering::SeqCst)))
    }

    fn counts(&self) -> (usize, usize) {
        let state = self.state.read();
        (state.active.len(), state.aborted.len())
    }
}

/// Transaction counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TransactionMetrics {
    /// Total committed transactions
    pub total_committed: u64,
    /// Total aborted transactions
    pub total_aborted: u64,
    /// Transactions dropped while active
    pub total_abandoned: u64,
    /// Currently in-flight transactions
    pub active_count: usize,
    /// Aborted transactions not yet rolled back
    pub pending_rollback: usize,
}

/// Manages transaction ids and commit state
///
/// # Thread Safety
///
/// Id allocation is a single atomic increment. Registry updates take a short
/// write lock; "is active" queries from index probes take the read lock, so
/// concurrent readers never block each other.
pub struct TransactionManager {
    /// Next transaction ID
    ///
    /// Starts at 1; 0 is the "still current" sentinel in revision records.
    next_txn_id: AtomicU64,

    registry: Arc<TxnRegistry>,

    tracking: ActiveTracking,

    committed: AtomicU64,
    aborted: AtomicU64,
}

impl TransactionManager {
    /// Create a manager with registry-backed tracking
    pub fn new() -> Self {
        Self::with_tracking(ActiveTracking::Tracked)
    }

    /// Create a manager with the given tracking mode
    pub fn with_tracking(tracking: ActiveTracking) -> Self {
        Self::with_txn_id(tracking, 0)
    }

    /// Create a manager whose first transaction gets `max_txn_id + 1`
    ///
    /// Lets a collection that was populated by earlier transactions keep
    /// handing out strictly larger ids.
    pub fn with_txn_id(tracking: ActiveTracking, max_txn_id: u64) -> Self {
        TransactionManager {
            next_txn_id: AtomicU64::new(max_txn_id + 1),
            registry: Arc::new(TxnRegistry::default()),
            tracking,
            committed: AtomicU64::new(0),
            aborted: AtomicU64::new(0),
        }
    }

    /// Tracking mode in effect
    pub fn tracking(&self) -> ActiveTracking {
        self.tracking
    }

    /// Id the next `begin()` will receive
    pub fn peek_next_txn_id(&self) -> TxnId {
        TxnId::new(self.next_txn_id.load(Ordering::SeqCst))
    }

    /// Start a transaction
    ///
    /// The transaction treats every id that is in flight or awaiting rollback
    /// at this moment as uncommitted for its whole lifetime.
    pub fn begin(&self) -> Transaction {
        let (txn_id, snapshot) = self.registry.register(&self.next_txn_id);
        debug!(
            txn_id = txn_id.as_u64(),
            concurrent = snapshot.len(),
            "transaction started"
        );
        let snapshot = match self.tracking {
            ActiveTracking::Tracked => snapshot,
            ActiveTracking::Disabled => FxHashSet::default(),
        };
        Transaction::new(txn_id, snapshot, self.tracking, Arc::clone(&self.registry))
    }

    /// Commit a transaction
    ///
    /// After this returns, readers treat the transaction's creations and
    /// retirements as committed.
    pub fn commit(&self, txn: &mut Transaction) -> Result<TxnId, TransactionError> {
        txn.ensure_active()?;
        if !self.registry.complete(txn.id()) {
            return Err(TransactionError::Unknown(txn.id()));
        }
        txn.status = TransactionStatus::Committed;
        self.committed.fetch_add(1, Ordering::Relaxed);

        let elapsed = chrono::Utc::now() - txn.started_at();
        debug!(
            txn_id = txn.id().as_u64(),
            elapsed_us = elapsed.num_microseconds().unwrap_or(i64::MAX),
            read_set = txn.read_set_len(),
            "transaction committed"
        );
        Ok(txn.id())
    }

    /// Abort a transaction
    ///
    /// The id stays uncommitted until [`forget_aborted`](Self::forget_aborted)
    /// is called after its writes were rolled back.
    pub fn abort(&self, txn: &mut Transaction, reason: impl Into<String>) -> Result<(), TransactionError> {
        txn.ensure_active()?;
        if !self.registry.mark_aborted(txn.id()) {
            return Err(TransactionError::Unknown(txn.id()));
        }
        let reason = reason.into();
        info!(txn_id = txn.id().as_u64(), %reason, "transaction aborted");
        txn.status = TransactionStatus::Aborted { reason };
        self.aborted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Drop an aborted id once none of its writes remain in any index
    pub fn forget_aborted(&self, txn: TxnId) -> bool {
        self.registry.forget_aborted(txn)
    }

    /// Take the ids of transactions dropped while active
    ///
    /// Each returned id is still reported as uncommitted; the caller rolls
    /// its writes back and then calls [`forget_aborted`](Self::forget_aborted).
    pub fn take_abandoned(&self) -> Vec<TxnId> {
        self.registry.take_abandoned()
    }

    /// True if `txn` is in flight or aborted
    pub fn is_active(&self, txn: TxnId) -> bool {
        match self.tracking {
            ActiveTracking::Tracked => self.registry.is_uncommitted(txn),
            ActiveTracking::Disabled => false,
        }
    }

    /// Garbage collection horizon
    ///
    /// Revisions retired by a committed transaction older than this are
    /// invisible to every running transaction and to every transaction that
    /// begins later. With nothing running it is the next id to be handed out.
    pub fn horizon(&self) -> TxnId {
        self.registry.horizon(&self.next_txn_id)
    }

    /// Snapshot of the counters
    pub fn metrics(&self) -> TransactionMetrics {
        let (active_count, pending_rollback) = self.registry.counts();
        TransactionMetrics {
            total_committed: self.committed.load(Ordering::Relaxed),
            total_aborted: self.aborted.load(Ordering::Relaxed),
            total_abandoned: self.registry.total_abandoned.load(Ordering::Relaxed),
            active_count,
            pending_rollback,
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("next_txn_id", &self.peek_next_txn_id())
            .field("tracking", &self.tracking)
            .field("metrics", &self.metrics())
            .finish()
    }
}
