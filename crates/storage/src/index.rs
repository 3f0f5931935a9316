//! Versioned primary index
//!
//! Maps document keys to revision handles with MVCC visibility.
//!
//! # Design
//!
//! - One `parking_lot::RwLock` guards the slot array and its counters
//! - Lookups and scans take the lock shared; every mutation takes it
//!   exclusively for its whole duration, including the locate step, so
//!   "find the visible revision" and "mutate it" are one critical section
//! - Updates never free a slot: retiring a revision stamps `valid_to` and the
//!   new revision goes into a slot of its own. Only a revision created and
//!   discarded by the same transaction is physically removed.
//!
//! # Mutation paths
//!
//! | Path | When | Update | Delete |
//! |------|------|--------|--------|
//! | OwnUpdate | caller created the visible revision | overwrite slot | remove + compact |
//! | ForeignUpdate | another transaction created it | stamp `valid_to`, insert new | stamp `valid_to` |

use crate::config::{ConfigError, IndexConfig};
use crate::table::{InsertProbe, SlotTable};
use crate::visibility::is_visible;
use docindex_core::{
    IndexError, Result, RevisionHandle, RevisionRecord, TransactionContext, TxnId,
};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

/// How a mutation treats the revision it replaces
///
/// Decided once per update or delete from the visible revision's creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPath {
    /// The caller created the revision earlier in the same transaction.
    /// Nobody else can have seen it, so it is replaced or removed outright.
    OwnUpdate,
    /// A committed transaction created the revision. It is retired in place
    /// and stays readable for transactions that predate the caller.
    ForeignUpdate,
}

impl MutationPath {
    /// Pick the path for mutating `current` on behalf of `own`
    pub fn decide(own: TxnId, current: &RevisionRecord) -> Self {
        if current.valid_from() == own {
            MutationPath::OwnUpdate
        } else {
            MutationPath::ForeignUpdate
        }
    }
}

/// Occupancy snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Slot array size
    pub capacity: usize,
    /// Occupied slots
    pub used: usize,
    /// Revisions nobody has retired yet
    pub current: usize,
    /// Retired revisions still occupying a slot
    pub retired: usize,
}

/// Result of rolling back one transaction's writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RollbackSummary {
    /// Revisions created by the transaction and physically removed
    pub removed: usize,
    /// Revisions whose retirement by the transaction was undone
    pub restored: usize,
}

/// MVCC hash index over document revisions
///
/// The index holds shared handles to revisions but never decides their
/// lifetime; dropping the index releases the slot array only.
///
/// # Example
///
/// ```ignore
/// use docindex_storage::VersionedIndex;
///
/// let index = VersionedIndex::new();
/// index.insert(&txn, record)?;
/// let found = index.lookup(&txn, "users/1");
/// ```
pub struct VersionedIndex {
    table: RwLock<SlotTable>,
    config: IndexConfig,
}

impl VersionedIndex {
    /// Create an empty index with the default initial capacity
    pub fn new() -> Self {
        let config = IndexConfig::default();
        Self {
            table: RwLock::new(SlotTable::with_capacity(config.initial_capacity)),
            config,
        }
    }

    /// Create an empty index with explicit sizing
    pub fn with_config(config: IndexConfig) -> std::result::Result<Self, IndexInitError> {
        config.validate()?;
        let table = SlotTable::try_with_capacity(config.initial_capacity).map_err(|_| {
            IndexInitError::Allocation {
                capacity: config.initial_capacity,
            }
        })?;
        Ok(Self {
            table: RwLock::new(table),
            config,
        })
    }

    /// Sizing in effect
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Slot array size
    pub fn capacity(&self) -> usize {
        self.table.read().capacity()
    }

    /// Occupied slots, including retired revisions
    pub fn len(&self) -> usize {
        self.table.read().used()
    }

    /// True if no slot is occupied
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Revision of `key` visible to `ctx`
    ///
    /// Shared lock; concurrent lookups proceed in parallel.
    pub fn lookup<C>(&self, ctx: &C, key: &str) -> Option<RevisionHandle>
    where
        C: TransactionContext + ?Sized,
    {
        let table = self.table.read();
        table
            .find_visible(ctx, key)
            .and_then(|idx| table.get(idx).cloned())
    }

    /// Every revision visible to `ctx`, ordered by key
    pub fn visible<C>(&self, ctx: &C) -> Vec<RevisionHandle>
    where
        C: TransactionContext + ?Sized,
    {
        let mut results: Vec<_> = {
            let table = self.table.read();
            table
                .iter()
                .filter(|record| is_visible(ctx, record, record.key()))
                .cloned()
                .collect()
        };
        results.sort_by(|a, b| a.key().cmp(b.key()));
        results
    }

    /// Occupancy counters
    pub fn stats(&self) -> IndexStats {
        let table = self.table.read();
        let retired = table.iter().filter(|r| !r.is_current()).count();
        IndexStats {
            capacity: table.capacity(),
            used: table.used(),
            current: table.used() - retired,
            retired,
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Publish a new revision
    ///
    /// # Errors
    ///
    /// - `DuplicateKey` if a revision of the key is already visible to `ctx`
    /// - `Conflict` if another transaction holds an unseen live revision of it
    /// - `Capacity` if the table is full or cannot grow
    pub fn insert<C>(&self, ctx: &C, record: RevisionHandle) -> Result<()>
    where
        C: TransactionContext + ?Sized,
    {
        debug_assert_eq!(record.valid_from(), ctx.txn_id());
        debug_assert!(record.is_current());
        let mut table = self.table.write();
        self.insert_locked(&mut table, ctx, record)
    }

    /// Replace the revision of `record.key()` visible to `ctx`
    ///
    /// Returns the superseded revision. Ownership of an overwritten revision
    /// reverts to the document store.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no revision of the key is visible
    /// - `Conflict` if the visible revision was already retired by another
    ///   transaction, or the context's revision check fails
    /// - `Capacity` if the new revision cannot be placed
    pub fn update<C>(&self, ctx: &C, record: RevisionHandle) -> Result<RevisionHandle>
    where
        C: TransactionContext + ?Sized,
    {
        let own = ctx.txn_id();
        debug_assert_eq!(record.valid_from(), own);
        debug_assert!(record.is_current());

        let mut table = self.table.write();
        let (slot, old) = Self::locate(&table, ctx, record.key())?;
        Self::check_conflict(ctx, &old)?;

        match MutationPath::decide(own, &old) {
            MutationPath::OwnUpdate => {
                table.replace(slot, record);
            }
            MutationPath::ForeignUpdate => {
                old.set_valid_to(own);
                if let Err(err) = self.insert_locked(&mut table, ctx, record) {
                    old.set_valid_to(TxnId::NONE);
                    return Err(err);
                }
            }
        }
        Ok(old)
    }

    /// Remove the revision of `key` visible to `ctx`
    ///
    /// Returns the deleted revision.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no revision of the key is visible
    /// - `Conflict` as for [`update`](Self::update)
    pub fn delete<C>(&self, ctx: &C, key: &str) -> Result<RevisionHandle>
    where
        C: TransactionContext + ?Sized,
    {
        let own = ctx.txn_id();
        let mut table = self.table.write();
        let (slot, old) = Self::locate(&table, ctx, key)?;
        Self::check_conflict(ctx, &old)?;

        match MutationPath::decide(own, &old) {
            MutationPath::OwnUpdate => {
                table.remove_at(slot);
            }
            MutationPath::ForeignUpdate => {
                old.set_valid_to(own);
            }
        }
        Ok(old)
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Undo every write of the aborted transaction `txn`
    ///
    /// Revisions it created are physically removed; retirements it stamped
    /// are cleared. Call before the manager forgets the aborted id.
    pub fn rollback(&self, txn: TxnId) -> RollbackSummary {
        let mut table = self.table.write();

        let mut restored = 0;
        for record in table.iter() {
            if record.valid_to() == txn {
                record.set_valid_to(TxnId::NONE);
                restored += 1;
            }
        }
        let removed = table.remove_where(|r| r.valid_from() == txn).len();

        debug!(
            txn_id = txn.as_u64(),
            removed,
            restored,
            used = table.used(),
            "rolled back transaction"
        );
        RollbackSummary { removed, restored }
    }

    /// Physically remove revisions no transaction can see any more
    ///
    /// A revision is reclaimable when its retiring transaction has committed
    /// and is older than `horizon`, the oldest id any running or future
    /// transaction may still treat as uncommitted.
    ///
    /// Returns the number of removed revisions.
    pub fn vacuum<F>(&self, is_active: F, horizon: TxnId) -> usize
    where
        F: Fn(TxnId) -> bool,
    {
        let mut table = self.table.write();
        let removed = table
            .remove_where(|r| {
                let to = r.valid_to();
                !to.is_none() && !is_active(to) && to < horizon
            })
            .len();

        if removed > 0 {
            debug!(
                removed,
                used = table.used(),
                capacity = table.capacity(),
                "vacuumed retired revisions"
            );
        }
        removed
    }

    // ========================================================================
    // Internals (write lock held)
    // ========================================================================

    fn locate<C>(table: &SlotTable, ctx: &C, key: &str) -> Result<(usize, RevisionHandle)>
    where
        C: TransactionContext + ?Sized,
    {
        table
            .find_visible(ctx, key)
            .and_then(|idx| table.get(idx).map(|record| (idx, RevisionHandle::clone(record))))
            .ok_or_else(|| IndexError::NotFound {
                key: key.to_string(),
            })
    }

    fn check_conflict<C>(ctx: &C, current: &RevisionRecord) -> Result<()>
    where
        C: TransactionContext + ?Sized,
    {
        // Visible yet retired: an in-flight or later transaction got there first
        if !current.is_current() {
            return Err(IndexError::Conflict {
                key: current.key().to_string(),
                expected: None,
                actual: current.revision_id(),
            });
        }
        ctx.check_revision(current.key(), current.revision_id())
    }

    fn probe_vacant<C>(table: &SlotTable, ctx: &C, key: &str) -> Result<usize>
    where
        C: TransactionContext + ?Sized,
    {
        match table.probe_insert(ctx, key) {
            Some(InsertProbe::Vacant(idx)) => Ok(idx),
            Some(InsertProbe::Visible) => Err(IndexError::DuplicateKey {
                key: key.to_string(),
            }),
            Some(InsertProbe::HiddenWriter(actual)) => Err(IndexError::Conflict {
                key: key.to_string(),
                expected: None,
                actual,
            }),
            None => Err(Self::capacity_error(table)),
        }
    }

    fn insert_locked<C>(&self, table: &mut SlotTable, ctx: &C, record: RevisionHandle) -> Result<()>
    where
        C: TransactionContext + ?Sized,
    {
        if table.used() >= table.capacity() {
            return Err(Self::capacity_error(table));
        }

        let mut slot = Self::probe_vacant(table, ctx, record.key())?;

        // Keep the load factor at or below 50% once this record is placed
        if table.capacity() < 2 * (table.used() + 1) {
            match self.config.next_capacity(table.capacity()) {
                Some(new_capacity) => {
                    Self::grow(table, new_capacity)?;
                    slot = Self::probe_vacant(table, ctx, record.key())?;
                }
                None if table.used() + 1 < table.capacity() => {
                    warn!(
                        used = table.used(),
                        capacity = table.capacity(),
                        "index at max capacity, load factor above 50%"
                    );
                }
                None => return Err(Self::capacity_error(table)),
            }
        }

        table.place(slot, record);
        Ok(())
    }

    fn grow(table: &mut SlotTable, new_capacity: usize) -> Result<()> {
        let old_capacity = table.capacity();
        let grown = table.rehashed(new_capacity).map_err(|err| {
            warn!(
                old_capacity,
                new_capacity,
                used = table.used(),
                error = %err,
                "index growth failed"
            );
            Self::capacity_error(table)
        })?;
        *table = grown;
        debug!(old_capacity, new_capacity, used = table.used(), "index grown");
        Ok(())
    }

    fn capacity_error(table: &SlotTable) -> IndexError {
        IndexError::Capacity {
            used: table.used(),
            capacity: table.capacity(),
        }
    }
}

impl Default for VersionedIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VersionedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.read();
        f.debug_struct("VersionedIndex")
            .field("capacity", &table.capacity())
            .field("used", &table.used())
            .field("config", &self.config)
            .finish()
    }
}

/// Failure to create an index
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexInitError {
    /// The configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The initial slot array could not be allocated
    #[error("cannot allocate {capacity} index slots")]
    Allocation {
        /// Requested slot count
        capacity: usize,
    },
}
