//! Transactional document collection.

use crate::config::CollectionConfig;
use crate::error::{Error, Result};
use crate::revisions::RevisionStore;
use docindex_concurrency::{ActiveTracking, Transaction, TransactionManager, TransactionMetrics};
use docindex_core::{CollectionId, RevisionHandle, RevisionId, TxnId};
use docindex_storage::{IndexStats, RollbackSummary, VersionedIndex};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// A document as seen by one transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Document key
    pub key: String,
    /// Revision the body belongs to
    pub revision: RevisionId,
    /// Document body
    pub body: Value,
}

impl From<&RevisionHandle> for Document {
    fn from(record: &RevisionHandle) -> Self {
        Self {
            key: record.key().to_string(),
            revision: record.revision_id(),
            body: record.payload().clone(),
        }
    }
}

/// Collection statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    /// Primary index occupancy
    pub index: IndexStats,
    /// Transaction counters
    pub transactions: TransactionMetrics,
    /// Revisions held in memory, including those only kept for old readers
    pub stored_revisions: usize,
}

/// Outcome of [`DocumentCollection::vacuum`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VacuumReport {
    /// Dropped transactions whose writes were rolled back
    pub rolled_back: usize,
    /// Retired revisions removed from the index
    pub reclaimed: usize,
    /// Revisions freed from memory
    pub released: usize,
}

/// A named set of JSON documents with snapshot-isolated transactions.
///
/// Every read and write goes through a [`Transaction`] obtained from
/// [`begin`](Self::begin). A transaction sees its own writes plus the writes
/// of smaller ids that had committed when it began.
///
/// # Example
///
/// ```ignore
/// use docindex::prelude::*;
///
/// let users = DocumentCollection::new("users");
///
/// let mut txn = users.begin();
/// users.insert(&mut txn, "alice", json!({"age": 31}))?;
/// users.commit(&mut txn)?;
/// ```
pub struct DocumentCollection {
    id: CollectionId,
    name: String,
    index: VersionedIndex,
    manager: TransactionManager,
    store: RevisionStore,
}

impl DocumentCollection {
    /// Create a collection with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_parts(
            name.into(),
            VersionedIndex::new(),
            TransactionManager::new(),
        )
    }

    /// Create a builder for collection configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let docs = DocumentCollection::builder("docs")
    ///     .initial_capacity(4096)
    ///     .build()?;
    /// ```
    pub fn builder(name: impl Into<String>) -> CollectionBuilder {
        CollectionBuilder::new(name)
    }

    fn from_parts(name: String, index: VersionedIndex, manager: TransactionManager) -> Self {
        let id = CollectionId::new();
        debug!(%name, collection_id = %id, capacity = index.capacity(), "collection created");
        Self {
            id,
            name,
            index,
            manager,
            store: RevisionStore::new(),
        }
    }

    /// Collection identity
    pub fn id(&self) -> CollectionId {
        self.id
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Start a transaction.
    pub fn begin(&self) -> Transaction {
        self.manager.begin()
    }

    /// Commit a transaction, publishing its writes to later transactions.
    pub fn commit(&self, txn: &mut Transaction) -> Result<TxnId> {
        Ok(self.manager.commit(txn)?)
    }

    /// Abort a transaction and undo its writes.
    pub fn abort(&self, txn: &mut Transaction, reason: impl Into<String>) -> Result<RollbackSummary> {
        self.manager.abort(txn, reason)?;
        let summary = self.index.rollback(txn.id());
        self.manager.forget_aborted(txn.id());
        Ok(summary)
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Create a document.
    ///
    /// Returns the new revision.
    ///
    /// # Errors
    ///
    /// - `DuplicateKey` if the transaction already sees a document at `key`
    /// - `Conflict` if an unseen transaction created one concurrently
    pub fn insert(&self, txn: &mut Transaction, key: &str, body: Value) -> Result<RevisionId> {
        txn.ensure_active()?;
        let record = self.store.create(key, txn.id(), body);
        let revision = record.revision_id();
        if let Err(e) = self.index.insert(&*txn, Arc::clone(&record)) {
            self.store.discard(&record);
            return Err(e.into());
        }
        txn.record_read(key, revision);
        Ok(revision)
    }

    /// Read a document.
    ///
    /// The revision read is remembered; a later update or delete of the same
    /// key in this transaction fails with a conflict if it changed meanwhile.
    pub fn get(&self, txn: &mut Transaction, key: &str) -> Result<Option<Document>> {
        txn.ensure_active()?;
        let found = self.index.lookup(&*txn, key);
        if let Some(record) = &found {
            txn.record_read(key, record.revision_id());
        }
        Ok(found.as_ref().map(Document::from))
    }

    /// Replace a document's body.
    ///
    /// Returns the new revision.
    pub fn update(&self, txn: &mut Transaction, key: &str, body: Value) -> Result<RevisionId> {
        txn.ensure_active()?;
        let record = self.store.create(key, txn.id(), body);
        let revision = record.revision_id();
        let previous = match self.index.update(&*txn, Arc::clone(&record)) {
            Ok(previous) => previous,
            Err(e) => {
                self.store.discard(&record);
                return Err(e.into());
            }
        };
        debug!(
            txn_id = txn.id().as_u64(),
            key,
            from = %previous.revision_id(),
            to = %revision,
            "document updated"
        );
        txn.record_read(key, revision);
        Ok(revision)
    }

    /// Delete a document.
    ///
    /// Returns the deleted revision.
    pub fn remove(&self, txn: &mut Transaction, key: &str) -> Result<RevisionId> {
        txn.ensure_active()?;
        let removed = self.index.delete(&*txn, key)?;
        txn.forget(key);
        Ok(removed.revision_id())
    }

    /// Check whether the transaction sees a document at `key`.
    pub fn contains(&self, txn: &Transaction, key: &str) -> Result<bool> {
        txn.ensure_active()?;
        Ok(self.index.lookup(txn, key).is_some())
    }

    /// Every document visible to the transaction, ordered by key.
    pub fn all(&self, txn: &Transaction) -> Result<Vec<Document>> {
        txn.ensure_active()?;
        Ok(self.index.visible(txn).iter().map(Document::from).collect())
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Reclaim revisions no running transaction can see.
    ///
    /// Writes of transactions dropped without commit or abort are rolled back
    /// first.
    pub fn vacuum(&self) -> VacuumReport {
        let abandoned = self.manager.take_abandoned();
        for &txn in &abandoned {
            let summary = self.index.rollback(txn);
            self.manager.forget_aborted(txn);
            debug!(
                txn_id = txn.as_u64(),
                removed = summary.removed,
                restored = summary.restored,
                "rolled back dropped transaction"
            );
        }

        let horizon = self.manager.horizon();
        let reclaimed = self
            .index
            .vacuum(|txn| self.manager.is_active(txn), horizon);
        let released = self.store.release_unreferenced();

        info!(
            collection = %self.name,
            horizon = horizon.as_u64(),
            rolled_back = abandoned.len(),
            reclaimed,
            released,
            "vacuum complete"
        );
        VacuumReport {
            rolled_back: abandoned.len(),
            reclaimed,
            released,
        }
    }

    /// Get collection statistics.
    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            index: self.index.stats(),
            transactions: self.manager.metrics(),
            stored_revisions: self.store.len(),
        }
    }
}

impl std::fmt::Debug for DocumentCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCollection")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("index", &self.index)
            .field("manager", &self.manager)
            .finish()
    }
}

/// Builder for collection configuration.
///
/// # Example
///
/// ```ignore
/// // Single writer: skip the registry lookups
/// let scratch = DocumentCollection::builder("scratch")
///     .active_tracking(ActiveTracking::Disabled)
///     .build()?;
///
/// // Bounded memory
/// let cache = DocumentCollection::builder("cache")
///     .initial_capacity(1024)
///     .max_capacity(65_536)
///     .build()?;
/// ```
pub struct CollectionBuilder {
    name: String,
    config: CollectionConfig,
}

impl CollectionBuilder {
    /// Create a new builder with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: CollectionConfig::default(),
        }
    }

    /// Replace every setting at once.
    pub fn config(mut self, config: CollectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the initial index slot count.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.config.index = self.config.index.with_initial_capacity(capacity);
        self
    }

    /// Cap the index slot count.
    ///
    /// Inserts fail with a capacity error once the cap is reached.
    pub fn max_capacity(mut self, capacity: usize) -> Self {
        self.config.index = self.config.index.with_max_capacity(capacity);
        self
    }

    /// Choose how uncommitted transactions are detected.
    pub fn active_tracking(mut self, tracking: ActiveTracking) -> Self {
        self.config.active_tracking = tracking;
        self
    }

    /// Build the collection.
    pub fn build(self) -> Result<DocumentCollection> {
        let index = VersionedIndex::with_config(self.config.index).map_err(Error::from)?;
        let manager = TransactionManager::with_tracking(self.config.active_tracking);
        Ok(DocumentCollection::from_parts(self.name, index, manager))
    }
}
