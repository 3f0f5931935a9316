//! Owner of every revision a collection has created.
//!
//! The index only borrows handles. Revisions leave memory when the store
//! releases them after nothing else holds a handle.

use docindex_core::{RevisionHandle, RevisionId, RevisionRecord, TxnId};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub(crate) struct RevisionStore {
    /// Next revision id; 0 is never handed out
    next_revision: AtomicU64,
    records: Mutex<Vec<RevisionHandle>>,
}

impl RevisionStore {
    pub fn new() -> Self {
        Self {
            next_revision: AtomicU64::new(1),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Create a revision of `key` written by `txn`
    pub fn create(&self, key: &str, txn: TxnId, body: Value) -> RevisionHandle {
        let revision = RevisionId::new(self.next_revision.fetch_add(1, Ordering::SeqCst));
        let handle = RevisionRecord::new(key, txn, revision, body).into_handle();
        self.records.lock().push(Arc::clone(&handle));
        handle
    }

    /// Forget a revision that never made it into the index
    pub fn discard(&self, handle: &RevisionHandle) {
        let mut records = self.records.lock();
        if let Some(pos) = records.iter().rposition(|r| Arc::ptr_eq(r, handle)) {
            records.swap_remove(pos);
        }
    }

    /// Drop revisions held by nobody but the store
    pub fn release_unreferenced(&self) -> usize {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|handle| Arc::strong_count(handle) > 1);
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }
}
