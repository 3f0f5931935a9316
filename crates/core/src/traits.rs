//! Collaborator interfaces consumed by the index

use crate::error::Result;
use crate::types::{RevisionId, TxnId};

/// Transaction-side view the index needs while probing and mutating
///
/// Every index operation is performed on behalf of exactly one transaction.
/// Implementations must answer all three queries from memory: they are
/// called while the index lock is held.
pub trait TransactionContext {
    /// Id of the calling transaction
    fn txn_id(&self) -> TxnId;

    /// Whether `txn` counts as uncommitted for the caller
    ///
    /// Must give the same answer for the same id throughout one index call;
    /// answering from a snapshot taken when the transaction began satisfies
    /// this. The caller's own id may be passed; the index never relies on
    /// the answer for it.
    fn is_active(&self, txn: TxnId) -> bool;

    /// Validate the revision currently visible for `key` before mutating it
    ///
    /// Returns [`IndexError::Conflict`](crate::error::IndexError::Conflict)
    /// when the caller based its write on a different revision.
    fn check_revision(&self, key: &str, current: RevisionId) -> Result<()>;
}

impl<T: TransactionContext + ?Sized> TransactionContext for &T {
    fn txn_id(&self) -> TxnId {
        (**self).txn_id()
    }

    fn is_active(&self, txn: TxnId) -> bool {
        (**self).is_active(txn)
    }

    fn check_revision(&self, key: &str, current: RevisionId) -> Result<()> {
        (**self).check_revision(key, current)
    }
}
