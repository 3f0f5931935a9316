//! MVCC visibility rules
//!
//! A revision `r` is visible to transaction `own` looking for `key` iff:
//! 1. `r.key == key`
//! 2. its creation is visible: `r.valid_from == own`, or `r.valid_from < own`
//!    and the creator has committed
//! 3. it is not retired for `own`: `r.valid_to == 0`, or `r.valid_to` names
//!    another transaction that is either later than `own` or not committed
//!
//! Rule 3 hides an uncommitted retirement rather than the record, so a
//! reader keeps seeing the old revision until the updater commits. Together
//! with rule 2 (the updater's new revision stays hidden until commit) this
//! leaves at most one visible revision per key.
//!
//! "Committed" is always judged by the caller's context, which normally
//! answers from the set of transactions that were uncommitted when the
//! caller began. These checks run on every probe step.

use docindex_core::{RevisionRecord, TransactionContext, TxnId};

/// Whether `record` is the revision of `key` that `ctx` should see
#[inline]
pub fn is_visible<C>(ctx: &C, record: &RevisionRecord, key: &str) -> bool
where
    C: TransactionContext + ?Sized,
{
    let own = ctx.txn_id();
    record.key() == key && creation_visible(ctx, own, record) && !retired_for(ctx, own, record)
}

/// Creation of `record` is visible to `own`
#[inline]
pub fn creation_visible<C>(ctx: &C, own: TxnId, record: &RevisionRecord) -> bool
where
    C: TransactionContext + ?Sized,
{
    let from = record.valid_from();
    from == own || (from < own && !ctx.is_active(from))
}

/// `record` has been retired from `own`'s point of view
///
/// True when `own` retired it itself, or when an earlier transaction that
/// has committed retired it.
#[inline]
pub fn retired_for<C>(ctx: &C, own: TxnId, record: &RevisionRecord) -> bool
where
    C: TransactionContext + ?Sized,
{
    let to = record.valid_to();
    if to.is_none() {
        return false;
    }
    to == own || (to < own && !ctx.is_active(to))
}

/// A same-key revision `own` cannot see but that is still alive for it
///
/// Such a revision belongs to a concurrent or later writer of the key.
/// Inserting next to it would leave two revisions visible to transactions
/// that start after both writers commit.
#[inline]
pub fn hidden_writer<C>(ctx: &C, record: &RevisionRecord, key: &str) -> bool
where
    C: TransactionContext + ?Sized,
{
    let own = ctx.txn_id();
    record.key() == key && !creation_visible(ctx, own, record) && !retired_for(ctx, own, record)
}
