//! Open-addressing slot array
//!
//! `SlotTable` is the raw storage behind [`VersionedIndex`](crate::VersionedIndex):
//! a flat array of optional revision handles resolved by linear probing from
//! `hash(key) mod capacity`. It knows nothing about locking; every method is
//! called with the index lock already held in the right mode.
//!
//! Key design invariants:
//! - `used < capacity`: at least one empty slot always terminates a probe
//! - Every record is reachable from its home slot without crossing an empty
//!   slot. Physical removal restores this with backward-shift deletion.
//! - Growth rehashes every record verbatim, live or retired

use crate::visibility::{hidden_writer, is_visible};
use docindex_core::{RevisionHandle, RevisionId, RevisionRecord, TransactionContext};
use rustc_hash::FxHasher;
use std::collections::TryReserveError;
use std::hash::Hasher;

/// Home slot of `key` in a table of `capacity` slots
#[inline]
pub(crate) fn home_slot(key: &str, capacity: usize) -> usize {
    let mut hasher = FxHasher::default();
    hasher.write(key.as_bytes());
    (hasher.finish() % capacity as u64) as usize
}

/// `x` lies in the cyclic interval `(lo, hi]`
#[inline]
fn in_cyclic_range(x: usize, lo: usize, hi: usize) -> bool {
    if lo <= hi {
        lo < x && x <= hi
    } else {
        lo < x || x <= hi
    }
}

/// Outcome of probing for an insertion point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertProbe {
    /// First empty slot of the key's cluster
    Vacant(usize),
    /// A revision of the key is already visible
    Visible,
    /// A live revision of the key written by an unseen transaction
    HiddenWriter(RevisionId),
}

#[derive(Debug)]
pub(crate) struct SlotTable {
    slots: Vec<Option<RevisionHandle>>,
    used: usize,
}

impl SlotTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            used: 0,
        }
    }

    /// Allocate an empty table, failing instead of aborting on OOM
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        slots.resize(capacity, None);
        Ok(Self { slots, used: 0 })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&RevisionHandle> {
        self.slots[idx].as_ref()
    }

    #[inline]
    fn next(&self, idx: usize) -> usize {
        (idx + 1) % self.capacity()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RevisionHandle> {
        self.slots.iter().flatten()
    }

    /// Slot holding the revision of `key` visible to `ctx`
    pub fn find_visible<C>(&self, ctx: &C, key: &str) -> Option<usize>
    where
        C: TransactionContext + ?Sized,
    {
        let mut idx = home_slot(key, self.capacity());
        for _ in 0..self.capacity() {
            match &self.slots[idx] {
                None => return None,
                Some(record) if is_visible(ctx, record, key) => return Some(idx),
                Some(_) => idx = self.next(idx),
            }
        }
        None
    }

    /// Walk the key's cluster looking for a place to insert
    ///
    /// Invisible occupants are passed over unless they are a live revision of
    /// the same key written by a transaction `ctx` cannot see. Returns `None`
    /// only if the table has no empty slot at all.
    pub fn probe_insert<C>(&self, ctx: &C, key: &str) -> Option<InsertProbe>
    where
        C: TransactionContext + ?Sized,
    {
        let mut idx = home_slot(key, self.capacity());
        for _ in 0..self.capacity() {
            match &self.slots[idx] {
                None => return Some(InsertProbe::Vacant(idx)),
                Some(record) if is_visible(ctx, record, key) => {
                    return Some(InsertProbe::Visible)
                }
                Some(record) if hidden_writer(ctx, record, key) => {
                    return Some(InsertProbe::HiddenWriter(record.revision_id()))
                }
                Some(_) => idx = self.next(idx),
            }
        }
        None
    }

    /// Fill an empty slot
    pub fn place(&mut self, idx: usize, record: RevisionHandle) {
        debug_assert!(self.slots[idx].is_none(), "placing into occupied slot {idx}");
        self.slots[idx] = Some(record);
        self.used += 1;
    }

    /// Overwrite an occupied slot, returning the previous occupant
    pub fn replace(&mut self, idx: usize, record: RevisionHandle) -> Option<RevisionHandle> {
        debug_assert!(self.slots[idx].is_some(), "replacing empty slot {idx}");
        self.slots[idx].replace(record)
    }

    /// Place at the first empty slot from the home position, no visibility checks
    fn place_rehash(&mut self, record: RevisionHandle) {
        let mut idx = home_slot(record.key(), self.capacity());
        while self.slots[idx].is_some() {
            idx = self.next(idx);
        }
        self.place(idx, record);
    }

    /// Physically remove the occupant of `idx` with backward-shift compaction
    ///
    /// Walks forward from the gap; every occupant whose home slot does not lie
    /// in the cyclic range `(gap, current]` is moved back into the gap, which
    /// then moves to its old position. Stops at the next empty slot.
    pub fn remove_at(&mut self, idx: usize) -> Option<RevisionHandle> {
        let removed = self.slots[idx].take()?;
        self.used -= 1;

        let capacity = self.capacity();
        let mut gap = idx;
        let mut cursor = self.next(idx);
        loop {
            let home = match &self.slots[cursor] {
                None => break,
                Some(record) => home_slot(record.key(), capacity),
            };
            if !in_cyclic_range(home, gap, cursor) {
                self.slots[gap] = self.slots[cursor].take();
                gap = cursor;
            }
            cursor = self.next(cursor);
        }
        Some(removed)
    }

    /// Remove every record matching `pred`, compacting as it goes
    ///
    /// Returns the removed handles. A slot is re-examined after a removal
    /// because the shift may have pulled a later record into it.
    pub fn remove_where<F>(&mut self, mut pred: F) -> Vec<RevisionHandle>
    where
        F: FnMut(&RevisionRecord) -> bool,
    {
        let mut removed = Vec::new();
        let mut idx = 0;
        while idx < self.capacity() {
            let matches = self.slots[idx].as_deref().map_or(false, &mut pred);
            if matches {
                removed.extend(self.remove_at(idx));
            } else {
                idx += 1;
            }
        }
        removed
    }

    /// Copy every record into a fresh table of `capacity` slots
    ///
    /// The current table is left untouched; on allocation failure nothing has
    /// changed.
    pub fn rehashed(&self, capacity: usize) -> Result<SlotTable, TryReserveError> {
        let mut table = SlotTable::try_with_capacity(capacity)?;
        for record in self.iter() {
            table.place_rehash(RevisionHandle::clone(record));
        }
        Ok(table)
    }

    /// Every occupied slot is reachable from its home slot
    #[cfg(test)]
    pub fn check_probe_invariant(&self) -> bool {
        let capacity = self.capacity();
        self.slots.iter().enumerate().all(|(idx, slot)| match slot {
            None => true,
            Some(record) => {
                let mut cursor = home_slot(record.key(), capacity);
                while cursor != idx {
                    if self.slots[cursor].is_none() {
                        return false;
                    }
                    cursor = (cursor + 1) % capacity;
                }
                true
            }
        })
    }
}
