//! # Reorder Buffer
//!
//! The cursor and pending set behind the reassembler. Owned by exactly one
//! worker task, so it carries no synchronization of its own.
//!
//! ## Invariants
//!
//! - `next_seq` never decreases.
//! - Every key in `pending` is strictly greater than `next_seq`.
//! - A pending entry is removed in the same step that moves the cursor onto it.

use std::collections::BTreeMap;

use super::sequence::SequenceValue;

/// Outcome of placing one item against the cursor.
#[derive(Debug, PartialEq, Eq)]
pub enum Placement<T, S> {
    /// The item matched the cursor. Holds it followed by every buffered
    /// successor that became contiguous, in delivery order.
    Ready(Vec<T>),
    /// The item is early and now waits in the pending set. `displaced` is the
    /// previous occupant of the same key, if any.
    Buffered {
        /// Item that previously held this sequence
        displaced: Option<T>,
    },
    /// The item is behind the cursor.
    Stale {
        /// The rejected item
        item: T,
        /// Cursor at rejection time
        next_seq: S,
    },
}

/// Cursor plus pending set.
#[derive(Debug)]
pub struct ReorderBuffer<T, S: SequenceValue> {
    next_seq: S,
    /// Set once the item at `S::MAX` was delivered.
    exhausted: bool,
    pending: BTreeMap<S, T>,
}

impl<T, S: SequenceValue> ReorderBuffer<T, S> {
    /// Create an empty buffer expecting `initial` next.
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self {
            next_seq: initial,
            exhausted: false,
            pending: BTreeMap::new(),
        }
    }

    /// The sequence expected next.
    #[must_use]
    pub fn next_seq(&self) -> S {
        self.next_seq
    }

    /// Number of early items waiting for their predecessors.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the top of the sequence domain has been delivered.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Classify `item` (carrying `seq`) and update the cursor and pending set.
    pub fn place(&mut self, seq: S, item: T) -> Placement<T, S> {
        if self.exhausted || seq < self.next_seq {
            return Placement::Stale {
                item,
                next_seq: self.next_seq,
            };
        }

        if seq > self.next_seq {
            let displaced = self.pending.insert(seq, item);
            return Placement::Buffered { displaced };
        }

        let mut ready = vec![item];
        loop {
            let Some(next) = self.next_seq.successor() else {
                self.exhausted = true;
                break;
            };
            self.next_seq = next;

            match self.pending.remove(&next) {
                Some(buffered) => ready.push(buffered),
                None => break,
            }
        }
        Placement::Ready(ready)
    }

    /// Drop every pending item, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }
}
