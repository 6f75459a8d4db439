//! # Reassembler Counters
//!
//! Written by the worker, read by anyone holding the reassembler.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Point-in-time snapshot of a reassembler's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReassemblerStats {
    /// Items handed to the receiver.
    pub delivered: u64,
    /// Items currently waiting in the pending set.
    pub buffered: usize,
    /// Items dropped for being behind the cursor.
    pub stale: u64,
    /// Items dropped because processing them faulted.
    pub faults: u64,
    /// Pending items displaced by a later item with the same sequence.
    pub collisions: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    delivered: AtomicU64,
    buffered: AtomicUsize,
    stale: AtomicU64,
    faults: AtomicU64,
    collisions: AtomicU64,
}

impl Counters {
    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_collision(&self) {
        self.collisions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_buffered(&self, len: usize) {
        self.buffered.store(len, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ReassemblerStats {
        ReassemblerStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            buffered: self.buffered.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
        }
    }
}
