//! # Domain Errors
//!
//! Lifecycle errors surfaced to callers, and the causes attached to
//! dropped-item issues.

use std::sync::Arc;

use thiserror::Error;

use super::sequence::SequenceValue;

/// Hard errors returned by reassembler operations.
///
/// Only lifecycle failures end up here. Ordering problems for individual
/// items never surface through these; they are reported as [`Issue`]s.
///
/// [`Issue`]: super::issue::Issue
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReassemblerError {
    /// The builder was finished without a sequence extraction function.
    #[error("reassembler '{name}': sequence function is not set")]
    MissingSequenceFn {
        /// Diagnostic name of the reassembler
        name: Arc<str>,
    },

    /// The supplied configuration is unusable.
    #[error("invalid reassembler configuration: {0}")]
    InvalidConfig(String),

    /// `start` was called on a reassembler that already left `Created`.
    #[error("reassembler '{name}': already started")]
    AlreadyStarted {
        /// Diagnostic name of the reassembler
        name: Arc<str>,
    },

    /// `start` was called outside a Tokio runtime.
    #[error("reassembler '{name}': no Tokio runtime to spawn the worker on")]
    NoRuntime {
        /// Diagnostic name of the reassembler
        name: Arc<str>,
    },

    /// An item was submitted before `start`.
    #[error("reassembler '{name}': not started")]
    NotStarted {
        /// Diagnostic name of the reassembler
        name: Arc<str>,
    },

    /// The reassembler stopped and no longer accepts items.
    #[error("reassembler '{name}': closed")]
    Closed {
        /// Diagnostic name of the reassembler
        name: Arc<str>,
    },
}

/// The underlying cause carried by an [`Issue`](super::issue::Issue).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DropCause<S: SequenceValue> {
    /// The item's sequence is behind the cursor.
    #[error("reassembler '{name}': sequence {seq} is less than next sequence {next_seq}")]
    Stale {
        /// Diagnostic name of the reassembler
        name: Arc<str>,
        /// Sequence carried by the dropped item
        seq: S,
        /// Cursor at the time of the drop
        next_seq: S,
    },

    /// The item arrived after the top of the sequence domain was delivered.
    #[error("reassembler '{name}': sequence {seq} arrived after the sequence space was exhausted at {next_seq}")]
    Exhausted {
        /// Diagnostic name of the reassembler
        name: Arc<str>,
        /// Sequence carried by the dropped item
        seq: S,
        /// Cursor at the time of the drop (the domain maximum)
        next_seq: S,
    },

    /// Processing the item panicked.
    #[error("reassembler '{name}': panic occurred while processing item: {message}")]
    Panicked {
        /// Diagnostic name of the reassembler
        name: Arc<str>,
        /// Panic payload, when it was a string
        message: String,
    },

    /// A later item with the same sequence replaced this one in the pending set.
    #[error("reassembler '{name}': pending item at sequence {seq} was replaced")]
    Displaced {
        /// Diagnostic name of the reassembler
        name: Arc<str>,
        /// Sequence shared by both items
        seq: S,
    },
}
