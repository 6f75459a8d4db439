//! # Issues
//!
//! Non-fatal notifications describing why an item was not delivered.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::errors::DropCause;
use super::sequence::SequenceValue;

/// Why an item was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// Sequence was behind the cursor (already delivered or skipped).
    Stale,
    /// Processing the item faulted; the engine survived.
    ProcessingFault,
    /// A pending item was displaced by a later one with the same sequence.
    PendingCollision,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Stale => "stale item",
            Self::ProcessingFault => "processing fault",
            Self::PendingCollision => "pending collision",
        };
        f.write_str(label)
    }
}

/// A dropped-item report handed to the drop observer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} at next sequence {next_seq}")]
pub struct Issue<S: SequenceValue> {
    /// Classification of the drop.
    pub kind: IssueKind,
    /// Cursor value when the drop happened.
    pub next_seq: S,
    /// Underlying cause.
    #[source]
    pub cause: DropCause<S>,
}

impl<S: SequenceValue> Issue<S> {
    pub(crate) fn stale(name: &Arc<str>, seq: S, next_seq: S) -> Self {
        Self {
            kind: IssueKind::Stale,
            next_seq,
            cause: DropCause::Stale {
                name: Arc::clone(name),
                seq,
                next_seq,
            },
        }
    }

    pub(crate) fn exhausted(name: &Arc<str>, seq: S, next_seq: S) -> Self {
        Self {
            kind: IssueKind::Stale,
            next_seq,
            cause: DropCause::Exhausted {
                name: Arc::clone(name),
                seq,
                next_seq,
            },
        }
    }

    pub(crate) fn fault(name: &Arc<str>, next_seq: S, message: String) -> Self {
        Self {
            kind: IssueKind::ProcessingFault,
            next_seq,
            cause: DropCause::Panicked {
                name: Arc::clone(name),
                message,
            },
        }
    }

    pub(crate) fn collision(name: &Arc<str>, seq: S, next_seq: S) -> Self {
        Self {
            kind: IssueKind::PendingCollision,
            next_seq,
            cause: DropCause::Displaced {
                name: Arc::clone(name),
                seq,
            },
        }
    }

    /// Whether this issue has the given kind.
    #[must_use]
    pub fn is(&self, kind: IssueKind) -> bool {
        self.kind == kind
    }
}
