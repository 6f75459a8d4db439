//! # Domain Layer
//!
//! Sequence values, the reorder buffer, issues and errors.

pub mod buffer;
pub mod errors;
pub mod issue;
pub mod sequence;

pub use buffer::{Placement, ReorderBuffer};
pub use errors::{DropCause, ReassemblerError};
pub use issue::{Issue, IssueKind};
pub use sequence::SequenceValue;
