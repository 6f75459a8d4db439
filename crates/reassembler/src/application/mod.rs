//! # Application Layer
//!
//! The reassembler service, its worker task, and the conduit handles.

pub mod handles;
pub mod service;
pub mod stats;
mod worker;

pub use handles::{ReassembledStream, Submitter};
pub use service::{DropObserver, Reassembler, ReassemblerBuilder, ReassemblerState, SequenceFn};
pub use stats::ReassemblerStats;
