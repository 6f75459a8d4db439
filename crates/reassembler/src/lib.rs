//! # Reassembler
//!
//! Generic in-order delivery buffer. Items arrive in any order, each tagged
//! with a sequence value, and leave strictly in sequence order. Early
//! arrivals wait in a pending set until the gap before them fills.
//!
//! ## Module Structure
//!
//! ```text
//! reassembler/
//! ├── domain/          # SequenceValue, ReorderBuffer, Issue, errors
//! ├── application/     # Reassembler service, worker task, handles, stats
//! └── config.rs        # ReassemblerConfig
//! ```
//!
//! ## Concurrency
//!
//! One worker task per reassembler owns the cursor and the pending set.
//! Submitters and the receiver talk to it over channels, so nothing around
//! the ordering state is locked.
//!
//! ```text
//! submit() ──intake──→ [worker: cursor + pending] ──delivery──→ recv()
//!                              │
//!                              └──→ drop observer (item, Issue)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use reassembler::Reassembler;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), reassembler::ReassemblerError> {
//! let mut reassembler = Reassembler::new("frames", |frame: &(u32, u8)| frame.0);
//! let shutdown = CancellationToken::new();
//! reassembler.start(0, shutdown.clone())?;
//!
//! let submitter = reassembler.submitter()?;
//! tokio::spawn(async move {
//!     for frame in [(1, b'B'), (0, b'A')] {
//!         let _ = submitter.submit(frame).await;
//!     }
//! });
//!
//! while let Some((seq, byte)) = reassembler.recv().await {
//!     println!("{seq}: {}", byte as char);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod application;
pub mod config;
pub mod domain;

// Re-export main types
pub use application::{
    DropObserver, ReassembledStream, Reassembler, ReassemblerBuilder, ReassemblerState,
    ReassemblerStats, SequenceFn, Submitter,
};
pub use config::{ReassemblerConfig, DEFAULT_CONDUIT_CAPACITY};
pub use domain::{
    DropCause, Issue, IssueKind, Placement, ReassemblerError, ReorderBuffer, SequenceValue,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
