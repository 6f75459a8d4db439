//! # Reassembler Telemetry
//!
//! Log output setup for binaries embedding a reassembler. The library crate
//! itself only emits `tracing` events; this crate decides where they go.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reassembler_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     // Application code here
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `REASSEMBLER_SERVICE_NAME` | `reassembler` | Service name in the startup line |
//! | `REASSEMBLER_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `REASSEMBLER_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `REASSEMBLER_JSON_LOGS` | `false` | JSON instead of human-readable lines |

#![warn(missing_docs)]

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed (usually: one already is).
    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),

    /// The configuration could not be turned into a filter.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install the global tracing subscriber.
///
/// Call once, early in `main`.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_setup::init_tracing(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TelemetryError::Config("bad directive".to_string());
        assert!(err.to_string().contains("bad directive"));
    }
}
