//! # Reassembler Configuration

use serde::{Deserialize, Serialize};

use crate::domain::ReassemblerError;

/// Capacity of each conduit. One slot is the closest a tokio channel gets
/// to a rendezvous.
pub const DEFAULT_CONDUIT_CAPACITY: usize = 1;

/// Reassembler configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReassemblerConfig {
    /// Slots in the intake conduit between submitters and the worker.
    pub intake_capacity: usize,

    /// Slots in the delivery conduit between the worker and the receiver.
    pub delivery_capacity: usize,

    /// Report items displaced from the pending set by a later item with the
    /// same sequence. When off they are discarded silently.
    pub report_collisions: bool,
}

impl Default for ReassemblerConfig {
    fn default() -> Self {
        Self {
            intake_capacity: DEFAULT_CONDUIT_CAPACITY,
            delivery_capacity: DEFAULT_CONDUIT_CAPACITY,
            report_collisions: true,
        }
    }
}

impl ReassemblerConfig {
    /// Create a config for testing (roomier conduits so tests can submit
    /// ahead of the receiver).
    pub fn for_testing() -> Self {
        Self {
            intake_capacity: 16,
            delivery_capacity: 16,
            report_collisions: true,
        }
    }

    /// Reject zero-capacity conduits.
    pub fn validate(&self) -> Result<(), ReassemblerError> {
        if self.intake_capacity == 0 {
            return Err(ReassemblerError::InvalidConfig(
                "intake_capacity must be at least 1".to_string(),
            ));
        }
        if self.delivery_capacity == 0 {
            return Err(ReassemblerError::InvalidConfig(
                "delivery_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReassemblerConfig::default();
        assert_eq!(config.intake_capacity, 1);
        assert_eq!(config.delivery_capacity, 1);
        assert!(config.report_collisions);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = ReassemblerConfig {
            delivery_capacity: 0,
            ..ReassemblerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ReassemblerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ReassemblerConfig =
            serde_json::from_str(r#"{ "report_collisions": false }"#).unwrap();
        assert!(!config.report_collisions);
        assert_eq!(config.intake_capacity, DEFAULT_CONDUIT_CAPACITY);
    }
}
