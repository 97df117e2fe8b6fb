//! # Transport Configuration
//!
//! Timing, sizing and hardware-generation settings for one CA-821x link.
//! Defaults match the CA-821x SPI timing requirements; the struct is
//! serde-enabled so a host can embed it in its own configuration.

use serde::{Deserialize, Serialize};

use crate::error::Ca821xError;

/// CA-821x hardware generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChipVariant {
    /// CA-8210: header NACKs, byte misalignment, fixed select hold.
    Ca8210,
    /// CA-8211: slave-ready polling, PHY-level data service.
    #[default]
    Ca8211,
}

impl ChipVariant {
    pub fn supports_pcps(self) -> bool {
        self == ChipVariant::Ca8211
    }

    /// Length of an MCPS-DATA confirm parameter set on this generation.
    pub fn data_confirm_len(self) -> u8 {
        match self {
            ChipVariant::Ca8210 => 6,
            ChipVariant::Ca8211 => 7,
        }
    }
}

/// Configuration for the transport, dispatch and codec layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub variant: ChipVariant,
    /// Receive queue slots
    pub rx_queue_capacity: usize,
    /// Slots kept free for replies while asynchronous reads are throttled
    pub rx_reserved_slots: usize,
    /// Slave-ready, NACK and synchronous reply timeout
    pub sync_timeout_ms: u32,
    pub backoff_us: u32,
    pub select_hold_us: u32,
    pub ca8210_hold_us: u32,
    pub cache_capacity: usize,
    pub cache_timeout_ms: u16,
    pub blacklist_capacity: usize,
    /// PAN descriptors at or below this LQI are dropped from scan confirms
    pub lqi_limit: u8,
    /// Clear the coordinator bit after a default-PIB reset
    pub mac_workarounds: bool,
    /// Multi-project-wafer silicon uses the PACFG register for TX power
    pub multi_project_wafer: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            variant: ChipVariant::default(),
            rx_queue_capacity: 7,
            rx_reserved_slots: 4,
            sync_timeout_ms: 500,
            backoff_us: 10,
            select_hold_us: 50,
            ca8210_hold_us: 100,
            cache_capacity: 15,
            cache_timeout_ms: 500,
            blacklist_capacity: 10,
            lqi_limit: crate::constants::API_LQI_LIMIT,
            mac_workarounds: false,
            multi_project_wafer: false,
        }
    }
}

impl TransportConfig {
    /// Default configuration for the given hardware generation.
    pub fn for_variant(variant: ChipVariant) -> Self {
        TransportConfig {
            variant,
            ..Default::default()
        }
    }

    /// Checks sizing invariants.
    pub fn validate(&self) -> Result<(), Ca821xError> {
        if self.rx_queue_capacity == 0
            || self.cache_capacity == 0
            || self.blacklist_capacity == 0
            || self.sync_timeout_ms == 0
        {
            return Err(Ca821xError::InvalidArgs);
        }
        if self.rx_reserved_slots >= self.rx_queue_capacity {
            return Err(Ca821xError::InvalidArgs);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TransportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rx_queue_capacity, 7);
        assert_eq!(config.variant, ChipVariant::Ca8211);
    }

    #[test]
    fn test_reserved_slots_must_leave_room() {
        let config = TransportConfig {
            rx_queue_capacity: 3,
            rx_reserved_slots: 3,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(Ca821xError::InvalidArgs));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TransportConfig =
            serde_json::from_str(r#"{"variant":"ca8210","cache_capacity":4}"#).unwrap();
        assert_eq!(config.variant, ChipVariant::Ca8210);
        assert_eq!(config.cache_capacity, 4);
        assert_eq!(config.sync_timeout_ms, 500);
    }
}
