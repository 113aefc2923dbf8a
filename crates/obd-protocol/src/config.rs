//! OBD-II client configuration

use crate::error::ObdError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Functional (broadcast) request ID
pub const FUNCTIONAL_REQUEST_ID: u32 = 0x7DF;
/// First physical request ID; ECU `n` listens on `0x7E0 + n`
pub const PHYSICAL_REQUEST_BASE: u32 = 0x7E0;
/// Offset from a request ID to the matching response ID
pub const RESPONSE_OFFSET: u32 = 8;
/// Receive buffer size for one response
pub const DEFAULT_RESPONSE_CAPACITY: usize = 128;

/// OBD-II client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Obd2Config {
    /// Request CAN ID
    pub tx_id: u32,
    /// Response CAN ID
    pub rx_id: u32,
    /// Budget for one request/response exchange (milliseconds)
    pub request_timeout_ms: u64,
    /// Lifetime of the supported-PID cache (milliseconds)
    pub pid_cache_ttl_ms: u64,
    /// Receive buffer size (bytes)
    pub response_capacity: usize,
}

impl Default for Obd2Config {
    fn default() -> Self {
        Self {
            tx_id: FUNCTIONAL_REQUEST_ID,
            rx_id: PHYSICAL_REQUEST_BASE + RESPONSE_OFFSET,
            request_timeout_ms: 1000,
            pid_cache_ttl_ms: 60_000,
            response_capacity: DEFAULT_RESPONSE_CAPACITY,
        }
    }
}

impl Obd2Config {
    /// Physically addressed ECU `ecu_index` (0..=7)
    pub fn physical(ecu_index: u8) -> Self {
        let tx_id = PHYSICAL_REQUEST_BASE + (ecu_index & 0x07) as u32;
        Self {
            tx_id,
            rx_id: tx_id + RESPONSE_OFFSET,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ObdError> {
        let physical = PHYSICAL_REQUEST_BASE..=PHYSICAL_REQUEST_BASE + 7;
        if self.tx_id != FUNCTIONAL_REQUEST_ID && !physical.contains(&self.tx_id) {
            return Err(ObdError::InvalidConfig(format!(
                "tx_id {:#05X} is neither 0x7DF nor 0x7E0..=0x7E7",
                self.tx_id
            )));
        }
        if !(0x7E8..=0x7EF).contains(&self.rx_id) {
            return Err(ObdError::InvalidConfig(format!(
                "rx_id {:#05X} outside 0x7E8..=0x7EF",
                self.rx_id
            )));
        }
        if self.response_capacity < 3 {
            return Err(ObdError::InvalidConfig(format!(
                "response_capacity {} cannot hold a response header",
                self.response_capacity
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn pid_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.pid_cache_ttl_ms)
    }
}
