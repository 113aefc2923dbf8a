//! ISO-TP engine configuration

use crate::limits;
use can_transport::QueueSubscriber;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// ISO-TP engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsoTpConfig {
    /// Depth of the frame queue between transport and engine
    pub subscriber_queue_depth: usize,
    /// Bus acceptance budget per transmitted frame (milliseconds)
    pub transmit_timeout_ms: u64,
    /// Flow control deadline (milliseconds)
    pub fc_timeout_ms: u64,
    /// Consecutive frame deadline while receiving (milliseconds)
    pub cf_timeout_ms: u64,
    /// Total receive budget (milliseconds)
    pub session_timeout_ms: u64,
    /// Successive FC WAIT frames tolerated
    pub max_fc_waits: u8,
}

impl Default for IsoTpConfig {
    fn default() -> Self {
        Self {
            subscriber_queue_depth: QueueSubscriber::DEFAULT_CAPACITY,
            transmit_timeout_ms: 50,
            fc_timeout_ms: limits::FC_TIMEOUT.as_millis() as u64,
            cf_timeout_ms: limits::CF_TIMEOUT.as_millis() as u64,
            session_timeout_ms: limits::SESSION_TIMEOUT.as_millis() as u64,
            max_fc_waits: limits::MAX_FC_WAITS,
        }
    }
}

impl IsoTpConfig {
    /// Deep queue for transports that drop instead of pacing, where a peer
    /// sending CFs back-to-back would otherwise overrun the default depth
    pub fn bulk() -> Self {
        Self {
            subscriber_queue_depth: limits::MAX_MESSAGE_LEN / 7 + 8,
            ..Default::default()
        }
    }

    pub fn transmit_timeout(&self) -> Duration {
        Duration::from_millis(self.transmit_timeout_ms)
    }

    pub fn fc_timeout(&self) -> Duration {
        Duration::from_millis(self.fc_timeout_ms)
    }

    pub fn cf_timeout(&self) -> Duration {
        Duration::from_millis(self.cf_timeout_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}
