//! Message-level channel abstraction consumed by upper layers

use crate::error::IsoTpError;
use crate::message::IsoTpMessage;
use async_trait::async_trait;

/// Request/response datagram channel.
///
/// Implemented by [`crate::IsoTp`]; upper layers are generic over it so a
/// scripted channel can stand in during tests.
#[async_trait]
pub trait IsoTpChannel: Send + Sync {
    /// Transmit the whole of `msg.data()` on `msg.tx_id`
    async fn send(&self, msg: &IsoTpMessage) -> Result<(), IsoTpError>;

    /// Reassemble one message from `msg.rx_id` into `msg`, returning its length
    async fn receive(&self, msg: &mut IsoTpMessage) -> Result<usize, IsoTpError>;
}
