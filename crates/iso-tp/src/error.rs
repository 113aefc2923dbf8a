//! ISO-TP Error Types

use crate::pdu::PduError;
use can_transport::TransportError;
use thiserror::Error;

/// Reasons an ISO-TP send or receive failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IsoTpError {
    /// Error from the underlying CAN transport, surfaced unchanged
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame content violates the N_PCI encoding
    #[error("Malformed frame: {0}")]
    Malformed(#[from] PduError),

    /// Message length outside 1..=4095
    #[error("Message length {0} outside 1..=4095")]
    InvalidLength(usize),

    /// No flow control after FF or at the end of a block
    #[error("Timed out waiting for flow control after {0}ms")]
    FlowControlTimeout(u64),

    /// Gap between consecutive frames exceeded
    #[error("Timed out waiting for consecutive frame after {0}ms")]
    ConsecutiveFrameTimeout(u64),

    /// Overall receive budget exhausted
    #[error("Receive session timed out after {0}ms")]
    SessionTimeout(u64),

    /// Consecutive frame arrived out of order
    #[error("Sequence mismatch: expected {expected}, received {received}")]
    SequenceMismatch { expected: u8, received: u8 },

    /// Receiver answered with FC OVERFLOW
    #[error("Peer reported receive overflow")]
    PeerOverflow,

    /// Incoming message does not fit the caller's buffer
    #[error("Message of {needed} bytes exceeds buffer capacity {capacity}")]
    BufferOverflow { needed: usize, capacity: usize },

    /// Too many successive FC WAIT frames
    #[error("Exceeded {0} consecutive flow control WAIT frames")]
    TooManyWaits(u8),
}

impl IsoTpError {
    /// Whether the failure was a missed deadline
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::FlowControlTimeout(_)
                | Self::ConsecutiveFrameTimeout(_)
                | Self::SessionTimeout(_)
                | Self::Transport(TransportError::Timeout(_))
        )
    }
}
