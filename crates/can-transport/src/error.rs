//! Transport Error Types

use thiserror::Error;

/// Errors surfaced by a CAN transport backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Unclassified controller failure
    #[error("General transport failure: {0}")]
    GeneralFailure(String),

    /// Operation attempted before `start()`
    #[error("Transport not initialised")]
    NotInitialised,

    /// `start()` called on a running transport
    #[error("Transport already initialised")]
    AlreadyInitialised,

    /// Bus-off or arbitration loss escalation
    #[error("Frame transmission failed: {0}")]
    TransmitFailed(String),

    /// Controller receive path failure
    #[error("Frame reception failed: {0}")]
    ReceiveFailed(String),

    /// Frame violates classical CAN limits
    #[error("Invalid CAN message: {0}")]
    InvalidMessage(String),

    /// Bus did not accept the frame in time
    #[error("Timed out waiting for bus acceptance after {0}ms")]
    Timeout(u64),

    /// Fixed subscriber table is full
    #[error("Subscriber table full ({0} entries)")]
    NoMem(usize),
}

impl TransportError {
    /// Whether the caller may reasonably retry the operation.
    ///
    /// Every other variant is fatal to the current operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::TransmitFailed(_))
    }
}
