//! OBD-II Error Types

use crate::nrc::Nrc;
use can_transport::TransportError;
use iso_tp::IsoTpError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse outcome of a diagnostic request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObdStatus {
    Success,
    /// Nothing answered on the response ID
    NoResponse,
    /// A transfer started but did not finish in time
    Timeout,
    /// The transport is not running
    UnableToConnect,
    /// The ECU answered without the expected data
    NoData,
    Stopped,
    GeneralError,
    /// A response did not fit the receive buffer on one side
    BufferOverflow,
}

/// Errors that can occur during OBD-II communication
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObdError {
    /// Segmentation layer failure
    #[error("ISO-TP error: {0}")]
    IsoTp(#[from] IsoTpError),

    /// Whole-request budget elapsed
    #[error("Timeout waiting for OBD response after {0}ms")]
    Timeout(u64),

    /// ECU replied `7F <service> <nrc>`
    #[error("Negative response to service {service:02X}: {nrc}")]
    NegativeResponse { service: u8, nrc: Nrc },

    /// Response header did not match the request
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Response shorter than the PID's data length
    #[error("Expected {expected} data bytes, got {actual}")]
    NoData { expected: usize, actual: usize },

    /// PID not advertised by the vehicle
    #[error("PID {0:02X} not supported by vehicle")]
    PidNotSupported(u8),

    /// Rejected client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The polling task was stopped
    #[error("OBD client stopped")]
    Stopped,
}

impl ObdError {
    /// Map to the coarse status reported to callers
    pub fn status(&self) -> ObdStatus {
        match self {
            ObdError::IsoTp(e) => match e {
                IsoTpError::Transport(TransportError::NotInitialised) => ObdStatus::UnableToConnect,
                IsoTpError::Transport(TransportError::Timeout(_)) => ObdStatus::Timeout,
                IsoTpError::SessionTimeout(_) => ObdStatus::NoResponse,
                IsoTpError::FlowControlTimeout(_) | IsoTpError::ConsecutiveFrameTimeout(_) => {
                    ObdStatus::Timeout
                }
                IsoTpError::BufferOverflow { .. } | IsoTpError::PeerOverflow => {
                    ObdStatus::BufferOverflow
                }
                _ => ObdStatus::GeneralError,
            },
            ObdError::Timeout(_) => ObdStatus::Timeout,
            ObdError::NoData { .. } | ObdError::PidNotSupported(_) => ObdStatus::NoData,
            ObdError::Stopped => ObdStatus::Stopped,
            ObdError::NegativeResponse { .. }
            | ObdError::InvalidResponse(_)
            | ObdError::InvalidConfig(_) => ObdStatus::GeneralError,
        }
    }

    /// NRC carried by a negative response
    pub fn nrc(&self) -> Option<Nrc> {
        match self {
            ObdError::NegativeResponse { nrc, .. } => Some(*nrc),
            _ => None,
        }
    }
}
