//! OBD-II Protocol Implementation
//!
//! SAE J1979 client over an ISO-TP channel: request framing, positive and
//! negative response recognition, per-PID decoding, PID-support discovery,
//! vehicle information (mode 09) and trouble codes (modes 03/04).

mod cache;
mod client;
mod config;
mod dtc;
mod error;
pub mod formula;
mod nrc;
mod pid;
mod pids;
mod response;
pub mod service09;

#[cfg(test)]
mod mock;

pub use cache::{PidSupportCache, PID_RANGES};
pub use client::{Obd2, NEGATIVE_RESPONSE, POSITIVE_RESPONSE_OFFSET};
pub use config::{Obd2Config, FUNCTIONAL_REQUEST_ID, PHYSICAL_REQUEST_BASE, RESPONSE_OFFSET};
pub use dtc::{parse_dtcs, Dtc, DtcSystem};
pub use error::{ObdError, ObdStatus};
pub use nrc::Nrc;
pub use pid::Pid;
pub use response::{Letter, Response};

/// OBD-II mode constants
pub mod mode {
    /// Current data
    pub const CURRENT_DATA: u8 = 0x01;
    /// Freeze frame data
    pub const FREEZE_FRAME: u8 = 0x02;
    /// Diagnostic trouble codes
    pub const READ_DTC: u8 = 0x03;
    /// Clear trouble codes
    pub const CLEAR_DTC: u8 = 0x04;
    /// Vehicle information
    pub const VEHICLE_INFO: u8 = 0x09;
    /// UDS read data by identifier
    pub const READ_DATA_BY_IDENTIFIER: u8 = 0x22;
}
