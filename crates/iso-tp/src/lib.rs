//! ISO-TP (ISO 15765-2) Transport Protocol
//!
//! Segments messages of up to 4095 bytes into single, first and consecutive
//! CAN frames and reassembles them on receive, driving flow control, block
//! size and STmin pacing. Normal addressing over 11-bit identifiers; every
//! transmitted frame is padded to 8 bytes with `0x00`.
//!
//! The engine holds no cross-call state: each `send`/`receive` runs a fresh
//! session that is torn down before the call returns.

mod channel;
mod config;
mod engine;
mod error;
mod message;
pub mod pdu;
mod session;
mod st_min;

pub use channel::IsoTpChannel;
pub use config::IsoTpConfig;
pub use engine::IsoTp;
pub use error::IsoTpError;
pub use message::IsoTpMessage;
pub use pdu::{FlowStatus, Pdu, PduError};
pub use session::{next_seq, SessionState};
pub use st_min::StMin;

/// Protocol timing and size limits
pub mod limits {
    use std::time::Duration;

    /// FF → FC and block-end → FC deadline
    pub const FC_TIMEOUT: Duration = Duration::from_millis(250);
    /// Deadline between successive CFs while receiving
    pub const CF_TIMEOUT: Duration = Duration::from_millis(250);
    /// Total budget for one receive
    pub const SESSION_TIMEOUT: Duration = Duration::from_millis(500);
    /// Successive WAIT flow controls tolerated before aborting
    pub const MAX_FC_WAITS: u8 = 10;
    /// Largest length expressible in the 12-bit FF_DL field
    pub const MAX_MESSAGE_LEN: usize = 4095;
}
