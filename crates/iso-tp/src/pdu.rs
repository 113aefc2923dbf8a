//! Encode and decode ISO-TP protocol control information.
//!
//! | N_PCI | Frame | Byte 0            | Byte 1     | Payload      |
//! |-------|-------|-------------------|------------|--------------|
//! | 0x0   | SF    | `0x0 ‖ len`       | data[0]    | data[1..len] |
//! | 0x1   | FF    | `0x1 ‖ len >> 8`  | `len`      | 6 bytes      |
//! | 0x2   | CF    | `0x2 ‖ seq`       | data[0]    | data[1..7]   |
//! | 0x3   | FC    | `0x3 ‖ status`    | block size | STmin        |

use crate::error::IsoTpError;
use crate::limits::MAX_MESSAGE_LEN;
use can_transport::{CanFrame, MAX_DLC};
use thiserror::Error;

pub const N_PCI_SF: u8 = 0x00;
pub const N_PCI_FF: u8 = 0x10;
pub const N_PCI_CF: u8 = 0x20;
pub const N_PCI_FC: u8 = 0x30;

/// Fill byte for unused frame bytes
pub const PADDING: u8 = 0x00;
/// Largest payload carried by a single frame
pub const SF_MAX_PAYLOAD: usize = 7;
/// Payload bytes carried by a first frame
pub const FF_PAYLOAD: usize = 6;
/// Payload bytes carried by a full consecutive frame
pub const CF_PAYLOAD: usize = 7;

/// Flow control status nibble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    /// Continue to send
    ClearToSend = 0,
    /// Wait for another flow control
    Wait = 1,
    /// Receiver buffer too small; abort
    Overflow = 2,
}

impl FlowStatus {
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0 => Some(Self::ClearToSend),
            1 => Some(Self::Wait),
            2 => Some(Self::Overflow),
            _ => None,
        }
    }

    pub fn as_nibble(self) -> u8 {
        self as u8
    }
}

/// Parsed view of one ISO-TP frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pdu<'a> {
    SingleFrame { data: &'a [u8] },
    FirstFrame { len: u16, data: &'a [u8] },
    ConsecutiveFrame { sn: u8, data: &'a [u8] },
    FlowControl { status: FlowStatus, block_size: u8, st_min: u8 },
}

impl Pdu<'_> {
    /// Short frame-type name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Pdu::SingleFrame { .. } => "SF",
            Pdu::FirstFrame { .. } => "FF",
            Pdu::ConsecutiveFrame { .. } => "CF",
            Pdu::FlowControl { .. } => "FC",
        }
    }
}

/// Protocol control information errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PduError {
    #[error("empty frame")]
    Empty,

    #[error("single frame length {len} invalid for {available} payload bytes")]
    InvalidSingleFrameLength { len: u8, available: usize },

    #[error("first frame length {0} fits in a single frame")]
    FirstFrameTooShort(u16),

    #[error("truncated {0} frame")]
    Truncated(&'static str),

    #[error("reserved flow status {0:#X}")]
    ReservedFlowStatus(u8),

    #[error("reserved N_PCI type {0:#X}")]
    ReservedPci(u8),

    #[error("{0} payload bytes do not fit the frame")]
    PayloadTooLong(usize),
}

/// Build a padded 8-byte CAN frame carrying `pdu`
pub fn encode(id: u32, pdu: &Pdu<'_>) -> Result<CanFrame, IsoTpError> {
    let mut buf = [PADDING; MAX_DLC];

    match pdu {
        Pdu::SingleFrame { data } => {
            if data.is_empty() || data.len() > SF_MAX_PAYLOAD {
                return Err(PduError::PayloadTooLong(data.len()).into());
            }
            buf[0] = N_PCI_SF | data.len() as u8;
            buf[1..=data.len()].copy_from_slice(data);
        }
        Pdu::FirstFrame { len, data } => {
            let len = *len as usize;
            if len > MAX_MESSAGE_LEN {
                return Err(IsoTpError::InvalidLength(len));
            }
            if len <= SF_MAX_PAYLOAD {
                return Err(PduError::FirstFrameTooShort(len as u16).into());
            }
            if data.len() > FF_PAYLOAD {
                return Err(PduError::PayloadTooLong(data.len()).into());
            }
            buf[0] = N_PCI_FF | ((len >> 8) as u8 & 0x0F);
            buf[1] = (len & 0xFF) as u8;
            buf[2..2 + data.len()].copy_from_slice(data);
        }
        Pdu::ConsecutiveFrame { sn, data } => {
            if data.len() > CF_PAYLOAD {
                return Err(PduError::PayloadTooLong(data.len()).into());
            }
            buf[0] = N_PCI_CF | (sn & 0x0F);
            buf[1..=data.len()].copy_from_slice(data);
        }
        Pdu::FlowControl {
            status,
            block_size,
            st_min,
        } => {
            buf[0] = N_PCI_FC | status.as_nibble();
            buf[1] = *block_size;
            buf[2] = *st_min;
        }
    }

    Ok(CanFrame::new(id, &buf)?)
}

/// Decode the PCI at byte 0 of `data`
pub fn decode(data: &[u8]) -> Result<Pdu<'_>, PduError> {
    let first = *data.first().ok_or(PduError::Empty)?;

    match first & 0xF0 {
        N_PCI_SF => {
            let len = first & 0x0F;
            let available = data.len() - 1;
            if len == 0 || len as usize > SF_MAX_PAYLOAD || len as usize > available {
                return Err(PduError::InvalidSingleFrameLength { len, available });
            }
            Ok(Pdu::SingleFrame {
                data: &data[1..=len as usize],
            })
        }
        N_PCI_FF => {
            if data.len() < 2 {
                return Err(PduError::Truncated("first"));
            }
            let len = ((first as u16 & 0x0F) << 8) | data[1] as u16;
            if len as usize <= SF_MAX_PAYLOAD {
                return Err(PduError::FirstFrameTooShort(len));
            }
            Ok(Pdu::FirstFrame {
                len,
                data: &data[2..],
            })
        }
        N_PCI_CF => Ok(Pdu::ConsecutiveFrame {
            sn: first & 0x0F,
            data: &data[1..],
        }),
        N_PCI_FC => {
            let nibble = first & 0x0F;
            let status = FlowStatus::from_nibble(nibble).ok_or(PduError::ReservedFlowStatus(nibble))?;
            if data.len() < 3 {
                return Err(PduError::Truncated("flow control"));
            }
            Ok(Pdu::FlowControl {
                status,
                block_size: data[1],
                st_min: data[2],
            })
        }
        other => Err(PduError::ReservedPci(other >> 4)),
    }
}
