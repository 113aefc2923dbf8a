//! Classical CAN frame

use crate::error::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest 11-bit identifier
pub const MAX_STANDARD_ID: u32 = 0x7FF;
/// Highest 29-bit identifier
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;
/// Maximum data length of a classical CAN frame
pub const MAX_DLC: usize = 8;

/// Immutable classical CAN frame.
///
/// Bytes past `dlc` are always zero, so two frames with equal visible data
/// compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanFrame {
    id: u32,
    rtr: bool,
    extended: bool,
    dlc: u8,
    data: [u8; MAX_DLC],
}

impl CanFrame {
    /// Create a data frame with an 11-bit identifier
    pub fn new(id: u32, data: &[u8]) -> Result<Self, TransportError> {
        if id > MAX_STANDARD_ID {
            return Err(TransportError::InvalidMessage(format!(
                "standard id {id:#X} exceeds 11 bits"
            )));
        }
        Self::build(id, false, false, data)
    }

    /// Create a data frame with a 29-bit identifier
    pub fn new_extended(id: u32, data: &[u8]) -> Result<Self, TransportError> {
        if id > MAX_EXTENDED_ID {
            return Err(TransportError::InvalidMessage(format!(
                "extended id {id:#X} exceeds 29 bits"
            )));
        }
        Self::build(id, true, false, data)
    }

    /// Create a remote transmission request with an 11-bit identifier
    pub fn new_remote(id: u32, dlc: u8) -> Result<Self, TransportError> {
        if id > MAX_STANDARD_ID {
            return Err(TransportError::InvalidMessage(format!(
                "standard id {id:#X} exceeds 11 bits"
            )));
        }
        if dlc as usize > MAX_DLC {
            return Err(TransportError::InvalidMessage(format!("dlc {dlc} exceeds 8")));
        }
        Ok(Self {
            id,
            rtr: true,
            extended: false,
            dlc,
            data: [0; MAX_DLC],
        })
    }

    /// Create a data frame padded to 8 bytes with `fill`
    pub fn padded(id: u32, data: &[u8], fill: u8) -> Result<Self, TransportError> {
        if data.len() > MAX_DLC {
            return Err(TransportError::InvalidMessage(format!(
                "{} data bytes exceed 8",
                data.len()
            )));
        }
        let mut buf = [fill; MAX_DLC];
        buf[..data.len()].copy_from_slice(data);
        Self::new(id, &buf)
    }

    fn build(id: u32, extended: bool, rtr: bool, data: &[u8]) -> Result<Self, TransportError> {
        if data.len() > MAX_DLC {
            return Err(TransportError::InvalidMessage(format!(
                "{} data bytes exceed 8",
                data.len()
            )));
        }
        let mut buf = [0u8; MAX_DLC];
        buf[..data.len()].copy_from_slice(data);
        Ok(Self {
            id,
            rtr,
            extended,
            dlc: data.len() as u8,
            data: buf,
        })
    }

    /// Frame identifier
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Whether this is a remote transmission request
    pub fn is_remote(&self) -> bool {
        self.rtr
    }

    /// Whether the identifier is 29-bit
    pub fn is_extended(&self) -> bool {
        self.extended
    }

    /// Data length code
    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    /// Visible data bytes (`data[..dlc]`)
    pub fn data(&self) -> &[u8] {
        &self.data[..self.dlc as usize]
    }
}

impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extended {
            write!(f, "{:08X}", self.id)?;
        } else {
            write!(f, "{:03X}", self.id)?;
        }
        if self.rtr {
            return write!(f, " [{}] RTR", self.dlc);
        }
        write!(f, " [{}]", self.dlc)?;
        for byte in self.data() {
            write!(f, " {byte:02X}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_frame() {
        let frame = CanFrame::new(0x7E8, &[0x04, 0x41, 0x0C]).unwrap();
        assert_eq!(frame.id(), 0x7E8);
        assert_eq!(frame.dlc(), 3);
        assert_eq!(frame.data(), &[0x04, 0x41, 0x0C]);
        assert!(!frame.is_extended());
        assert!(!frame.is_remote());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(CanFrame::new(0x800, &[]).is_err());
        assert!(CanFrame::new(0x7DF, &[0; 9]).is_err());
        assert!(CanFrame::new_extended(0x2000_0000, &[]).is_err());
        assert!(CanFrame::new_extended(0x18DA_F110, &[0x02]).is_ok());
        assert!(CanFrame::new_remote(0x100, 9).is_err());
    }

    #[test]
    fn test_padded_frame() {
        let frame = CanFrame::padded(0x7DF, &[0x02, 0x01, 0x0C], 0x00).unwrap();
        assert_eq!(frame.dlc(), 8);
        assert_eq!(frame.data(), &[0x02, 0x01, 0x0C, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_display() {
        let frame = CanFrame::new(0x7E8, &[0x03, 0x41, 0x05, 0x7B]).unwrap();
        assert_eq!(frame.to_string(), "7E8 [4] 03 41 05 7B");
        let rtr = CanFrame::new_remote(0x123, 2).unwrap();
        assert_eq!(rtr.to_string(), "123 [2] RTR");
    }
}
