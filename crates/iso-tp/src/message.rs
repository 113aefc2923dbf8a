//! ISO-TP message buffer

use crate::error::IsoTpError;

/// Transport-layer datagram with its addressing pair.
///
/// For sends the buffer holds exactly the payload. For receives it is a
/// zeroed buffer of fixed capacity that the engine fills; `len()` reports the
/// reassembled length (0 after a failed receive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoTpMessage {
    /// CAN ID frames are transmitted on (requests, flow control)
    pub tx_id: u32,
    /// CAN ID frames are expected on
    pub rx_id: u32,
    buffer: Vec<u8>,
    len: usize,
}

impl IsoTpMessage {
    /// Message ready to send
    pub fn new(tx_id: u32, rx_id: u32, payload: &[u8]) -> Self {
        Self {
            tx_id,
            rx_id,
            buffer: payload.to_vec(),
            len: payload.len(),
        }
    }

    /// Empty receive buffer of `capacity` bytes
    pub fn with_capacity(tx_id: u32, rx_id: u32, capacity: usize) -> Self {
        Self {
            tx_id,
            rx_id,
            buffer: vec![0; capacity],
            len: 0,
        }
    }

    /// Valid payload bytes
    pub fn data(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// Entire backing buffer, including bytes past `len()`
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Copy a reassembled payload into the buffer.
    ///
    /// For [`crate::IsoTpChannel`] implementations other than the engine.
    pub fn fill(&mut self, payload: &[u8]) -> Result<usize, IsoTpError> {
        if payload.len() > self.buffer.len() {
            return Err(IsoTpError::BufferOverflow {
                needed: payload.len(),
                capacity: self.buffer.len(),
            });
        }
        self.buffer[..payload.len()].copy_from_slice(payload);
        self.len = payload.len();
        Ok(self.len)
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        self.len = len.min(self.buffer.len());
    }
}
