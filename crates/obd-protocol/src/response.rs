//! Letter-addressed view of a positive response

use std::ops::Index;

/// Data byte position after the service/PID echo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Letter {
    A = 0,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

/// Up to eight data bytes of a mode 01/09 response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Response {
    bytes: [u8; 8],
    len: usize,
}

impl Response {
    pub const MAX_LEN: usize = 8;

    /// Keep at most eight bytes of `data`
    pub fn new(data: &[u8]) -> Self {
        let len = data.len().min(Self::MAX_LEN);
        let mut bytes = [0u8; Self::MAX_LEN];
        bytes[..len].copy_from_slice(&data[..len]);
        Self { bytes, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Big-endian u16 starting at `hi`; the byte after H reads as 0
    pub fn word(&self, hi: Letter) -> u16 {
        let hi = hi as usize;
        let lo = self.bytes.get(hi + 1).copied().unwrap_or(0);
        u16::from_be_bytes([self.bytes[hi], lo])
    }

    /// Big-endian u32 from A..=D
    pub fn dword(&self) -> u32 {
        u32::from_be_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
    }
}

impl Index<Letter> for Response {
    type Output = u8;

    fn index(&self, letter: Letter) -> &u8 {
        &self.bytes[letter as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_address_data_bytes() {
        let response = Response::new(&[0x1A, 0xF8, 0x03]);
        assert_eq!(response[Letter::A], 0x1A);
        assert_eq!(response[Letter::C], 0x03);
        assert_eq!(response[Letter::H], 0x00);
        assert_eq!(response.len(), 3);
        assert_eq!(response.word(Letter::A), 0x1AF8);
    }

    #[test]
    fn test_clips_to_eight_bytes() {
        let response = Response::new(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(response.len(), 8);
        assert_eq!(response.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(response.dword(), 0x0102_0304);
    }
}
