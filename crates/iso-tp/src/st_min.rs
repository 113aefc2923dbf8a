//! Separation time (STmin) encoding, ISO 15765-2 §6.5.5.5

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Normalised STmin byte.
///
/// Only the defined ranges survive construction; reserved bytes become
/// `0x7F` (127 ms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StMin(u8);

impl StMin {
    /// Longest defined separation time (127 ms)
    pub const MAX: StMin = StMin(0x7F);
    /// No separation
    pub const ZERO: StMin = StMin(0x00);

    /// Decode a raw STmin byte, normalising reserved values
    pub fn from_byte(raw: u8) -> Self {
        match raw {
            0x00..=0x7F | 0xF1..=0xF9 => StMin(raw),
            _ => Self::MAX,
        }
    }

    /// Closest encoding not shorter than `duration`, clamped to 127 ms
    pub fn from_duration(duration: Duration) -> Self {
        let micros = duration.as_micros();
        match micros {
            0 => Self::ZERO,
            1..=900 => StMin(0xF0 + micros.div_ceil(100) as u8),
            _ => StMin(micros.div_ceil(1000).min(0x7F) as u8),
        }
    }

    pub fn as_byte(self) -> u8 {
        self.0
    }

    /// Delay the sender must leave before each consecutive frame
    pub fn duration(self) -> Duration {
        match self.0 {
            0x00..=0x7F => Duration::from_millis(self.0 as u64),
            0xF1..=0xF9 => Duration::from_micros((self.0 as u64 - 0xF0) * 100),
            _ => Duration::from_millis(0x7F),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_millisecond_range() {
        assert_eq!(StMin::from_byte(0x00).duration(), Duration::ZERO);
        assert_eq!(StMin::from_byte(0x0A).duration(), Duration::from_millis(10));
        assert_eq!(StMin::from_byte(0x7F).duration(), Duration::from_millis(127));
    }

    #[test]
    fn test_microsecond_range() {
        assert_eq!(StMin::from_byte(0xF1).duration(), Duration::from_micros(100));
        assert_eq!(StMin::from_byte(0xF9).duration(), Duration::from_micros(900));
    }

    #[test]
    fn test_from_duration() {
        assert_eq!(StMin::from_duration(Duration::ZERO).as_byte(), 0x00);
        assert_eq!(StMin::from_duration(Duration::from_micros(250)).as_byte(), 0xF3);
        assert_eq!(StMin::from_duration(Duration::from_millis(5)).as_byte(), 0x05);
        assert_eq!(StMin::from_duration(Duration::from_secs(1)).as_byte(), 0x7F);
    }

    proptest! {
        #[test]
        fn reserved_values_normalise_to_127ms(
            raw in prop_oneof![0x80u8..=0xF0, 0xFAu8..=0xFF]
        ) {
            let st = StMin::from_byte(raw);
            prop_assert_eq!(st.as_byte(), 0x7F);
            prop_assert_eq!(st.duration(), Duration::from_millis(127));
        }
    }
}
