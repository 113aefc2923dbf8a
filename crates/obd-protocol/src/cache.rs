//! Supported-PID bitmap cache

use std::time::Duration;
use tokio::time::Instant;

/// Number of 0x20-wide PID ranges tracked (0x01..=0xE0)
pub const PID_RANGES: usize = 7;

/// Mode 01 PIDs advertised by the ECU, one 32-bit word per range.
///
/// Bit 31 of word `n` is PID `n * 0x20 + 1`, bit 0 is PID `n * 0x20 + 0x20`,
/// which doubles as the "next range supported" flag.
#[derive(Debug, Clone)]
pub struct PidSupportCache {
    words: [u32; PID_RANGES],
    refreshed_at: Option<Instant>,
    ttl: Duration,
}

impl PidSupportCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            words: [0; PID_RANGES],
            refreshed_at: None,
            ttl,
        }
    }

    /// PID that requests the bitmap of range `index`
    pub fn range_pid(index: usize) -> u8 {
        (index * 0x20) as u8
    }

    pub fn is_initialised(&self) -> bool {
        self.refreshed_at.is_some()
    }

    /// Never refreshed, or older than the TTL
    pub fn is_stale(&self) -> bool {
        self.refreshed_at
            .map_or(true, |stamp| stamp.elapsed() > self.ttl)
    }

    pub fn clear(&mut self) {
        self.words = [0; PID_RANGES];
    }

    pub fn set_range(&mut self, index: usize, bitmap: u32) {
        if let Some(word) = self.words.get_mut(index) {
            *word = bitmap;
        }
    }

    pub fn mark_refreshed(&mut self) {
        self.refreshed_at = Some(Instant::now());
    }

    /// Force the next lookup to rebuild
    pub fn invalidate(&mut self) {
        self.refreshed_at = None;
    }

    /// Whether `pid` is advertised; PID 0 looks up as PID 1
    pub fn contains(&self, pid: u8) -> bool {
        let adjusted = pid.saturating_sub(1) as usize;
        let index = adjusted / 32;
        let bit = 1u32 << (31 - (adjusted % 32));
        self.words
            .get(index)
            .map_or(false, |word| word & bit != 0)
    }

    /// Every advertised PID in ascending order
    pub fn supported_pids(&self) -> impl Iterator<Item = u8> + '_ {
        self.words.iter().enumerate().flat_map(|(index, word)| {
            (0..32u32)
                .filter(move |bit| word & (1 << (31 - bit)) != 0)
                .map(move |bit| (index * 32 + bit as usize + 1) as u8)
        })
    }

    pub fn words(&self) -> &[u32; PID_RANGES] {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bit_layout() {
        let mut cache = PidSupportCache::new(Duration::from_secs(60));
        cache.set_range(0, 0xBE1F_A813);
        assert!(cache.contains(0x01));
        assert!(!cache.contains(0x02));
        assert!(cache.contains(0x0C));
        assert!(cache.contains(0x0D));
        assert!(cache.contains(0x20));
        assert!(!cache.contains(0x1E));
        assert!(cache.contains(0x00));
    }

    #[test]
    fn test_out_of_range_pid_is_unsupported() {
        let mut cache = PidSupportCache::new(Duration::from_secs(60));
        for index in 0..PID_RANGES {
            cache.set_range(index, u32::MAX);
        }
        assert!(cache.contains(0xE0));
        assert!(!cache.contains(0xE1));
        assert!(!cache.contains(0xFF));
    }

    #[test]
    fn test_supported_pid_listing() {
        let mut cache = PidSupportCache::new(Duration::from_secs(60));
        cache.set_range(0, 0x8000_0001);
        cache.set_range(2, 0x4000_0000);
        assert_eq!(cache.supported_pids().collect::<Vec<_>>(), vec![0x01, 0x20, 0x42]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let mut cache = PidSupportCache::new(Duration::from_secs(60));
        assert!(cache.is_stale());
        cache.mark_refreshed();
        assert!(cache.is_initialised());
        assert!(!cache.is_stale());
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.is_stale());
        cache.mark_refreshed();
        cache.invalidate();
        assert!(cache.is_stale());
    }

    proptest! {
        #[test]
        fn lookup_matches_bitmap(words in proptest::array::uniform7(any::<u32>()), pid in 1u8..=0xE0) {
            let mut cache = PidSupportCache::new(Duration::from_secs(60));
            for (index, word) in words.iter().enumerate() {
                cache.set_range(index, *word);
            }
            let adjusted = (pid - 1) as usize;
            let expected = words[adjusted / 32] >> (31 - adjusted % 32) & 1 == 1;
            prop_assert_eq!(cache.contains(pid), expected);
            prop_assert_eq!(cache.supported_pids().any(|p| p == pid), expected);
        }
    }
}
