//! Per-call ISO-TP session state

use crate::pdu::FlowStatus;
use crate::st_min::StMin;
use std::time::Duration;
use tokio::time::Instant;

/// Session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Send,
    WaitFirstFc,
    WaitFc,
    SendCf,
    WaitData,
    Finished,
    Error,
}

/// Next consecutive-frame sequence counter.
///
/// The counter wraps at 16 unless the peer's block size is 16 or more, in
/// which case it wraps at the block size. Only the low nibble goes on the wire.
pub fn next_seq(seq: u8, block_size: u8) -> u8 {
    let modulus: u16 = if block_size >= 16 { block_size as u16 } else { 16 };
    ((seq as u16 + 1) % modulus) as u8
}

/// State of one in-flight message
#[derive(Debug)]
pub(crate) struct Session {
    pub state: SessionState,
    pub seq_id: u8,
    pub block_size: u8,
    pub st_min: StMin,
    pub fc_status: FlowStatus,
    /// Bytes still to transfer
    pub rest: usize,
    pub fc_wait_frames_seen: u8,
    /// CFs sent since the last CTS
    pub cf_in_block: u8,
    /// Next payload offset
    pub offset: usize,
    deadline: Instant,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            seq_id: 0,
            block_size: 0,
            st_min: StMin::ZERO,
            fc_status: FlowStatus::ClearToSend,
            rest: 0,
            fc_wait_frames_seen: 0,
            cf_in_block: 0,
            offset: 0,
            deadline: Instant::now(),
        }
    }

    /// Arm the phase deadline `timeout` from now
    pub fn arm(&mut self, timeout: Duration) {
        self.deadline = Instant::now() + timeout;
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn transition(&mut self, next: SessionState) {
        tracing::trace!(from = ?self.state, to = ?next, "ISO-TP state");
        self.state = next;
    }

    /// Return to `Idle`, dropping all per-message progress
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
