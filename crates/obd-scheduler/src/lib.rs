//! OBD-II Telemetry Polling
//!
//! Priority-based scheduling of mode 01 reads into a shared, lock-guarded
//! telemetry snapshot.

mod params;
mod scheduler;

pub use params::{VehicleParams, VehicleSnapshot};
pub use scheduler::{PidRate, PollerConfig, PollerHandle, PollerStats, ScheduledPid, TelemetryPoller};

use thiserror::Error;

/// Poller configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PollerError {
    #[error("No PIDs configured")]
    NoPids,

    #[error("Invalid rate {rate_hz} Hz for PID {pid:02X}")]
    InvalidRate { pid: u8, rate_hz: f64 },
}
