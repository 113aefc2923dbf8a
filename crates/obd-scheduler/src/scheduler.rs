//! Telemetry poller

use crate::params::VehicleParams;
use crate::PollerError;
use iso_tp::IsoTpChannel;
use obd_protocol::{Obd2, Pid};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Sampling rate for one PID
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidRate {
    pub pid: Pid,
    pub rate_hz: f64,
}

impl PidRate {
    pub fn new(pid: Pid, rate_hz: f64) -> Self {
        Self { pid, rate_hz }
    }
}

/// Configuration for the telemetry poller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// PIDs to poll and their rates
    pub pids: Vec<PidRate>,
    /// Consecutive failures before a PID is backed off
    pub max_retries: u8,
    /// Extra delay added to a backed-off PID's interval
    pub retry_backoff_ms: u64,
    /// Drop PIDs the ECU does not advertise before polling starts
    pub skip_unsupported: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            pids: vec![
                PidRate::new(Pid::Rpm, 5.0),
                PidRate::new(Pid::Speed, 5.0),
                PidRate::new(Pid::ThrottlePosition, 5.0),
                PidRate::new(Pid::EngineLoad, 5.0),
                PidRate::new(Pid::CoolantTemp, 1.0),
                PidRate::new(Pid::Maf, 1.0),
                PidRate::new(Pid::TimingAdvance, 1.0),
                PidRate::new(Pid::IntakeAirTemp, 0.5),
                PidRate::new(Pid::FuelPressure, 0.5),
            ],
            max_retries: 3,
            retry_backoff_ms: 1000,
            skip_unsupported: true,
        }
    }
}

impl PollerConfig {
    pub fn validate(&self) -> Result<(), PollerError> {
        if self.pids.is_empty() {
            return Err(PollerError::NoPids);
        }
        for rate in &self.pids {
            if !(rate.rate_hz.is_finite() && rate.rate_hz > 0.0) {
                return Err(PollerError::InvalidRate {
                    pid: rate.pid.as_hex(),
                    rate_hz: rate.rate_hz,
                });
            }
        }
        Ok(())
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// One PID in the poll queue.
///
/// The queue pops the earliest deadline. Among PIDs due at the same instant
/// the higher sampling priority goes first, then the one with fewer
/// consecutive failures, so a struggling PID never starves a healthy one.
#[derive(Debug, Clone)]
pub struct ScheduledPid {
    pub pid: Pid,
    pub due: Instant,
    pub priority: u8,
    /// Consecutive failed reads
    pub failures: u8,
    period: Duration,
}

impl ScheduledPid {
    pub fn new(rate: PidRate) -> Self {
        Self {
            pid: rate.pid,
            due: Instant::now(),
            priority: rate.pid.sampling_priority(),
            failures: 0,
            period: Duration::from_secs_f64(rate.rate_hz.recip()),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Record one read and set the next deadline.
    ///
    /// Once `max_retries` reads in a row have failed, each further deadline
    /// is pushed back by `retry_backoff_ms` on top of the period. Returns
    /// whether the PID is backed off.
    pub fn complete(&mut self, succeeded: bool, config: &PollerConfig) -> bool {
        self.failures = if succeeded {
            0
        } else {
            self.failures.saturating_add(1)
        };
        let backed_off = self.failures >= config.max_retries;
        let delay = if backed_off {
            self.period + config.retry_backoff()
        } else {
            self.period
        };
        self.due = Instant::now() + delay;
        backed_off
    }

    fn rank(&self) -> (Reverse<Instant>, u8, Reverse<u8>, Reverse<u8>) {
        (
            Reverse(self.due),
            self.priority,
            Reverse(self.failures),
            Reverse(self.pid.as_hex()),
        )
    }
}

impl PartialEq for ScheduledPid {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank()
    }
}

impl Eq for ScheduledPid {}

impl PartialOrd for ScheduledPid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledPid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Counters returned when the poller stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollerStats {
    pub reads: u64,
    pub failures: u64,
}

/// Stops a running [`TelemetryPoller`]. Stopping is permanent.
#[derive(Debug, Clone)]
pub struct PollerHandle {
    stop: Arc<watch::Sender<bool>>,
}

impl PollerHandle {
    pub fn stop(&self) {
        info!("Stopping telemetry poller");
        self.stop.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }
}

/// Polls mode 01 PIDs in deadline order and writes them into [`VehicleParams`]
pub struct TelemetryPoller {
    queue: BinaryHeap<ScheduledPid>,
    config: PollerConfig,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl TelemetryPoller {
    pub fn new(config: PollerConfig) -> Result<Self, PollerError> {
        config.validate()?;

        let queue: BinaryHeap<_> = config
            .pids
            .iter()
            .map(|rate| ScheduledPid::new(*rate))
            .collect();
        info!("Telemetry poller created with {} PIDs", queue.len());

        let (stop_tx, stop_rx) = watch::channel(false);
        Ok(Self {
            queue,
            config,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        })
    }

    pub fn handle(&self) -> PollerHandle {
        PollerHandle {
            stop: Arc::clone(&self.stop_tx),
        }
    }

    /// Get the number of scheduled PIDs
    pub fn pid_count(&self) -> usize {
        self.queue.len()
    }

    /// Run until stopped through a [`PollerHandle`] or no PIDs remain
    pub async fn run<C: IsoTpChannel>(
        &mut self,
        client: Arc<Mutex<Obd2<C>>>,
        params: Arc<VehicleParams>,
    ) -> PollerStats {
        let mut stats = PollerStats::default();
        if *self.stop_rx.borrow() {
            return stats;
        }

        if self.config.skip_unsupported {
            self.drop_unsupported(&client).await;
        }
        info!("Starting telemetry poller with {} PIDs", self.queue.len());

        while !*self.stop_rx.borrow() {
            let Some(mut scheduled) = self.queue.pop() else {
                warn!("No PIDs left to poll");
                break;
            };

            if scheduled.due > Instant::now() {
                let stopped = tokio::select! {
                    _ = tokio::time::sleep_until(scheduled.due) => false,
                    _ = self.stop_rx.changed() => true,
                };
                if stopped {
                    self.queue.push(scheduled);
                    continue;
                }
            }

            let result = client.lock().await.read_pid(scheduled.pid).await;
            let succeeded = result.is_ok();
            match result {
                Ok(value) => {
                    stats.reads += 1;
                    params.apply(scheduled.pid, value);
                    debug!("PID {:02X} = {} {}", scheduled.pid.as_hex(), value, scheduled.pid.unit());
                }
                Err(e) => {
                    stats.failures += 1;
                    warn!(
                        "PID {:02X} query failed (attempt {}): {}",
                        scheduled.pid.as_hex(),
                        scheduled.failures.saturating_add(1),
                        e
                    );
                }
            }

            if scheduled.complete(succeeded, &self.config) {
                warn!(
                    "Max retries reached for PID {:02X}, backing off {} ms",
                    scheduled.pid.as_hex(),
                    self.config.retry_backoff_ms
                );
            }
            self.queue.push(scheduled);
        }

        info!(
            reads = stats.reads,
            failures = stats.failures,
            "Telemetry poller stopped"
        );
        stats
    }

    async fn drop_unsupported<C: IsoTpChannel>(&mut self, client: &Arc<Mutex<Obd2<C>>>) {
        let mut obd = client.lock().await;
        let mut kept = BinaryHeap::with_capacity(self.queue.len());
        for scheduled in self.queue.drain() {
            if obd.is_pid_supported(scheduled.pid.as_hex()).await {
                kept.push(scheduled);
            } else {
                info!("PID {:02X} not supported, skipping", scheduled.pid.as_hex());
            }
        }
        self.queue = kept;
    }
}
