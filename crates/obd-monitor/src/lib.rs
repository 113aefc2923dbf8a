//! OBD-II Telemetry Monitor
//!
//! Wires a tester node and a simulated engine ECU onto one virtual CAN bus,
//! reads vehicle information once and then polls telemetry until shut down.

pub mod config;
pub mod sim;

pub use config::{LoggingConfig, MonitorConfig, SimConfig};
pub use sim::SimulatedEcu;

use can_transport::{Transport, TransportError, VirtualBus};
use iso_tp::{IsoTp, IsoTpError};
use obd_protocol::{Obd2, ObdError};
use obd_scheduler::{PollerError, PollerHandle, TelemetryPoller, VehicleParams, VehicleSnapshot};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Monitor errors
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("Logging already initialised: {0}")]
    Logging(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("ISO-TP error: {0}")]
    IsoTp(#[from] IsoTpError),

    #[error("OBD error: {0}")]
    Obd(#[from] ObdError),

    #[error("Poller error: {0}")]
    Poller(#[from] PollerError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), MonitorError> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| MonitorError::InvalidLogLevel(config.level.clone()))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.map_err(|e| MonitorError::Logging(e.to_string()))
}

/// Run the monitor until `shutdown` resolves; returns the final telemetry
pub async fn run(
    config: MonitorConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<VehicleSnapshot, MonitorError> {
    config.validate()?;
    let bus = VirtualBus::new(config.bus.clone());
    let mut poller = TelemetryPoller::new(config.poller.clone())?;
    let handle = poller.handle();

    let ecu = SimulatedEcu::start(
        bus.node("engine-ecu"),
        config.isotp.clone(),
        config.obd.rx_id,
        config.obd.tx_id,
        &config.sim,
    )
    .await?
    .spawn();
    let _tasks = TaskGuard::new(handle.clone(), &ecu);

    let tester = bus.node("tester");
    tester.start().await?;
    let mut obd = Obd2::new(IsoTp::new(tester, config.isotp.clone())?, config.obd.clone())?;

    identify(&mut obd).await;

    let client = Arc::new(Mutex::new(obd));
    let params = Arc::new(VehicleParams::new());
    let poller_task = {
        let client = Arc::clone(&client);
        let params = Arc::clone(&params);
        tokio::spawn(async move { poller.run(client, params).await })
    };

    let mut report = tokio::time::interval(config.report_interval());
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = report.tick() => {
                info!(telemetry = %serde_json::to_string(&params.snapshot())?, "Telemetry");
            }
        }
    }

    handle.stop();
    let stats = poller_task.await?;
    info!(reads = stats.reads, failures = stats.failures, "Monitor stopped");

    Ok(params.snapshot())
}

/// Stops the poller and the simulated ECU when dropped, whichever way
/// [`run`] returns
struct TaskGuard {
    poller: PollerHandle,
    ecu: AbortHandle,
}

impl TaskGuard {
    fn new(poller: PollerHandle, ecu: &JoinHandle<()>) -> Self {
        Self {
            poller,
            ecu: ecu.abort_handle(),
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if !self.poller.is_stopped() {
            self.poller.stop();
        }
        self.ecu.abort();
    }
}

/// One-off vehicle identification and trouble code readout
async fn identify<C: iso_tp::IsoTpChannel>(obd: &mut Obd2<C>) {
    match obd.vin().await {
        Ok(vin) => info!(%vin, "Vehicle identified"),
        Err(e) => warn!("VIN unavailable: {}", e),
    }

    match obd.read_dtcs().await {
        Ok(dtcs) if dtcs.is_empty() => info!("No stored trouble codes"),
        Ok(dtcs) => {
            let codes: Vec<String> = dtcs.iter().map(ToString::to_string).collect();
            warn!(codes = ?codes, "Stored trouble codes");
        }
        Err(e) => warn!("Trouble codes unavailable: {}", e),
    }

    let supported: Vec<String> = {
        obd.refresh_pid_cache().await;
        obd.supported_pids()
            .map(|pid| format!("{:02X}", pid))
            .collect()
    };
    info!(pids = ?supported, "Supported mode 01 PIDs");
}
