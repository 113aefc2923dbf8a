//! Monitor configuration
//!
//! Defaults, overlaid by an optional TOML file, overlaid by `OBD_MONITOR__*`
//! environment variables (`OBD_MONITOR__OBD__REQUEST_TIMEOUT_MS=2000`).

use crate::MonitorError;
use can_transport::VirtualBusConfig;
use ::config::{Config, Environment, File};
use iso_tp::IsoTpConfig;
use obd_protocol::Obd2Config;
use obd_scheduler::PollerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "obd-monitor.toml";
/// Environment variable prefix
pub const ENV_PREFIX: &str = "OBD_MONITOR";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Simulated ECU contents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub vin: String,
    /// Stored trouble codes, raw two-byte form
    pub dtcs: Vec<u16>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            vin: "1D4GP00R55B123456".to_string(),
            dtcs: vec![0x0420, 0x0133],
        }
    }
}

/// Top-level monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub logging: LoggingConfig,
    pub bus: VirtualBusConfig,
    pub isotp: IsoTpConfig,
    pub obd: Obd2Config,
    pub poller: PollerConfig,
    pub sim: SimConfig,
    /// Period of the telemetry log line (milliseconds)
    pub report_interval_ms: u64,
    /// Stop after this long; run until Ctrl-C when absent
    pub run_for_ms: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            bus: VirtualBusConfig::default(),
            isotp: IsoTpConfig::default(),
            obd: Obd2Config::default(),
            poller: PollerConfig::default(),
            sim: SimConfig::default(),
            report_interval_ms: 1000,
            run_for_ms: None,
        }
    }
}

impl MonitorConfig {
    /// Load from `path` (required) or [`DEFAULT_CONFIG_FILE`] (optional),
    /// then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: MonitorConfig = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        self.obd.validate()?;
        self.poller.validate()?;
        if self.report_interval_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "report_interval_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    pub fn run_for(&self) -> Option<Duration> {
        self.run_for_ms.map(Duration::from_millis)
    }
}
