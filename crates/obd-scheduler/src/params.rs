//! Shared vehicle telemetry

use obd_protocol::Pid;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tracing::trace;

/// Point-in-time copy of every telemetry value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    /// Engine speed (rpm)
    pub rpm: f32,
    /// Vehicle speed (km/h)
    pub speed: u8,
    /// Engine coolant temperature (°C)
    pub coolant_temp: i16,
    /// Throttle position (%)
    pub throttle_position: f32,
    /// Calculated engine load (%)
    pub engine_load: f32,
    /// Intake air temperature (°C)
    pub intake_air_temp: i16,
    /// Mass air flow (g/s)
    pub maf_rate: f32,
    /// Fuel pressure (kPa)
    pub fuel_pressure: u16,
    /// Timing advance (° before TDC)
    pub timing_advance: f32,
    /// Time of the most recent write
    pub updated_at: Option<SystemTime>,
}

/// Telemetry values shared between the poller and readers.
///
/// Each getter and setter takes the lock once, so individual values are never
/// torn. Use [`VehicleParams::snapshot`] for a consistent view of all fields.
#[derive(Debug, Default)]
pub struct VehicleParams {
    inner: Mutex<VehicleSnapshot>,
}

macro_rules! accessors {
    ($($field:ident, $setter:ident: $ty:ty;)*) => {
        $(
            pub fn $field(&self) -> $ty {
                self.lock().$field
            }

            pub fn $setter(&self, value: $ty) {
                let mut inner = self.lock();
                inner.$field = value;
                inner.updated_at = Some(SystemTime::now());
            }
        )*
    };
}

impl VehicleParams {
    pub fn new() -> Self {
        Self::default()
    }

    accessors! {
        rpm, set_rpm: f32;
        speed, set_speed: u8;
        coolant_temp, set_coolant_temp: i16;
        throttle_position, set_throttle_position: f32;
        engine_load, set_engine_load: f32;
        intake_air_temp, set_intake_air_temp: i16;
        maf_rate, set_maf_rate: f32;
        fuel_pressure, set_fuel_pressure: u16;
        timing_advance, set_timing_advance: f32;
    }

    pub fn updated_at(&self) -> Option<SystemTime> {
        self.lock().updated_at
    }

    /// Copy of all values under a single lock
    pub fn snapshot(&self) -> VehicleSnapshot {
        self.lock().clone()
    }

    /// Store a decoded PID value in its field.
    ///
    /// Returns false for PIDs that have no field here.
    pub fn apply(&self, pid: Pid, value: f64) -> bool {
        match pid {
            Pid::Rpm => self.set_rpm(value as f32),
            Pid::Speed => self.set_speed(value.round() as u8),
            Pid::CoolantTemp => self.set_coolant_temp(value.round() as i16),
            Pid::ThrottlePosition => self.set_throttle_position(value as f32),
            Pid::EngineLoad => self.set_engine_load(value as f32),
            Pid::IntakeAirTemp => self.set_intake_air_temp(value.round() as i16),
            Pid::Maf => self.set_maf_rate(value as f32),
            Pid::FuelPressure => self.set_fuel_pressure(value.round() as u16),
            Pid::TimingAdvance => self.set_timing_advance(value as f32),
            _ => {
                trace!("No telemetry field for PID {:02X}", pid.as_hex());
                return false;
            }
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, VehicleSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
