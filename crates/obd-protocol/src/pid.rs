//! Telemetry PIDs polled by the monitor
//!
//! A subset of mode 01 with a single scalar value each. The full getter set
//! lives in the `pids` module.

use crate::formula;
use crate::response::{Letter, Response};
use serde::{Deserialize, Serialize};

/// Scalar mode 01 PIDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Pid {
    /// Calculated engine load (0x04)
    EngineLoad = 0x04,
    /// Engine coolant temperature (0x05)
    CoolantTemp = 0x05,
    /// Short-term fuel trim bank 1 (0x06)
    ShortFuelTrim = 0x06,
    /// Long-term fuel trim bank 1 (0x07)
    LongFuelTrim = 0x07,
    /// Fuel pressure (0x0A)
    FuelPressure = 0x0A,
    /// Intake manifold absolute pressure (0x0B)
    IntakeManifoldPressure = 0x0B,
    /// Engine RPM (0x0C)
    Rpm = 0x0C,
    /// Vehicle speed (0x0D)
    Speed = 0x0D,
    /// Timing advance (0x0E)
    TimingAdvance = 0x0E,
    /// Intake air temperature (0x0F)
    IntakeAirTemp = 0x0F,
    /// Mass air flow rate (0x10)
    Maf = 0x10,
    /// Throttle position (0x11)
    ThrottlePosition = 0x11,
    /// Oxygen sensor 1 voltage (0x14)
    O2Voltage = 0x14,
    /// Fuel tank level (0x2F)
    FuelLevel = 0x2F,
    /// Control module voltage (0x42)
    ControlModuleVoltage = 0x42,
    /// Ambient air temperature (0x46)
    AmbientAirTemp = 0x46,
    /// Engine oil temperature (0x5C)
    OilTemp = 0x5C,
    /// Engine fuel rate (0x5E)
    FuelRate = 0x5E,
}

impl Pid {
    pub const ALL: [Pid; 18] = [
        Pid::EngineLoad,
        Pid::CoolantTemp,
        Pid::ShortFuelTrim,
        Pid::LongFuelTrim,
        Pid::FuelPressure,
        Pid::IntakeManifoldPressure,
        Pid::Rpm,
        Pid::Speed,
        Pid::TimingAdvance,
        Pid::IntakeAirTemp,
        Pid::Maf,
        Pid::ThrottlePosition,
        Pid::O2Voltage,
        Pid::FuelLevel,
        Pid::ControlModuleVoltage,
        Pid::AmbientAirTemp,
        Pid::OilTemp,
        Pid::FuelRate,
    ];

    /// Get the PID hex value
    pub fn as_hex(&self) -> u8 {
        *self as u8
    }

    pub fn from_hex(pid: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_hex() == pid)
    }

    /// Get the number of response bytes for this PID
    pub fn response_bytes(&self) -> usize {
        match self {
            Pid::Rpm
            | Pid::Maf
            | Pid::O2Voltage
            | Pid::ControlModuleVoltage
            | Pid::FuelRate => 2,
            _ => 1,
        }
    }

    /// Get the sampling priority (higher = more frequent)
    pub fn sampling_priority(&self) -> u8 {
        match self {
            Pid::Rpm | Pid::Speed | Pid::ThrottlePosition | Pid::EngineLoad => 10,
            Pid::Maf | Pid::TimingAdvance | Pid::IntakeManifoldPressure => 5,
            _ => 2,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Pid::EngineLoad
            | Pid::ShortFuelTrim
            | Pid::LongFuelTrim
            | Pid::ThrottlePosition
            | Pid::FuelLevel => "%",
            Pid::CoolantTemp | Pid::IntakeAirTemp | Pid::AmbientAirTemp | Pid::OilTemp => "°C",
            Pid::FuelPressure | Pid::IntakeManifoldPressure => "kPa",
            Pid::Rpm => "rpm",
            Pid::Speed => "km/h",
            Pid::TimingAdvance => "°",
            Pid::Maf => "g/s",
            Pid::O2Voltage | Pid::ControlModuleVoltage => "V",
            Pid::FuelRate => "L/h",
        }
    }

    /// Scale the data bytes of a positive response
    pub fn decode(&self, response: &Response) -> f64 {
        let a = response[Letter::A];
        let ab = response.word(Letter::A);
        match self {
            Pid::EngineLoad | Pid::ThrottlePosition | Pid::FuelLevel => formula::percent(a) as f64,
            Pid::CoolantTemp | Pid::IntakeAirTemp | Pid::AmbientAirTemp | Pid::OilTemp => {
                formula::temperature(a) as f64
            }
            Pid::ShortFuelTrim | Pid::LongFuelTrim => formula::signed_percent(a) as f64,
            Pid::FuelPressure => formula::fuel_pressure(a) as f64,
            Pid::IntakeManifoldPressure | Pid::Speed => a as f64,
            Pid::Rpm => formula::rpm(ab) as f64,
            Pid::TimingAdvance => formula::timing_advance(a) as f64,
            Pid::Maf => formula::maf_rate(ab) as f64,
            Pid::O2Voltage => formula::oxygen_voltage(a) as f64,
            Pid::ControlModuleVoltage => formula::module_voltage(ab) as f64,
            Pid::FuelRate => formula::fuel_rate(ab) as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpm_decode() {
        // 1A F8 => (0x1AF8) / 4 = 6904 / 4 = 1726
        let value = Pid::Rpm.decode(&Response::new(&[0x1A, 0xF8]));
        assert!((value - 1726.0).abs() < 0.01);
    }

    #[test]
    fn test_coolant_temp_decode() {
        // 0x7B = 123, so temp = 123 - 40 = 83°C
        let value = Pid::CoolantTemp.decode(&Response::new(&[0x7B]));
        assert!((value - 83.0).abs() < 0.01);
    }

    #[test]
    fn test_speed_decode() {
        let value = Pid::Speed.decode(&Response::new(&[0x55]));
        assert!((value - 85.0).abs() < 0.01);
    }

    #[test]
    fn test_fuel_trim_decode() {
        let value = Pid::ShortFuelTrim.decode(&Response::new(&[0x80]));
        assert!((value - 0.0).abs() < 0.01);

        // 0x90 = 144, so trim = 144*100/128 - 100 = 12.5%
        let value = Pid::LongFuelTrim.decode(&Response::new(&[0x90]));
        assert!((value - 12.5).abs() < 0.01);
    }

    #[test]
    fn test_hex_lookup() {
        for pid in Pid::ALL {
            assert_eq!(Pid::from_hex(pid.as_hex()), Some(pid));
        }
        assert_eq!(Pid::from_hex(0x00), None);
        assert_eq!(Pid::Rpm.response_bytes(), 2);
        assert_eq!(Pid::Speed.response_bytes(), 1);
    }
}
