//! SAE J1979 scaling formulas shared by several PIDs

/// A × 100 / 255 (%)
pub fn percent(a: u8) -> f32 {
    a as f32 * 100.0 / 255.0
}

/// AB × 100 / 255 (%), used where the ratio may exceed 100
pub fn percent_word(ab: u16) -> f32 {
    ab as f32 * 100.0 / 255.0
}

/// A × 100 / 128 − 100 (%)
pub fn signed_percent(a: u8) -> f32 {
    a as f32 * 100.0 / 128.0 - 100.0
}

/// A − 40 (°C)
pub fn temperature(a: u8) -> i16 {
    a as i16 - 40
}

/// AB / 10 − 40 (°C)
pub fn catalyst_temperature(ab: u16) -> f32 {
    ab as f32 / 10.0 - 40.0
}

/// AB / 4 (rpm)
pub fn rpm(ab: u16) -> f32 {
    ab as f32 / 4.0
}

/// A / 2 − 64 (° before TDC)
pub fn timing_advance(a: u8) -> f32 {
    a as f32 / 2.0 - 64.0
}

/// AB / 100 (g/s)
pub fn maf_rate(ab: u16) -> f32 {
    ab as f32 / 100.0
}

/// A / 200 (V)
pub fn oxygen_voltage(a: u8) -> f32 {
    a as f32 / 200.0
}

/// A − 125 (%)
pub fn torque_percent(a: u8) -> i16 {
    a as i16 - 125
}

/// A × 3 (kPa)
pub fn fuel_pressure(a: u8) -> u16 {
    a as u16 * 3
}

/// A × 10 (g/s)
pub fn max_maf_rate(a: u8) -> u16 {
    a as u16 * 10
}

/// AB × 0.079 (kPa)
pub fn fuel_rail_pressure(ab: u16) -> f32 {
    ab as f32 * 0.079
}

/// AB × 10 (kPa)
pub fn fuel_rail_gauge_pressure(ab: u16) -> u32 {
    ab as u32 * 10
}

/// Signed AB / 4 (Pa)
pub fn evap_vapour_pressure(ab: u16) -> f32 {
    signed_word(ab) as f32 / 4.0
}

/// AB / 200 (kPa)
pub fn abs_evap_vapour_pressure(ab: u16) -> f32 {
    ab as f32 / 200.0
}

/// AB − 32767 (Pa)
pub fn offset_vapour_pressure(ab: u16) -> i32 {
    ab as i32 - 32767
}

/// Two's complement AB
pub fn signed_word(ab: u16) -> i16 {
    ab as i16
}

/// AB / 1000 (V)
pub fn module_voltage(ab: u16) -> f32 {
    ab as f32 / 1000.0
}

/// AB × 2 / 65536 (λ)
pub fn equivalence_ratio(ab: u16) -> f32 {
    ab as f32 * 2.0 / 65536.0
}

/// AB / 128 − 210 (°)
pub fn injection_timing(ab: u16) -> f32 {
    ab as f32 / 128.0 - 210.0
}

/// AB / 20 (L/h)
pub fn fuel_rate(ab: u16) -> f32 {
    ab as f32 / 20.0
}

/// AB / 32 (mg/stroke)
pub fn cylinder_fuel_rate(ab: u16) -> f32 {
    ab as f32 / 32.0
}

/// AB / 1000
pub fn gear_ratio(ab: u16) -> f32 {
    ab as f32 / 1000.0
}

/// A / 2 (%)
pub fn half_percent(a: u8) -> f32 {
    a as f32 / 2.0
}
