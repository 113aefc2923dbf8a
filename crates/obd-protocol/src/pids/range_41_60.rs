use crate::client::Obd2;
use crate::formula;
use crate::response::Letter::A;
use iso_tp::IsoTpChannel;

impl<T: IsoTpChannel> Obd2<T> {
    /// PIDs 0x41..=0x60 supported (bit encoded)
    pub async fn supported_pids_41_60(&mut self) -> Option<u32> {
        self.supported_pids_bitmap(0x40).await.ok()
    }

    /// Monitor status this drive cycle (bit encoded)
    pub async fn monitor_drive_cycle_status(&mut self) -> Option<u32> {
        self.current_data(0x41, 4).await.map(|r| r.dword())
    }

    /// Control module voltage (V)
    pub async fn control_module_voltage(&mut self) -> Option<f32> {
        self.current_data(0x42, 2)
            .await
            .map(|r| formula::module_voltage(r.word(A)))
    }

    /// Absolute load value (%); may exceed 100
    pub async fn absolute_load(&mut self) -> Option<f32> {
        self.current_data(0x43, 2)
            .await
            .map(|r| formula::percent_word(r.word(A)))
    }

    /// Commanded air-fuel equivalence ratio (λ)
    pub async fn commanded_air_fuel_ratio(&mut self) -> Option<f32> {
        self.current_data(0x44, 2)
            .await
            .map(|r| formula::equivalence_ratio(r.word(A)))
    }

    /// Relative throttle position (%)
    pub async fn relative_throttle(&mut self) -> Option<f32> {
        self.percent_pid(0x45).await
    }

    /// Ambient air temperature (°C)
    pub async fn ambient_air_temp(&mut self) -> Option<i16> {
        self.current_data(0x46, 1).await.map(|r| formula::temperature(r[A]))
    }

    /// Absolute throttle position B (%)
    pub async fn abs_throttle_position_b(&mut self) -> Option<f32> {
        self.percent_pid(0x47).await
    }

    /// Absolute throttle position C (%)
    pub async fn abs_throttle_position_c(&mut self) -> Option<f32> {
        self.percent_pid(0x48).await
    }

    /// Accelerator pedal position D (%)
    pub async fn abs_throttle_position_d(&mut self) -> Option<f32> {
        self.percent_pid(0x49).await
    }

    /// Accelerator pedal position E (%)
    pub async fn abs_throttle_position_e(&mut self) -> Option<f32> {
        self.percent_pid(0x4A).await
    }

    /// Accelerator pedal position F (%)
    pub async fn abs_throttle_position_f(&mut self) -> Option<f32> {
        self.percent_pid(0x4B).await
    }

    /// Commanded throttle actuator (%)
    pub async fn commanded_throttle_actuator(&mut self) -> Option<f32> {
        self.percent_pid(0x4C).await
    }

    /// Time run with MIL on (min)
    pub async fn time_run_with_mil(&mut self) -> Option<u16> {
        self.current_data(0x4D, 2).await.map(|r| r.word(A))
    }

    /// Time since trouble codes cleared (min)
    pub async fn time_since_codes_cleared(&mut self) -> Option<u16> {
        self.current_data(0x4E, 2).await.map(|r| r.word(A))
    }

    /// Maximum value for MAF rate (g/s)
    pub async fn max_maf_rate(&mut self) -> Option<u16> {
        self.current_data(0x50, 1).await.map(|r| formula::max_maf_rate(r[A]))
    }

    /// Fuel type code
    pub async fn fuel_type(&mut self) -> Option<u8> {
        self.current_data(0x51, 1).await.map(|r| r[A])
    }

    /// Ethanol fuel (%)
    pub async fn ethanol_percent(&mut self) -> Option<f32> {
        self.percent_pid(0x52).await
    }

    /// Absolute evap system vapour pressure (kPa)
    pub async fn abs_evap_vapour_pressure(&mut self) -> Option<f32> {
        self.current_data(0x53, 2)
            .await
            .map(|r| formula::abs_evap_vapour_pressure(r.word(A)))
    }

    /// Evap system vapour pressure (Pa)
    pub async fn evap_vapour_pressure_2(&mut self) -> Option<i32> {
        self.current_data(0x54, 2)
            .await
            .map(|r| formula::offset_vapour_pressure(r.word(A)))
    }

    /// Short-term secondary oxygen sensor trim, banks 1 and 3 (%)
    pub async fn short_term_secondary_o2_trim_1_3(&mut self) -> Option<f32> {
        self.secondary_trim(0x55).await
    }

    /// Long-term secondary oxygen sensor trim, banks 1 and 3 (%)
    pub async fn long_term_secondary_o2_trim_1_3(&mut self) -> Option<f32> {
        self.secondary_trim(0x56).await
    }

    /// Short-term secondary oxygen sensor trim, banks 2 and 4 (%)
    pub async fn short_term_secondary_o2_trim_2_4(&mut self) -> Option<f32> {
        self.secondary_trim(0x57).await
    }

    /// Long-term secondary oxygen sensor trim, banks 2 and 4 (%)
    pub async fn long_term_secondary_o2_trim_2_4(&mut self) -> Option<f32> {
        self.secondary_trim(0x58).await
    }

    async fn secondary_trim(&mut self, pid: u8) -> Option<f32> {
        self.current_data(pid, 1)
            .await
            .map(|r| formula::signed_percent(r[A]))
    }

    /// Fuel rail absolute pressure (kPa)
    pub async fn abs_fuel_rail_pressure(&mut self) -> Option<u32> {
        self.current_data(0x59, 2)
            .await
            .map(|r| formula::fuel_rail_gauge_pressure(r.word(A)))
    }

    /// Relative accelerator pedal position (%)
    pub async fn relative_pedal_position(&mut self) -> Option<f32> {
        self.percent_pid(0x5A).await
    }

    /// Hybrid battery pack remaining life (%)
    pub async fn hybrid_battery_life(&mut self) -> Option<f32> {
        self.percent_pid(0x5B).await
    }

    /// Engine oil temperature (°C)
    pub async fn oil_temp(&mut self) -> Option<i16> {
        self.current_data(0x5C, 1).await.map(|r| formula::temperature(r[A]))
    }

    /// Fuel injection timing (°)
    pub async fn fuel_injection_timing(&mut self) -> Option<f32> {
        self.current_data(0x5D, 2)
            .await
            .map(|r| formula::injection_timing(r.word(A)))
    }

    /// Engine fuel rate (L/h)
    pub async fn fuel_rate(&mut self) -> Option<f32> {
        self.current_data(0x5E, 2)
            .await
            .map(|r| formula::fuel_rate(r.word(A)))
    }

    /// Emission requirements the vehicle is designed to
    pub async fn emission_requirements(&mut self) -> Option<u8> {
        self.current_data(0x5F, 1).await.map(|r| r[A])
    }

    async fn percent_pid(&mut self, pid: u8) -> Option<f32> {
        self.current_data(pid, 1).await.map(|r| formula::percent(r[A]))
    }
}
