use crate::client::Obd2;
use crate::formula;
use crate::response::Letter::{A, B, C, D, E, F, G};
use iso_tp::IsoTpChannel;

impl<T: IsoTpChannel> Obd2<T> {
    /// PIDs 0x81..=0xA0 supported (bit encoded)
    pub async fn supported_pids_81_a0(&mut self) -> Option<u32> {
        self.supported_pids_bitmap(0x80).await.ok()
    }

    /// PIDs 0xA1..=0xC0 supported (bit encoded)
    pub async fn supported_pids_a1_c0(&mut self) -> Option<u32> {
        self.supported_pids_bitmap(0xA0).await.ok()
    }

    /// PIDs 0xC1..=0xE0 supported (bit encoded)
    pub async fn supported_pids_c1_e0(&mut self) -> Option<u32> {
        self.supported_pids_bitmap(0xC0).await.ok()
    }

    /// NOx sensor corrected data, sensors 1..=4 (ppm)
    pub async fn nox_sensor_corrected_data(&mut self) -> Option<[u16; 4]> {
        self.current_data(0xA1, 8)
            .await
            .map(|r| [A, C, E, G].map(|hi| r.word(hi)))
    }

    /// Cylinder fuel rate (mg/stroke)
    pub async fn cylinder_fuel_rate(&mut self) -> Option<f32> {
        self.current_data(0xA2, 2)
            .await
            .map(|r| formula::cylinder_fuel_rate(r.word(A)))
    }

    /// Evap system vapour pressures (Pa)
    pub async fn evap_system_vapour_pressures(&mut self) -> Option<[i16; 4]> {
        self.current_data(0xA3, 8)
            .await
            .map(|r| [A, C, E, G].map(|hi| formula::signed_word(r.word(hi))))
    }

    /// Transmission actual gear ratio, when reported
    pub async fn transmission_actual_gear(&mut self) -> Option<f32> {
        let r = self.current_data(0xA4, 4).await?;
        (r[A] & 0x02 != 0).then(|| formula::gear_ratio(r.word(C)))
    }

    /// Commanded diesel exhaust fluid dosing (%), when reported
    pub async fn commanded_def_dosing(&mut self) -> Option<f32> {
        let r = self.current_data(0xA5, 2).await?;
        (r[A] & 0x01 != 0).then(|| formula::half_percent(r[B]))
    }

    /// Odometer as reported (raw ABCD)
    pub async fn odometer(&mut self) -> Option<u32> {
        self.current_data(0xA6, 4).await.map(|r| r.dword())
    }

    /// NOx sensor concentration, sensors 3 and 4 (ppm)
    pub async fn nox_concentration_3_4(&mut self) -> Option<[u16; 2]> {
        self.current_data(0xA7, 4)
            .await
            .map(|r| [r.word(A), r.word(C)])
    }

    /// NOx sensor corrected concentration, sensors 3 and 4 (ppm)
    pub async fn nox_corrected_concentration_3_4(&mut self) -> Option<[u16; 2]> {
        self.current_data(0xA8, 4)
            .await
            .map(|r| [r.word(A), r.word(C)])
    }

    /// ABS disable switch state, when reported
    pub async fn abs_disable_switch(&mut self) -> Option<bool> {
        let r = self.current_data(0xA9, 2).await?;
        (r[A] & 0x01 != 0).then(|| r[B] & 0x01 != 0)
    }

    /// Fuel level input A and B (%)
    pub async fn fuel_level_input_ab(&mut self) -> Option<[f32; 2]> {
        self.current_data(0xC3, 4)
            .await
            .map(|r| [formula::percent_word(r.word(A)), formula::percent_word(r.word(C))])
    }

    /// Exhaust particulate control diagnostic time (s) and count
    pub async fn exhaust_particulate_diagnostic(&mut self) -> Option<[u32; 2]> {
        self.current_data(0xC4, 6)
            .await
            .map(|r| [r.dword(), r.word(E) as u32])
    }

    /// Fuel pressure A and B (kPa)
    pub async fn fuel_pressure_ab(&mut self) -> Option<[u16; 2]> {
        self.current_data(0xC5, 4)
            .await
            .map(|r| [r.word(A), r.word(C)])
    }

    /// Particulate control driver inducement status and counters
    pub async fn particulate_driver_inducement(&mut self) -> Option<[u16; 4]> {
        self.current_data(0xC6, 7)
            .await
            .map(|r| [r[A] as u16, r.word(B), r.word(D), r.word(F)])
    }

    /// Distance since reflash or module replacement (km)
    pub async fn distance_since_reflash(&mut self) -> Option<u16> {
        self.current_data(0xC7, 2).await.map(|r| r.word(A))
    }

    /// NOx/particulate control diagnostic warning lamp status
    pub async fn nox_particulate_warning_lamp(&mut self) -> Option<u8> {
        self.current_data(0xC8, 1).await.map(|r| r[A])
    }
}
