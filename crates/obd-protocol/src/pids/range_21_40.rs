use crate::client::Obd2;
use crate::formula;
use crate::response::Letter::A;
use iso_tp::IsoTpChannel;

impl<T: IsoTpChannel> Obd2<T> {
    /// PIDs 0x21..=0x40 supported (bit encoded)
    pub async fn supported_pids_21_40(&mut self) -> Option<u32> {
        self.supported_pids_bitmap(0x20).await.ok()
    }

    /// Distance traveled with the MIL on (km)
    pub async fn distance_with_mil(&mut self) -> Option<u16> {
        self.current_data(0x21, 2).await.map(|r| r.word(A))
    }

    /// Fuel rail pressure relative to manifold vacuum (kPa)
    pub async fn fuel_rail_pressure(&mut self) -> Option<f32> {
        self.current_data(0x22, 2)
            .await
            .map(|r| formula::fuel_rail_pressure(r.word(A)))
    }

    /// Fuel rail gauge pressure, diesel or direct injection (kPa)
    pub async fn fuel_rail_gauge_pressure(&mut self) -> Option<u32> {
        self.current_data(0x23, 2)
            .await
            .map(|r| formula::fuel_rail_gauge_pressure(r.word(A)))
    }

    /// Commanded EGR (%)
    pub async fn commanded_egr(&mut self) -> Option<f32> {
        self.current_data(0x2C, 1).await.map(|r| formula::percent(r[A]))
    }

    /// EGR error (%)
    pub async fn egr_error(&mut self) -> Option<f32> {
        self.current_data(0x2D, 1)
            .await
            .map(|r| formula::signed_percent(r[A]))
    }

    /// Commanded evaporative purge (%)
    pub async fn commanded_evap_purge(&mut self) -> Option<f32> {
        self.current_data(0x2E, 1).await.map(|r| formula::percent(r[A]))
    }

    /// Fuel tank level input (%)
    pub async fn fuel_level(&mut self) -> Option<f32> {
        self.current_data(0x2F, 1).await.map(|r| formula::percent(r[A]))
    }

    /// Warm-ups since codes cleared
    pub async fn warm_ups_since_codes_cleared(&mut self) -> Option<u8> {
        self.current_data(0x30, 1).await.map(|r| r[A])
    }

    /// Distance traveled since codes cleared (km)
    pub async fn distance_since_codes_cleared(&mut self) -> Option<u16> {
        self.current_data(0x31, 2).await.map(|r| r.word(A))
    }

    /// Evaporative system vapour pressure (Pa)
    pub async fn evap_vapour_pressure(&mut self) -> Option<f32> {
        self.current_data(0x32, 2)
            .await
            .map(|r| formula::evap_vapour_pressure(r.word(A)))
    }

    /// Absolute barometric pressure (kPa)
    pub async fn abs_baro_pressure(&mut self) -> Option<u8> {
        self.current_data(0x33, 1).await.map(|r| r[A])
    }

    /// Catalyst temperature, bank 1 sensor 1 (°C)
    pub async fn catalyst_temp_b1s1(&mut self) -> Option<f32> {
        self.catalyst_temp(0x3C).await
    }

    /// Catalyst temperature, bank 2 sensor 1 (°C)
    pub async fn catalyst_temp_b2s1(&mut self) -> Option<f32> {
        self.catalyst_temp(0x3D).await
    }

    /// Catalyst temperature, bank 1 sensor 2 (°C)
    pub async fn catalyst_temp_b1s2(&mut self) -> Option<f32> {
        self.catalyst_temp(0x3E).await
    }

    /// Catalyst temperature, bank 2 sensor 2 (°C)
    pub async fn catalyst_temp_b2s2(&mut self) -> Option<f32> {
        self.catalyst_temp(0x3F).await
    }

    async fn catalyst_temp(&mut self, pid: u8) -> Option<f32> {
        self.current_data(pid, 2)
            .await
            .map(|r| formula::catalyst_temperature(r.word(A)))
    }
}
