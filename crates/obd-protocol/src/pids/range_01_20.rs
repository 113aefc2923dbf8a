use crate::client::Obd2;
use crate::formula;
use crate::response::Letter::{A, B};
use iso_tp::IsoTpChannel;

impl<T: IsoTpChannel> Obd2<T> {
    /// PIDs 0x01..=0x20 supported (bit encoded)
    pub async fn supported_pids_01_20(&mut self) -> Option<u32> {
        self.supported_pids_bitmap(0x00).await.ok()
    }

    /// Monitor status since DTCs cleared, including MIL state and DTC count
    pub async fn monitor_status(&mut self) -> Option<u32> {
        self.current_data(0x01, 4).await.map(|r| r.dword())
    }

    /// DTC that caused the freeze frame
    pub async fn freeze_dtc(&mut self) -> Option<u16> {
        self.current_data(0x02, 2).await.map(|r| r.word(A))
    }

    /// Fuel system status (bit encoded, one byte per system)
    pub async fn fuel_system_status(&mut self) -> Option<u16> {
        self.current_data(0x03, 2).await.map(|r| r.word(A))
    }

    /// Calculated engine load (%)
    pub async fn engine_load(&mut self) -> Option<f32> {
        self.current_data(0x04, 1).await.map(|r| formula::percent(r[A]))
    }

    /// Engine coolant temperature (°C)
    pub async fn engine_coolant_temp(&mut self) -> Option<i16> {
        self.current_data(0x05, 1).await.map(|r| formula::temperature(r[A]))
    }

    /// Short-term fuel trim, bank 1 (%)
    pub async fn short_term_fuel_trim_bank_1(&mut self) -> Option<f32> {
        self.fuel_trim(0x06).await
    }

    /// Long-term fuel trim, bank 1 (%)
    pub async fn long_term_fuel_trim_bank_1(&mut self) -> Option<f32> {
        self.fuel_trim(0x07).await
    }

    /// Short-term fuel trim, bank 2 (%)
    pub async fn short_term_fuel_trim_bank_2(&mut self) -> Option<f32> {
        self.fuel_trim(0x08).await
    }

    /// Long-term fuel trim, bank 2 (%)
    pub async fn long_term_fuel_trim_bank_2(&mut self) -> Option<f32> {
        self.fuel_trim(0x09).await
    }

    async fn fuel_trim(&mut self, pid: u8) -> Option<f32> {
        self.current_data(pid, 1)
            .await
            .map(|r| formula::signed_percent(r[A]))
    }

    /// Fuel pressure, gauge (kPa)
    pub async fn fuel_pressure(&mut self) -> Option<u16> {
        self.current_data(0x0A, 1).await.map(|r| formula::fuel_pressure(r[A]))
    }

    /// Intake manifold absolute pressure (kPa)
    pub async fn manifold_pressure(&mut self) -> Option<u8> {
        self.current_data(0x0B, 1).await.map(|r| r[A])
    }

    /// Engine speed (rpm)
    pub async fn rpm(&mut self) -> Option<f32> {
        self.current_data(0x0C, 2).await.map(|r| formula::rpm(r.word(A)))
    }

    /// Vehicle speed (km/h)
    pub async fn vehicle_speed(&mut self) -> Option<u8> {
        self.current_data(0x0D, 1).await.map(|r| r[A])
    }

    /// Timing advance (° before TDC)
    pub async fn timing_advance(&mut self) -> Option<f32> {
        self.current_data(0x0E, 1)
            .await
            .map(|r| formula::timing_advance(r[A]))
    }

    /// Intake air temperature (°C)
    pub async fn intake_air_temp(&mut self) -> Option<i16> {
        self.current_data(0x0F, 1).await.map(|r| formula::temperature(r[A]))
    }

    /// Mass air flow rate (g/s)
    pub async fn maf_rate(&mut self) -> Option<f32> {
        self.current_data(0x10, 2)
            .await
            .map(|r| formula::maf_rate(r.word(A)))
    }

    /// Throttle position (%)
    pub async fn throttle(&mut self) -> Option<f32> {
        self.current_data(0x11, 1).await.map(|r| formula::percent(r[A]))
    }

    /// Commanded secondary air status (bit encoded)
    pub async fn commanded_secondary_air_status(&mut self) -> Option<u8> {
        self.current_data(0x12, 1).await.map(|r| r[A])
    }

    /// Oxygen sensors present in 2 banks (bit encoded)
    pub async fn oxygen_sensors_present_2_banks(&mut self) -> Option<u8> {
        self.current_data(0x13, 1).await.map(|r| r[A])
    }

    /// Oxygen sensor `sensor` (1..=8) voltage (V)
    pub async fn oxygen_sensor_voltage(&mut self, sensor: u8) -> Option<f32> {
        let pid = oxygen_sensor_pid(sensor)?;
        self.current_data(pid, 2)
            .await
            .map(|r| formula::oxygen_voltage(r[A]))
    }

    /// Oxygen sensor `sensor` (1..=8) short-term fuel trim (%)
    pub async fn oxygen_sensor_fuel_trim(&mut self, sensor: u8) -> Option<f32> {
        let pid = oxygen_sensor_pid(sensor)?;
        self.current_data(pid, 2)
            .await
            .map(|r| formula::signed_percent(r[B]))
    }

    /// OBD standards this vehicle conforms to
    pub async fn obd_standards(&mut self) -> Option<u8> {
        self.current_data(0x1C, 1).await.map(|r| r[A])
    }

    /// Oxygen sensors present in 4 banks (bit encoded)
    pub async fn oxygen_sensors_present_4_banks(&mut self) -> Option<u8> {
        self.current_data(0x1D, 1).await.map(|r| r[A])
    }

    /// Power take-off active
    pub async fn aux_input_status(&mut self) -> Option<bool> {
        self.current_data(0x1E, 1).await.map(|r| r[A] & 0x01 != 0)
    }

    /// Run time since engine start (s)
    pub async fn run_time(&mut self) -> Option<u16> {
        self.current_data(0x1F, 2).await.map(|r| r.word(A))
    }
}

/// PIDs 0x14..=0x1B
fn oxygen_sensor_pid(sensor: u8) -> Option<u8> {
    (1..=8).contains(&sensor).then(|| 0x13 + sensor)
}

#[cfg(test)]
mod tests {
    use crate::mock::MockChannel;
    use crate::{Obd2, Obd2Config};

    fn client(channel: MockChannel) -> Obd2<MockChannel> {
        Obd2::new(channel, Obd2Config::default()).unwrap()
    }

    #[tokio::test]
    async fn test_rpm_and_coolant() {
        let channel = MockChannel::new();
        channel.respond(&[0x01, 0x0C], &[0x41, 0x0C, 0x1A, 0xF8]);
        channel.respond(&[0x01, 0x05], &[0x41, 0x05, 0x7B]);
        let mut obd = client(channel);

        let rpm = obd.rpm().await.unwrap();
        assert!((rpm - 1726.0).abs() < 0.01);
        assert_eq!(obd.engine_coolant_temp().await, Some(83));
    }

    #[tokio::test]
    async fn test_short_response_is_none() {
        let channel = MockChannel::new();
        channel.respond(&[0x01, 0x0C], &[0x41, 0x0C, 0x1A]);
        let mut obd = client(channel);
        assert_eq!(obd.rpm().await, None);
    }

    #[tokio::test]
    async fn test_excess_bytes_ignored() {
        let channel = MockChannel::new();
        channel.respond(&[0x01, 0x0D], &[0x41, 0x0D, 0x32, 0xAA, 0xBB]);
        let mut obd = client(channel);
        assert_eq!(obd.vehicle_speed().await, Some(50));
    }

    #[tokio::test]
    async fn test_negative_response_is_none() {
        let channel = MockChannel::new();
        channel.respond(&[0x01, 0x0C], &[0x7F, 0x01, 0x12]);
        let mut obd = client(channel);
        assert_eq!(obd.rpm().await, None);
        assert_eq!(obd.last_nrc().map(|n| n.as_byte()), Some(0x12));
    }

    #[tokio::test]
    async fn test_fuel_and_air() {
        let channel = MockChannel::new();
        channel.respond(&[0x01, 0x06], &[0x41, 0x06, 0x90]);
        channel.respond(&[0x01, 0x0A], &[0x41, 0x0A, 0x64]);
        channel.respond(&[0x01, 0x0E], &[0x41, 0x0E, 0x90]);
        channel.respond(&[0x01, 0x10], &[0x41, 0x10, 0x01, 0xF4]);
        channel.respond(&[0x01, 0x11], &[0x41, 0x11, 0xFF]);
        let mut obd = client(channel);

        assert!((obd.short_term_fuel_trim_bank_1().await.unwrap() - 12.5).abs() < 0.01);
        assert_eq!(obd.fuel_pressure().await, Some(300));
        assert!((obd.timing_advance().await.unwrap() - 8.0).abs() < 0.01);
        assert!((obd.maf_rate().await.unwrap() - 5.0).abs() < 0.01);
        assert!((obd.throttle().await.unwrap() - 100.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_oxygen_sensors() {
        let channel = MockChannel::new();
        channel.respond(&[0x01, 0x15], &[0x41, 0x15, 0xB4, 0x80]);
        let mut obd = client(channel);

        assert!((obd.oxygen_sensor_voltage(2).await.unwrap() - 0.9).abs() < 0.01);
        assert!((obd.oxygen_sensor_fuel_trim(2).await.unwrap() - 0.0).abs() < 0.01);
        assert_eq!(obd.oxygen_sensor_voltage(9).await, None);
        assert_eq!(obd.oxygen_sensor_voltage(0).await, None);
        assert_eq!(obd.channel().sent().len(), 2);
    }

    #[tokio::test]
    async fn test_status_words() {
        let channel = MockChannel::new();
        channel.respond(&[0x01, 0x01], &[0x41, 0x01, 0x81, 0x07, 0x65, 0x04]);
        channel.respond(&[0x01, 0x1E], &[0x41, 0x1E, 0x01]);
        channel.respond(&[0x01, 0x1F], &[0x41, 0x1F, 0x01, 0x2C]);
        let mut obd = client(channel);

        assert_eq!(obd.monitor_status().await, Some(0x8107_6504));
        assert_eq!(obd.aux_input_status().await, Some(true));
        assert_eq!(obd.run_time().await, Some(300));
    }
}
