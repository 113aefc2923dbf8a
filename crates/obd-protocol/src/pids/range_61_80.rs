use crate::client::Obd2;
use crate::formula;
use crate::response::Letter::{A, B, C, D, E};
use iso_tp::IsoTpChannel;

impl<T: IsoTpChannel> Obd2<T> {
    /// PIDs 0x61..=0x80 supported (bit encoded)
    pub async fn supported_pids_61_80(&mut self) -> Option<u32> {
        self.supported_pids_bitmap(0x60).await.ok()
    }

    /// Driver's demand engine percent torque (%)
    pub async fn demanded_torque(&mut self) -> Option<i16> {
        self.current_data(0x61, 1)
            .await
            .map(|r| formula::torque_percent(r[A]))
    }

    /// Actual engine percent torque (%)
    pub async fn actual_torque(&mut self) -> Option<i16> {
        self.current_data(0x62, 1)
            .await
            .map(|r| formula::torque_percent(r[A]))
    }

    /// Engine reference torque (N·m)
    pub async fn reference_torque(&mut self) -> Option<u16> {
        self.current_data(0x63, 2).await.map(|r| r.word(A))
    }

    /// Engine percent torque at idle and engine points 1..=4 (%)
    pub async fn engine_percent_torque_data(&mut self) -> Option<[i16; 5]> {
        self.current_data(0x64, 5)
            .await
            .map(|r| [A, B, C, D, E].map(|letter| formula::torque_percent(r[letter])))
    }

    /// Auxiliary input/output supported (bit encoded)
    pub async fn aux_io_supported(&mut self) -> Option<u16> {
        self.current_data(0x65, 2).await.map(|r| r.word(A))
    }
}

#[cfg(test)]
mod tests {
    use crate::mock::MockChannel;
    use crate::{Obd2, Obd2Config};

    #[tokio::test]
    async fn test_torque() {
        let channel = MockChannel::new();
        channel.respond(&[0x01, 0x62], &[0x41, 0x62, 0xAF]);
        channel.respond(&[0x01, 0x63], &[0x41, 0x63, 0x01, 0x90]);
        channel.respond(&[0x01, 0x64], &[0x41, 0x64, 0x7D, 0x96, 0xAF, 0xC8, 0xE1]);
        let mut obd = Obd2::new(channel, Obd2Config::default()).unwrap();

        assert_eq!(obd.actual_torque().await, Some(50));
        assert_eq!(obd.reference_torque().await, Some(400));
        assert_eq!(
            obd.engine_percent_torque_data().await,
            Some([0, 25, 50, 75, 100])
        );
    }

    #[tokio::test]
    async fn test_torque_data_needs_five_bytes() {
        let channel = MockChannel::new();
        channel.respond(&[0x01, 0x64], &[0x41, 0x64, 0x7D, 0x96]);
        let mut obd = Obd2::new(channel, Obd2Config::default()).unwrap();
        assert_eq!(obd.engine_percent_torque_data().await, None);
    }
}
