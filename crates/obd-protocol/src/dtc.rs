//! Diagnostic trouble codes (modes 03 and 04)

use crate::client::Obd2;
use crate::error::ObdError;
use crate::mode;
use iso_tp::IsoTpChannel;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Vehicle system named by the first character of a DTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DtcSystem {
    Powertrain,
    Chassis,
    Body,
    Network,
}

impl DtcSystem {
    pub fn letter(&self) -> char {
        match self {
            DtcSystem::Powertrain => 'P',
            DtcSystem::Chassis => 'C',
            DtcSystem::Body => 'B',
            DtcSystem::Network => 'U',
        }
    }
}

/// Two-byte trouble code as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dtc(u16);

impl Dtc {
    pub fn from_raw(raw: u16) -> Self {
        Dtc(raw)
    }

    pub fn from_bytes(hi: u8, lo: u8) -> Self {
        Dtc(u16::from_be_bytes([hi, lo]))
    }

    pub fn raw(&self) -> u16 {
        self.0
    }

    pub fn system(&self) -> DtcSystem {
        match self.0 >> 14 {
            0 => DtcSystem::Powertrain,
            1 => DtcSystem::Chassis,
            2 => DtcSystem::Body,
            _ => DtcSystem::Network,
        }
    }
}

impl fmt::Display for Dtc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{:03X}",
            self.system().letter(),
            (self.0 >> 12) & 0x03,
            self.0 & 0x0FFF
        )
    }
}

/// Codes in a mode 03 response: `43 <count> <hi lo>...`, zero pairs skipped
pub fn parse_dtcs(data: &[u8]) -> Vec<Dtc> {
    data.get(2..)
        .unwrap_or_default()
        .chunks_exact(2)
        .map(|pair| Dtc::from_bytes(pair[0], pair[1]))
        .filter(|dtc| dtc.raw() != 0)
        .collect()
}

impl<T: IsoTpChannel> Obd2<T> {
    /// Stored trouble codes (mode 03)
    pub async fn read_dtcs(&mut self) -> Result<Vec<Dtc>, ObdError> {
        let data = self.request(&[mode::READ_DTC]).await?;
        let dtcs = parse_dtcs(&data);
        if let Some(count) = data.get(1) {
            if *count as usize != dtcs.len() {
                debug!("ECU reported {} DTCs, decoded {}", count, dtcs.len());
            }
        }
        info!("Read {} stored DTCs", dtcs.len());
        Ok(dtcs)
    }

    /// Clear trouble codes and stored values (mode 04)
    pub async fn clear_dtcs(&mut self) -> Result<(), ObdError> {
        self.request(&[mode::CLEAR_DTC]).await?;
        info!("Trouble codes cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChannel;
    use crate::{Nrc, Obd2Config};

    #[test]
    fn test_display() {
        assert_eq!(Dtc::from_raw(0x0420).to_string(), "P0420");
        assert_eq!(Dtc::from_raw(0x5234).to_string(), "C1234");
        assert_eq!(Dtc::from_raw(0xC100).to_string(), "U0100");
        assert_eq!(Dtc::from_raw(0x9ABC).to_string(), "B1ABC");
        assert_eq!(Dtc::from_raw(0x3FFF).to_string(), "P3FFF");
    }

    #[test]
    fn test_parse_skips_padding() {
        let dtcs = parse_dtcs(&[0x43, 0x02, 0x04, 0x20, 0x00, 0x00, 0xC1, 0x00]);
        assert_eq!(dtcs, vec![Dtc::from_raw(0x0420), Dtc::from_raw(0xC100)]);
        assert!(parse_dtcs(&[0x43]).is_empty());
    }

    #[tokio::test]
    async fn test_read_and_clear() {
        let channel = MockChannel::new();
        channel.respond(&[0x03], &[0x43, 0x01, 0x01, 0x33]);
        channel.respond(&[0x04], &[0x44]);
        let mut obd = Obd2::new(channel, Obd2Config::default()).unwrap();

        let dtcs = obd.read_dtcs().await.unwrap();
        assert_eq!(dtcs.len(), 1);
        assert_eq!(dtcs[0].to_string(), "P0133");
        obd.clear_dtcs().await.unwrap();
        assert_eq!(obd.channel().sent(), vec![vec![0x03], vec![0x04]]);
    }

    #[tokio::test]
    async fn test_clear_refused() {
        let channel = MockChannel::new();
        channel.respond(&[0x04], &[0x7F, 0x04, 0x22]);
        let mut obd = Obd2::new(channel, Obd2Config::default()).unwrap();

        let err = obd.clear_dtcs().await.unwrap_err();
        assert_eq!(err.nrc(), Some(Nrc::ConditionsNotCorrect));
    }
}
