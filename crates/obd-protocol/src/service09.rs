//! Mode 09: vehicle information

use crate::client::Obd2;
use crate::error::ObdError;
use crate::mode;
use crate::response::Letter::A;
use iso_tp::IsoTpChannel;
use tracing::{debug, info};

/// Characters in a VIN
pub const VIN_LEN: usize = 17;
/// Longest calibration ID
pub const CALIBRATION_ID_MAX_LEN: usize = 16;
/// Longest ECU name
pub const ECU_NAME_MAX_LEN: usize = 20;

/// Mode 09 info types
pub mod info_type {
    pub const SUPPORTED_PIDS: u8 = 0x00;
    pub const VIN_MESSAGE_COUNT: u8 = 0x01;
    pub const VIN: u8 = 0x02;
    pub const CALIBRATION_ID_MESSAGE_COUNT: u8 = 0x03;
    pub const CALIBRATION_ID: u8 = 0x04;
    pub const CVN_MESSAGE_COUNT: u8 = 0x05;
    pub const CVN: u8 = 0x06;
    pub const PERF_TRACKING_MESSAGE_COUNT: u8 = 0x07;
    pub const PERF_TRACKING_SPARK: u8 = 0x08;
    pub const ECU_NAME_MESSAGE_COUNT: u8 = 0x09;
    pub const ECU_NAME: u8 = 0x0A;
    pub const PERF_TRACKING_COMPRESSION: u8 = 0x0B;
}

/// Payload starts after `49 <info type> <item count>`
const DATA_START: usize = 3;

impl<T: IsoTpChannel> Obd2<T> {
    /// Mode 09 info types supported (bit encoded)
    pub async fn supported_pids_service09(&mut self) -> Option<u32> {
        self.query(mode::VEHICLE_INFO, info_type::SUPPORTED_PIDS, 4)
            .await
            .ok()
            .map(|r| r.dword())
    }

    pub async fn vin_message_count(&mut self) -> Option<u8> {
        self.message_count(info_type::VIN_MESSAGE_COUNT).await
    }

    pub async fn calibration_id_message_count(&mut self) -> Option<u8> {
        self.message_count(info_type::CALIBRATION_ID_MESSAGE_COUNT).await
    }

    pub async fn cvn_message_count(&mut self) -> Option<u8> {
        self.message_count(info_type::CVN_MESSAGE_COUNT).await
    }

    pub async fn performance_tracking_message_count(&mut self) -> Option<u8> {
        self.message_count(info_type::PERF_TRACKING_MESSAGE_COUNT).await
    }

    pub async fn ecu_name_message_count(&mut self) -> Option<u8> {
        self.message_count(info_type::ECU_NAME_MESSAGE_COUNT).await
    }

    async fn message_count(&mut self, info: u8) -> Option<u8> {
        self.query(mode::VEHICLE_INFO, info, 1)
            .await
            .ok()
            .map(|r| r[A])
    }

    /// Vehicle identification number; exactly 17 printable characters
    pub async fn vin(&mut self) -> Result<String, ObdError> {
        let data = self.vehicle_info(info_type::VIN).await?;
        let vin = printable(&data[DATA_START.min(data.len())..], VIN_LEN);
        if vin.len() != VIN_LEN {
            debug!("Invalid VIN length: {}", vin.len());
            return Err(ObdError::InvalidResponse(format!(
                "VIN has {} printable characters",
                vin.len()
            )));
        }
        info!("VIN: {}", vin);
        Ok(vin)
    }

    /// Calibration ID, at most `max_len` characters
    pub async fn calibration_id(&mut self, max_len: usize) -> Result<String, ObdError> {
        self.text_info(info_type::CALIBRATION_ID, max_len).await
    }

    /// ECU name, at most `max_len` characters
    pub async fn ecu_name(&mut self, max_len: usize) -> Result<String, ObdError> {
        self.text_info(info_type::ECU_NAME, max_len).await
    }

    /// Calibration verification numbers
    pub async fn calibration_verification_numbers(&mut self) -> Result<Vec<u32>, ObdError> {
        let data = self.vehicle_info(info_type::CVN).await?;
        let cvns: Vec<u32> = data
            .get(DATA_START..)
            .unwrap_or_default()
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        non_empty(cvns, info_type::CVN)
    }

    /// In-use performance tracking counters, spark ignition
    pub async fn performance_tracking_spark(&mut self) -> Result<Vec<u16>, ObdError> {
        self.tracking(info_type::PERF_TRACKING_SPARK).await
    }

    /// In-use performance tracking counters, compression ignition
    pub async fn performance_tracking_compression(&mut self) -> Result<Vec<u16>, ObdError> {
        self.tracking(info_type::PERF_TRACKING_COMPRESSION).await
    }

    async fn tracking(&mut self, info: u8) -> Result<Vec<u16>, ObdError> {
        let data = self.vehicle_info(info).await?;
        let counters: Vec<u16> = data
            .get(DATA_START..)
            .unwrap_or_default()
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        non_empty(counters, info)
    }

    async fn text_info(&mut self, info: u8, max_len: usize) -> Result<String, ObdError> {
        let data = self.vehicle_info(info).await?;
        let text = printable(&data[DATA_START.min(data.len())..], max_len);
        if text.is_empty() {
            return Err(ObdError::NoData {
                expected: 1,
                actual: 0,
            });
        }
        Ok(text)
    }

    /// Full mode 09 response after checking the `49 <info>` echo
    async fn vehicle_info(&mut self, info: u8) -> Result<Vec<u8>, ObdError> {
        let data = self.request(&[mode::VEHICLE_INFO, info]).await?;
        if data.get(1) != Some(&info) {
            return Err(ObdError::InvalidResponse(format!(
                "info type echo {:02X?} does not match {:02X}",
                data.get(1),
                info
            )));
        }
        Ok(data)
    }
}

/// Printable ASCII (0x20..=0x7E) from `bytes`, up to `limit` characters
fn printable(bytes: &[u8], limit: usize) -> String {
    bytes
        .iter()
        .copied()
        .filter(|b| (0x20..=0x7E).contains(b))
        .take(limit)
        .map(char::from)
        .collect()
}

fn non_empty<V>(values: Vec<V>, info: u8) -> Result<Vec<V>, ObdError> {
    if values.is_empty() {
        debug!("Mode 09 info type {:02X} carried no values", info);
        return Err(ObdError::NoData {
            expected: 1,
            actual: 0,
        });
    }
    Ok(values)
}
