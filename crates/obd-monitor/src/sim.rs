//! Simulated engine ECU answering OBD-II requests over ISO-TP

use crate::config::SimConfig;
use can_transport::{Transport, VirtualNode};
use iso_tp::{IsoTp, IsoTpConfig, IsoTpError, IsoTpMessage};
use obd_protocol::{mode, Nrc, NEGATIVE_RESPONSE, POSITIVE_RESPONSE_OFFSET};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Mode 01 PIDs the simulated engine answers
pub const SIMULATED_PIDS: [u8; 10] = [0x04, 0x05, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11];

const REQUEST_CAPACITY: usize = 64;

/// Engine state derived from time since start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineModel {
    pub rpm: f64,
    pub speed: f64,
    pub coolant_temp: f64,
    pub load: f64,
}

impl EngineModel {
    /// Idle at 800 rpm with a slow throttle cycle; coolant warms 2 °C/s up to 90 °C
    pub fn at(elapsed_secs: f64) -> Self {
        let cycle = (1.0 + (elapsed_secs / 3.0).sin()) / 2.0;
        Self {
            rpm: 800.0 + 2200.0 * cycle,
            speed: 100.0 * cycle,
            coolant_temp: (20.0 + 2.0 * elapsed_secs).min(90.0),
            load: 20.0 + 60.0 * cycle,
        }
    }

    /// Data bytes for a mode 01 PID, `None` if not simulated
    pub fn encode(&self, pid: u8) -> Option<Vec<u8>> {
        let byte = |value: f64| value.round().clamp(0.0, 255.0) as u8;
        let word = |value: f64| (value.round().clamp(0.0, 65535.0) as u16).to_be_bytes().to_vec();
        let data = match pid {
            0x04 => vec![byte(self.load * 255.0 / 100.0)],
            0x05 => vec![byte(self.coolant_temp + 40.0)],
            0x0A => vec![byte(300.0 / 3.0)],
            0x0B => vec![byte(30.0 + self.load)],
            0x0C => word(self.rpm * 4.0),
            0x0D => vec![byte(self.speed)],
            0x0E => vec![byte((10.0 + 64.0) * 2.0)],
            0x0F => vec![byte(25.0 + 40.0)],
            0x10 => word(self.rpm / 300.0 * 100.0),
            0x11 => vec![byte((self.load - 10.0) * 255.0 / 100.0)],
            _ => return None,
        };
        Some(data)
    }
}

/// Supported-PID bitmap for the range starting at `base` (0x00, 0x20, ...)
pub fn support_bitmap(base: u8, pids: &[u8]) -> u32 {
    pids.iter()
        .filter(|pid| **pid > base && (**pid as u16) <= base as u16 + 32)
        .fold(0u32, |bitmap, pid| bitmap | 1 << (32 - (pid - base) as u32))
}

/// Engine ECU on a virtual bus node
pub struct SimulatedEcu {
    engine: IsoTp<VirtualNode>,
    tx_id: u32,
    rx_id: u32,
    vin: String,
    dtcs: Vec<u16>,
    started: Instant,
}

impl SimulatedEcu {
    /// ECU listening on `rx_id` and answering on `tx_id`
    pub async fn start(
        node: VirtualNode,
        isotp: IsoTpConfig,
        tx_id: u32,
        rx_id: u32,
        sim: &SimConfig,
    ) -> Result<Self, IsoTpError> {
        node.start().await?;
        let engine = IsoTp::new(node, isotp)?;
        info!(tx_id, rx_id, "Simulated ECU started");
        Ok(Self {
            engine,
            tx_id,
            rx_id,
            vin: sim.vin.clone(),
            dtcs: sim.dtcs.clone(),
            started: Instant::now(),
        })
    }

    /// Serve requests until the task is aborted
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let mut request = IsoTpMessage::with_capacity(self.tx_id, self.rx_id, REQUEST_CAPACITY);
                match self.engine.receive(&mut request).await {
                    Ok(_) => {}
                    Err(e) if e.is_timeout() => continue,
                    Err(e) => {
                        warn!("Simulated ECU dropped request: {}", e);
                        continue;
                    }
                }

                let reply = self.respond(request.data());
                let response = IsoTpMessage::new(self.tx_id, self.rx_id, &reply);
                if let Err(e) = self.engine.send(&response).await {
                    warn!("Simulated ECU failed to answer: {}", e);
                }
            }
        })
    }

    /// Response payload for one request payload
    pub fn respond(&mut self, request: &[u8]) -> Vec<u8> {
        let Some(&sid) = request.first() else {
            return negative(0x00, Nrc::IncorrectMessageLengthOrInvalidFormat);
        };
        debug!("Simulated ECU request {:02X?}", request);

        match (sid, request.get(1).copied()) {
            (mode::CURRENT_DATA, Some(pid)) => self.current_data(pid),
            (mode::VEHICLE_INFO, Some(0x02)) => {
                let mut reply = vec![sid + POSITIVE_RESPONSE_OFFSET, 0x02, 0x01];
                reply.extend_from_slice(self.vin.as_bytes());
                reply
            }
            (mode::VEHICLE_INFO, Some(_)) => negative(sid, Nrc::RequestOutOfRange),
            (mode::READ_DTC, _) => {
                // One count byte, so at most 255 codes are reported
                let count = u8::try_from(self.dtcs.len()).unwrap_or(u8::MAX);
                if usize::from(count) < self.dtcs.len() {
                    warn!("Simulated ECU reporting {} of {} DTCs", count, self.dtcs.len());
                }
                let mut reply = vec![sid + POSITIVE_RESPONSE_OFFSET, count];
                for dtc in self.dtcs.iter().take(usize::from(count)) {
                    reply.extend_from_slice(&dtc.to_be_bytes());
                }
                reply
            }
            (mode::CLEAR_DTC, _) => {
                info!("Simulated ECU clearing {} DTCs", self.dtcs.len());
                self.dtcs.clear();
                vec![sid + POSITIVE_RESPONSE_OFFSET]
            }
            (mode::CURRENT_DATA, None) | (mode::VEHICLE_INFO, None) => {
                negative(sid, Nrc::IncorrectMessageLengthOrInvalidFormat)
            }
            _ => negative(sid, Nrc::ServiceNotSupported),
        }
    }

    fn current_data(&self, pid: u8) -> Vec<u8> {
        let header = [mode::CURRENT_DATA + POSITIVE_RESPONSE_OFFSET, pid];
        if pid % 0x20 == 0 {
            if pid > 0xE0 {
                return negative(mode::CURRENT_DATA, Nrc::SubFunctionNotSupported);
            }
            let bitmap = support_bitmap(pid, &SIMULATED_PIDS);
            return [&header[..], &bitmap.to_be_bytes()].concat();
        }

        let model = EngineModel::at(self.started.elapsed().as_secs_f64());
        match model.encode(pid) {
            Some(data) => [&header[..], &data].concat(),
            None => negative(mode::CURRENT_DATA, Nrc::SubFunctionNotSupported),
        }
    }
}

fn negative(sid: u8, nrc: Nrc) -> Vec<u8> {
    vec![NEGATIVE_RESPONSE, sid, nrc.as_byte()]
}
