//! OBD-II client over an ISO-TP channel
//!
//! Builds service requests, validates the response header and hands the
//! letter-addressed data bytes to the per-PID getters.

use crate::cache::{PidSupportCache, PID_RANGES};
use crate::config::Obd2Config;
use crate::error::ObdError;
use crate::mode;
use crate::nrc::Nrc;
use crate::pid::Pid;
use crate::response::Response;
use iso_tp::{IsoTpChannel, IsoTpMessage};
use tracing::{debug, info, warn};

/// First byte of a negative response
pub const NEGATIVE_RESPONSE: u8 = 0x7F;
/// Added to the service ID in a positive response
pub const POSITIVE_RESPONSE_OFFSET: u8 = 0x40;

/// OBD-II client.
///
/// Methods take `&mut self`: one request is in flight at a time.
pub struct Obd2<C: IsoTpChannel> {
    channel: C,
    config: Obd2Config,
    cache: PidSupportCache,
    last_nrc: Option<Nrc>,
}

impl<C: IsoTpChannel> Obd2<C> {
    /// Create a client on `channel`
    pub fn new(channel: C, config: Obd2Config) -> Result<Self, ObdError> {
        config.validate()?;
        info!(
            "Creating OBD-II client: tx {:#05X}, rx {:#05X}",
            config.tx_id, config.rx_id
        );
        let cache = PidSupportCache::new(config.pid_cache_ttl());
        Ok(Self {
            channel,
            config,
            cache,
            last_nrc: None,
        })
    }

    pub fn config(&self) -> &Obd2Config {
        &self.config
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// NRC of the most recent negative response, if any
    pub fn last_nrc(&self) -> Option<Nrc> {
        self.last_nrc
    }

    /// Send `payload` and return the positive response bytes, header included.
    ///
    /// The exchange is bounded by `request_timeout_ms`.
    pub async fn request(&mut self, payload: &[u8]) -> Result<Vec<u8>, ObdError> {
        let budget = self.config.request_timeout();
        match tokio::time::timeout(budget, self.exchange(payload)).await {
            Ok(result) => result,
            Err(_) => {
                debug!("Request {:02X?} timed out", payload);
                Err(ObdError::Timeout(self.config.request_timeout_ms))
            }
        }
    }

    async fn exchange(&mut self, payload: &[u8]) -> Result<Vec<u8>, ObdError> {
        let service = *payload
            .first()
            .ok_or_else(|| ObdError::InvalidResponse("empty request".to_string()))?;

        let request = IsoTpMessage::new(self.config.tx_id, self.config.rx_id, payload);
        debug!("Request {:02X?}", payload);
        self.channel.send(&request).await?;

        let mut response = IsoTpMessage::with_capacity(
            self.config.tx_id,
            self.config.rx_id,
            self.config.response_capacity,
        );
        self.channel.receive(&mut response).await?;
        let data = response.data();
        debug!("Response {:02X?}", data);

        if data.first() == Some(&NEGATIVE_RESPONSE) {
            if data.len() < 3 {
                return Err(ObdError::InvalidResponse(format!(
                    "truncated negative response {:02X?}",
                    data
                )));
            }
            let nrc = Nrc::from_byte(data[2]);
            self.last_nrc = Some(nrc);
            warn!("Negative response to service {:02X}: {}", data[1], nrc);
            return Err(ObdError::NegativeResponse {
                service: data[1],
                nrc,
            });
        }

        let expected = service.wrapping_add(POSITIVE_RESPONSE_OFFSET);
        if data.first() != Some(&expected) {
            return Err(ObdError::InvalidResponse(format!(
                "expected service {:02X}, got {:02X?}",
                expected, data
            )));
        }
        Ok(data.to_vec())
    }

    /// Request `[sid, pid]` and return up to eight data bytes after the echo
    pub async fn process_pid(&mut self, sid: u8, pid: u8) -> Result<Response, ObdError> {
        let data = self.request(&[sid, pid]).await?;
        if data.len() < 2 {
            return Err(ObdError::NoData {
                expected: 1,
                actual: 0,
            });
        }
        let echo_checked = sid == mode::CURRENT_DATA || sid == mode::VEHICLE_INFO;
        if echo_checked && data[1] != pid {
            return Err(ObdError::InvalidResponse(format!(
                "PID echo {:02X} does not match {:02X}",
                data[1], pid
            )));
        }
        Ok(Response::new(&data[2..]))
    }

    /// [`Self::process_pid`] requiring at least `expected` data bytes
    pub async fn query(&mut self, sid: u8, pid: u8, expected: usize) -> Result<Response, ObdError> {
        let response = self.process_pid(sid, pid).await?;
        if response.len() < expected {
            return Err(ObdError::NoData {
                expected,
                actual: response.len(),
            });
        }
        Ok(response)
    }

    /// Mode 01 read; failures are logged and collapse to `None`
    pub(crate) async fn current_data(&mut self, pid: u8, expected: usize) -> Option<Response> {
        match self.query(mode::CURRENT_DATA, pid, expected).await {
            Ok(response) => Some(response),
            Err(e) => {
                debug!("PID {:02X} unavailable: {}", pid, e);
                None
            }
        }
    }

    /// Mode 01 supported-PID bitmap for the range starting at `range_pid`
    pub async fn supported_pids_bitmap(&mut self, range_pid: u8) -> Result<u32, ObdError> {
        let response = self.query(mode::CURRENT_DATA, range_pid, 4).await?;
        Ok(response.dword())
    }

    /// Read a telemetry PID and scale it to engineering units
    pub async fn read_pid(&mut self, pid: Pid) -> Result<f64, ObdError> {
        let response = self
            .query(mode::CURRENT_DATA, pid.as_hex(), pid.response_bytes())
            .await?;
        Ok(pid.decode(&response))
    }

    /// Whether the ECU advertises mode 01 `pid`, refreshing the cache when stale
    pub async fn is_pid_supported(&mut self, pid: u8) -> bool {
        if self.cache.is_stale() {
            self.refresh_pid_cache().await;
        }
        self.cache.contains(pid)
    }

    /// Rebuild the supported-PID cache by chaining the range bitmaps
    pub async fn refresh_pid_cache(&mut self) {
        self.cache.clear();
        for index in 0..PID_RANGES {
            let range_pid = PidSupportCache::range_pid(index);
            match self.supported_pids_bitmap(range_pid).await {
                Ok(bitmap) => {
                    self.cache.set_range(index, bitmap);
                    if bitmap & 1 == 0 {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Supported PID range {:02X} unavailable: {}", range_pid, e);
                    break;
                }
            }
        }
        self.cache.mark_refreshed();
        info!(
            "PID support cache refreshed: {} PIDs advertised",
            self.cache.supported_pids().count()
        );
    }

    /// Force the next support lookup to query the ECU
    pub fn invalidate_pid_cache(&mut self) {
        self.cache.invalidate();
    }

    /// PIDs advertised as of the last refresh
    pub fn supported_pids(&self) -> impl Iterator<Item = u8> + '_ {
        self.cache.supported_pids()
    }

    /// Mode 22 read by 16-bit data identifier
    pub async fn read_data_by_identifier(&mut self, did: u16) -> Result<Vec<u8>, ObdError> {
        let [hi, lo] = did.to_be_bytes();
        let data = self.request(&[mode::READ_DATA_BY_IDENTIFIER, hi, lo]).await?;
        if data.len() < 3 || data[1] != hi || data[2] != lo {
            return Err(ObdError::InvalidResponse(format!(
                "DID echo {:02X?} does not match {:04X}",
                &data[1..data.len().min(3)],
                did
            )));
        }
        Ok(data[3..].to_vec())
    }
}
