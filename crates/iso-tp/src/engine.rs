//! ISO-TP engine: sender and receiver state machines over a [`Transport`]

use crate::channel::IsoTpChannel;
use crate::config::IsoTpConfig;
use crate::error::IsoTpError;
use crate::limits::MAX_MESSAGE_LEN;
use crate::message::IsoTpMessage;
use crate::pdu::{self, FlowStatus, Pdu, PduError, CF_PAYLOAD, FF_PAYLOAD, SF_MAX_PAYLOAD};
use crate::session::{next_seq, Session, SessionState};
use crate::st_min::StMin;
use async_trait::async_trait;
use can_transport::{QueueSubscriber, Transport, TransportError};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// ISO-TP engine bound to one transport.
///
/// The engine registers its own frame queue with the transport at
/// construction. Concurrent sessions on the same engine are not supported;
/// callers serialise conversations per tx/rx pair.
pub struct IsoTp<T: Transport> {
    transport: T,
    subscriber: Arc<QueueSubscriber>,
    config: IsoTpConfig,
}

impl<T: Transport> IsoTp<T> {
    /// Create an engine and register its frame queue with `transport`
    pub fn new(transport: T, config: IsoTpConfig) -> Result<Self, IsoTpError> {
        let subscriber = Arc::new(QueueSubscriber::new(config.subscriber_queue_depth));
        transport.register_subscriber(subscriber.clone())?;
        Ok(Self {
            transport,
            subscriber,
            config,
        })
    }

    pub fn config(&self) -> &IsoTpConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `msg.data()` as a single frame or a segmented FF/CF sequence
    pub async fn send(&self, msg: &IsoTpMessage) -> Result<(), IsoTpError> {
        let len = msg.len();
        if len == 0 || len > MAX_MESSAGE_LEN {
            return Err(IsoTpError::InvalidLength(len));
        }

        let stale = self.subscriber.clear().await;
        if stale > 0 {
            debug!("Discarded {} stale frames before send", stale);
        }

        let mut session = Session::new();
        session.transition(SessionState::Send);
        let result = self.run_sender(&mut session, msg).await;
        if let Err(e) = &result {
            session.transition(SessionState::Error);
            warn!(tx_id = msg.tx_id, "ISO-TP send aborted: {}", e);
        }
        session.reset();
        result
    }

    /// Receive one message from `msg.rx_id` into `msg`'s buffer
    pub async fn receive(&self, msg: &mut IsoTpMessage) -> Result<usize, IsoTpError> {
        msg.set_len(0);
        let session_deadline = Instant::now() + self.config.session_timeout();

        let mut session = Session::new();
        let result = self.run_receiver(&mut session, msg, session_deadline).await;
        match &result {
            Ok(len) => msg.set_len(*len),
            Err(e) => {
                session.transition(SessionState::Error);
                msg.set_len(0);
                debug!(rx_id = msg.rx_id, "ISO-TP receive failed: {}", e);
            }
        }
        session.reset();
        result
    }

    async fn run_sender(&self, session: &mut Session, msg: &IsoTpMessage) -> Result<(), IsoTpError> {
        let payload = msg.data();

        loop {
            match session.state {
                SessionState::Send => {
                    if payload.len() <= SF_MAX_PAYLOAD {
                        self.transmit(msg.tx_id, &Pdu::SingleFrame { data: payload })
                            .await?;
                        session.transition(SessionState::Finished);
                    } else {
                        self.transmit(
                            msg.tx_id,
                            &Pdu::FirstFrame {
                                len: payload.len() as u16,
                                data: &payload[..FF_PAYLOAD],
                            },
                        )
                        .await?;
                        session.offset = FF_PAYLOAD;
                        session.rest = payload.len() - FF_PAYLOAD;
                        session.seq_id = 1;
                        session.arm(self.config.fc_timeout());
                        session.transition(SessionState::WaitFirstFc);
                    }
                }
                SessionState::WaitFirstFc | SessionState::WaitFc => {
                    let (status, block_size, st_min) =
                        self.wait_flow_control(msg.rx_id, session).await?;
                    session.fc_status = status;
                    match session.fc_status {
                        FlowStatus::ClearToSend => {
                            session.block_size = block_size;
                            session.st_min = StMin::from_byte(st_min);
                            session.fc_wait_frames_seen = 0;
                            session.cf_in_block = 0;
                            debug!(
                                "FC CTS: block size {}, STmin {:?}",
                                block_size,
                                session.st_min.duration()
                            );
                            session.transition(SessionState::SendCf);
                        }
                        FlowStatus::Wait => {
                            session.fc_wait_frames_seen += 1;
                            if session.fc_wait_frames_seen >= self.config.max_fc_waits {
                                return Err(IsoTpError::TooManyWaits(session.fc_wait_frames_seen));
                            }
                            debug!("FC WAIT {} received", session.fc_wait_frames_seen);
                            session.arm(self.config.fc_timeout());
                        }
                        FlowStatus::Overflow => return Err(IsoTpError::PeerOverflow),
                    }
                }
                SessionState::SendCf => {
                    let delay = session.st_min.duration();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }

                    let end = (session.offset + CF_PAYLOAD).min(payload.len());
                    self.transmit(
                        msg.tx_id,
                        &Pdu::ConsecutiveFrame {
                            sn: session.seq_id,
                            data: &payload[session.offset..end],
                        },
                    )
                    .await?;
                    session.rest -= end - session.offset;
                    session.offset = end;
                    session.seq_id = next_seq(session.seq_id, session.block_size);

                    if session.rest == 0 {
                        session.transition(SessionState::Finished);
                    } else {
                        session.cf_in_block = session.cf_in_block.wrapping_add(1);
                        if session.block_size > 0 && session.cf_in_block >= session.block_size {
                            session.arm(self.config.fc_timeout());
                            session.transition(SessionState::WaitFc);
                        }
                    }
                }
                SessionState::Finished => {
                    debug!(tx_id = msg.tx_id, "ISO-TP sent {} bytes", payload.len());
                    return Ok(());
                }
                SessionState::Idle | SessionState::WaitData | SessionState::Error => {
                    return Err(TransportError::GeneralFailure(format!(
                        "sender in unexpected state {:?}",
                        session.state
                    ))
                    .into());
                }
            }
        }
    }

    async fn wait_flow_control(
        &self,
        rx_id: u32,
        session: &Session,
    ) -> Result<(FlowStatus, u8, u8), IsoTpError> {
        loop {
            let remaining = session.remaining();
            let frame = match self.subscriber.receive(remaining).await {
                Some(frame) => frame,
                None => return Err(IsoTpError::FlowControlTimeout(self.config.fc_timeout_ms)),
            };
            if frame.id() != rx_id {
                continue;
            }

            match pdu::decode(frame.data()) {
                Ok(Pdu::FlowControl {
                    status,
                    block_size,
                    st_min,
                }) => return Ok((status, block_size, st_min)),
                Ok(other) => debug!("Ignoring {} while awaiting flow control", other.kind()),
                Err(PduError::ReservedFlowStatus(nibble)) => {
                    return Err(PduError::ReservedFlowStatus(nibble).into())
                }
                Err(e) => debug!("Ignoring malformed frame while awaiting flow control: {}", e),
            }
        }
    }

    async fn run_receiver(
        &self,
        session: &mut Session,
        msg: &mut IsoTpMessage,
        session_deadline: Instant,
    ) -> Result<usize, IsoTpError> {
        let capacity = msg.capacity();
        let mut total = 0usize;

        loop {
            let in_data = session.state == SessionState::WaitData;
            let deadline = if in_data {
                session.deadline().min(session_deadline)
            } else {
                session_deadline
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            let frame = match self.subscriber.receive(remaining).await {
                Some(frame) => frame,
                None if in_data && session.deadline() < session_deadline => {
                    return Err(IsoTpError::ConsecutiveFrameTimeout(self.config.cf_timeout_ms))
                }
                None => return Err(IsoTpError::SessionTimeout(self.config.session_timeout_ms)),
            };
            if frame.id() != msg.rx_id {
                continue;
            }

            let pdu = match pdu::decode(frame.data()) {
                Ok(pdu) => pdu,
                Err(PduError::ReservedFlowStatus(_)) => continue,
                Err(e) => return Err(e.into()),
            };

            match pdu {
                Pdu::SingleFrame { data } => {
                    if in_data {
                        warn!("SF received mid-transfer, restarting reception");
                    }
                    if data.len() > capacity {
                        return Err(IsoTpError::BufferOverflow {
                            needed: data.len(),
                            capacity,
                        });
                    }
                    msg.buffer_mut()[..data.len()].copy_from_slice(data);
                    session.transition(SessionState::Finished);
                    debug!(rx_id = msg.rx_id, "SF received, {} bytes", data.len());
                    return Ok(data.len());
                }
                Pdu::FirstFrame { len, data } => {
                    if in_data {
                        warn!("FF received mid-transfer, restarting reception");
                    }
                    let len = len as usize;
                    if len > capacity {
                        self.send_flow_control(msg.tx_id, FlowStatus::Overflow).await?;
                        return Err(IsoTpError::BufferOverflow {
                            needed: len,
                            capacity,
                        });
                    }
                    if data.len() < FF_PAYLOAD {
                        return Err(PduError::Truncated("first").into());
                    }
                    msg.buffer_mut()[..FF_PAYLOAD].copy_from_slice(&data[..FF_PAYLOAD]);
                    total = len;
                    session.offset = FF_PAYLOAD;
                    session.rest = len - FF_PAYLOAD;
                    session.seq_id = 1;
                    debug!(rx_id = msg.rx_id, "FF received, message length {}", len);

                    self.send_flow_control(msg.tx_id, FlowStatus::ClearToSend).await?;
                    session.arm(self.config.cf_timeout());
                    session.transition(SessionState::WaitData);
                }
                Pdu::ConsecutiveFrame { sn, data } => {
                    if !in_data {
                        debug!("Ignoring CF {} outside of a transfer", sn);
                        continue;
                    }
                    let expected = session.seq_id & 0x0F;
                    if sn != expected {
                        return Err(IsoTpError::SequenceMismatch {
                            expected,
                            received: sn,
                        });
                    }

                    let take = session.rest.min(CF_PAYLOAD);
                    if data.len() < take {
                        return Err(PduError::Truncated("consecutive").into());
                    }
                    let end = session.offset + take;
                    if end > capacity {
                        return Err(IsoTpError::BufferOverflow {
                            needed: end,
                            capacity,
                        });
                    }
                    msg.buffer_mut()[session.offset..end].copy_from_slice(&data[..take]);
                    session.offset = end;
                    session.rest -= take;

                    if session.rest == 0 {
                        session.transition(SessionState::Finished);
                        debug!(rx_id = msg.rx_id, "Last CF received, {} bytes total", total);
                        return Ok(total);
                    }
                    session.seq_id = next_seq(session.seq_id, 0);
                    session.arm(self.config.cf_timeout());
                }
                Pdu::FlowControl { .. } => {}
            }
        }
    }

    async fn send_flow_control(&self, tx_id: u32, status: FlowStatus) -> Result<(), IsoTpError> {
        self.transmit(
            tx_id,
            &Pdu::FlowControl {
                status,
                block_size: 0,
                st_min: StMin::ZERO.as_byte(),
            },
        )
        .await
    }

    async fn transmit(&self, id: u32, pdu: &Pdu<'_>) -> Result<(), IsoTpError> {
        let frame = pdu::encode(id, pdu)?;
        debug!(%frame, "ISO-TP {} out", pdu.kind());
        self.transport
            .transmit(&frame, self.config.transmit_timeout())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<T: Transport> IsoTpChannel for IsoTp<T> {
    async fn send(&self, msg: &IsoTpMessage) -> Result<(), IsoTpError> {
        IsoTp::send(self, msg).await
    }

    async fn receive(&self, msg: &mut IsoTpMessage) -> Result<usize, IsoTpError> {
        IsoTp::receive(self, msg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_transport::{CanFrame, VirtualBus, VirtualNode};
    use proptest::prelude::*;
    use std::time::Duration;

    const TESTER_TX: u32 = 0x7E0;
    const TESTER_RX: u32 = 0x7E8;
    const WAIT: Duration = Duration::from_millis(100);

    /// Engine under test plus a raw peer node for observing and injecting frames
    struct Rig {
        _bus: VirtualBus,
        engine: IsoTp<Arc<VirtualNode>>,
        peer: Arc<VirtualNode>,
        peer_rx: Arc<QueueSubscriber>,
    }

    impl Rig {
        async fn new(config: IsoTpConfig) -> Self {
            let bus = VirtualBus::default();
            let node = Arc::new(bus.node("tester"));
            let peer = Arc::new(bus.node("peer"));
            node.start().await.unwrap();
            peer.start().await.unwrap();
            let peer_rx = Arc::new(QueueSubscriber::new(1024));
            peer.register_subscriber(peer_rx.clone()).unwrap();
            let engine = IsoTp::new(node, config).unwrap();
            Self {
                _bus: bus,
                engine,
                peer,
                peer_rx,
            }
        }

        async fn inject(&self, data: &[u8]) {
            let frame = CanFrame::padded(TESTER_RX, data, 0).unwrap();
            self.peer.transmit(&frame, WAIT).await.unwrap();
        }

        async fn next_frame(&self) -> CanFrame {
            self.peer_rx.receive(Duration::from_secs(1)).await.unwrap()
        }
    }

    async fn loopback_pair(config: IsoTpConfig) -> (VirtualBus, IsoTp<VirtualNode>, IsoTp<VirtualNode>) {
        let bus = VirtualBus::default();
        let a = bus.node("a");
        let b = bus.node("b");
        a.start().await.unwrap();
        b.start().await.unwrap();
        let sender = IsoTp::new(a, config.clone()).unwrap();
        let receiver = IsoTp::new(b, config).unwrap();
        (bus, sender, receiver)
    }

    async fn round_trip(payload: Vec<u8>) -> Vec<u8> {
        round_trip_with(IsoTpConfig::bulk(), payload).await
    }

    async fn round_trip_with(config: IsoTpConfig, payload: Vec<u8>) -> Vec<u8> {
        let (_bus, sender, receiver) = loopback_pair(config).await;
        let request = IsoTpMessage::new(TESTER_TX, TESTER_RX, &payload);
        let mut response = IsoTpMessage::with_capacity(TESTER_RX, TESTER_TX, MAX_MESSAGE_LEN);

        let (sent, received) = tokio::join!(sender.send(&request), receiver.receive(&mut response));
        sent.unwrap();
        assert_eq!(received.unwrap(), payload.len());
        response.data().to_vec()
    }

    #[tokio::test]
    async fn test_single_byte_frame() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let msg = IsoTpMessage::new(TESTER_TX, TESTER_RX, &[0x3E]);
        rig.engine.send(&msg).await.unwrap();

        let frame = rig.next_frame().await;
        assert_eq!(frame.id(), TESTER_TX);
        assert_eq!(frame.data(), &[0x01, 0x3E, 0, 0, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_seven_byte_single_frame() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let msg = IsoTpMessage::new(TESTER_TX, TESTER_RX, &[1, 2, 3, 4, 5, 6, 7]);
        rig.engine.send(&msg).await.unwrap();
        assert_eq!(rig.next_frame().await.data(), &[0x07, 1, 2, 3, 4, 5, 6, 7]);
        assert!(rig.peer_rx.try_receive().is_none());
    }

    #[tokio::test]
    async fn test_eight_bytes_use_first_and_one_consecutive_frame() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let payload = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
        let msg = IsoTpMessage::new(TESTER_TX, TESTER_RX, &payload);

        let peer = async {
            let ff = rig.next_frame().await;
            assert_eq!(ff.data(), &[0x10, 0x08, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
            rig.inject(&[0x30, 0x00, 0x00]).await;
            let cf = rig.next_frame().await;
            assert_eq!(cf.data(), &[0x21, 0x77, 0x88, 0, 0, 0, 0, 0]);
        };
        let (sent, _) = tokio::join!(rig.engine.send(&msg), peer);
        sent.unwrap();
        assert!(rig.peer_rx.try_receive().is_none());
    }

    #[tokio::test]
    async fn test_rejects_oversized_and_empty_messages() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let too_long = IsoTpMessage::new(TESTER_TX, TESTER_RX, &[0u8; 4096]);
        assert_eq!(rig.engine.send(&too_long).await, Err(IsoTpError::InvalidLength(4096)));
        let empty = IsoTpMessage::new(TESTER_TX, TESTER_RX, &[]);
        assert_eq!(rig.engine.send(&empty).await, Err(IsoTpError::InvalidLength(0)));
        assert!(rig.peer_rx.receive(Duration::from_millis(20)).await.is_none());
    }

    #[tokio::test]
    async fn test_max_length_round_trip_frame_count() {
        let payload: Vec<u8> = (0..MAX_MESSAGE_LEN).map(|i| (i % 251) as u8).collect();
        let rig = Rig::new(IsoTpConfig::default()).await;
        let msg = IsoTpMessage::new(TESTER_TX, TESTER_RX, &payload);

        let peer = async {
            let ff = rig.next_frame().await;
            assert_eq!(&ff.data()[..2], &[0x1F, 0xFF]);
            rig.inject(&[0x30, 0x00, 0x00]).await;
            let mut cfs = 0;
            while rig.peer_rx.receive(Duration::from_millis(50)).await.is_some() {
                cfs += 1;
            }
            cfs
        };
        let (sent, cfs) = tokio::join!(rig.engine.send(&msg), peer);
        sent.unwrap();
        assert_eq!(cfs, 585);
    }

    #[tokio::test]
    async fn test_consecutive_frame_sequence_wraps() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let payload = vec![0xA5; FF_PAYLOAD + CF_PAYLOAD * 18];
        let msg = IsoTpMessage::new(TESTER_TX, TESTER_RX, &payload);

        let peer = async {
            rig.next_frame().await;
            rig.inject(&[0x30, 0x00, 0x00]).await;
            let mut nibbles = Vec::new();
            for _ in 0..18 {
                nibbles.push(rig.next_frame().await.data()[0] & 0x0F);
            }
            nibbles
        };
        let (sent, nibbles) = tokio::join!(rig.engine.send(&msg), peer);
        sent.unwrap();
        assert_eq!(
            nibbles,
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 0, 1, 2]
        );
    }

    #[tokio::test]
    async fn test_block_size_waits_for_next_flow_control() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let payload = vec![0x5A; FF_PAYLOAD + CF_PAYLOAD * 4];
        let msg = IsoTpMessage::new(TESTER_TX, TESTER_RX, &payload);

        let peer = async {
            rig.next_frame().await;
            rig.inject(&[0x30, 0x02, 0x00]).await;
            assert_eq!(rig.next_frame().await.data()[0], 0x21);
            assert_eq!(rig.next_frame().await.data()[0], 0x22);
            assert!(rig.peer_rx.receive(Duration::from_millis(50)).await.is_none());
            rig.inject(&[0x30, 0x02, 0x00]).await;
            assert_eq!(rig.next_frame().await.data()[0], 0x23);
            assert_eq!(rig.next_frame().await.data()[0], 0x24);
        };
        let (sent, _) = tokio::join!(rig.engine.send(&msg), peer);
        sent.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reserved_st_min_paces_at_127ms() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let payload = vec![0x01; FF_PAYLOAD + CF_PAYLOAD * 2];
        let msg = IsoTpMessage::new(TESTER_TX, TESTER_RX, &payload);

        let peer = async {
            rig.next_frame().await;
            rig.inject(&[0x30, 0x00, 0xFA]).await;
            let first = rig.next_frame().await;
            let t1 = Instant::now();
            let second = rig.next_frame().await;
            let gap = t1.elapsed();
            assert_eq!(first.data()[0], 0x21);
            assert_eq!(second.data()[0], 0x22);
            gap
        };
        let (sent, gap) = tokio::join!(rig.engine.send(&msg), peer);
        sent.unwrap();
        assert!(gap >= Duration::from_millis(127), "gap was {gap:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_flow_control_timeout() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let msg = IsoTpMessage::new(TESTER_TX, TESTER_RX, &[0u8; 20]);
        let err = rig.engine.send(&msg).await.unwrap_err();
        assert_eq!(err, IsoTpError::FlowControlTimeout(250));
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_too_many_wait_frames() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let msg = IsoTpMessage::new(TESTER_TX, TESTER_RX, &[0u8; 20]);

        let peer = async {
            rig.next_frame().await;
            for _ in 0..10 {
                rig.inject(&[0x31, 0x00, 0x00]).await;
            }
        };
        let (sent, _) = tokio::join!(rig.engine.send(&msg), peer);
        assert_eq!(sent, Err(IsoTpError::TooManyWaits(10)));
    }

    #[tokio::test]
    async fn test_wait_then_clear_to_send() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let msg = IsoTpMessage::new(TESTER_TX, TESTER_RX, &[7u8; 10]);

        let peer = async {
            rig.next_frame().await;
            rig.inject(&[0x31, 0x00, 0x00]).await;
            rig.inject(&[0x31, 0x00, 0x00]).await;
            rig.inject(&[0x30, 0x00, 0x00]).await;
            rig.next_frame().await
        };
        let (sent, cf) = tokio::join!(rig.engine.send(&msg), peer);
        sent.unwrap();
        assert_eq!(cf.data(), &[0x21, 7, 7, 7, 7, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_peer_overflow_aborts() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let msg = IsoTpMessage::new(TESTER_TX, TESTER_RX, &[0u8; 100]);
        let peer = async {
            rig.next_frame().await;
            rig.inject(&[0x32, 0x00, 0x00]).await;
        };
        let (sent, _) = tokio::join!(rig.engine.send(&msg), peer);
        assert_eq!(sent, Err(IsoTpError::PeerOverflow));
    }

    #[tokio::test]
    async fn test_reserved_flow_status_aborts() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let msg = IsoTpMessage::new(TESTER_TX, TESTER_RX, &[0u8; 100]);
        let peer = async {
            rig.next_frame().await;
            rig.inject(&[0x35, 0x00, 0x00]).await;
        };
        let (sent, _) = tokio::join!(rig.engine.send(&msg), peer);
        assert_eq!(sent, Err(IsoTpError::Malformed(PduError::ReservedFlowStatus(5))));
    }

    #[tokio::test]
    async fn test_receive_single_frame_ignores_other_ids() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let mut msg = IsoTpMessage::with_capacity(TESTER_TX, TESTER_RX, 128);

        let peer = async {
            let other = CanFrame::padded(0x7E9, &[0x03, 0x41, 0x0D, 0x32], 0).unwrap();
            rig.peer.transmit(&other, WAIT).await.unwrap();
            rig.inject(&[0x30, 0x00, 0x00]).await;
            rig.inject(&[0x03, 0x41, 0x05, 0x7B]).await;
        };
        let (received, _) = tokio::join!(rig.engine.receive(&mut msg), peer);
        assert_eq!(received.unwrap(), 3);
        assert_eq!(msg.data(), &[0x41, 0x05, 0x7B]);
    }

    #[tokio::test]
    async fn test_receive_multi_frame_emits_flow_control() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let mut msg = IsoTpMessage::with_capacity(TESTER_TX, TESTER_RX, 128);

        let peer = async {
            rig.inject(&[0x10, 0x14, 0x49, 0x02, 0x01, 0x31, 0x44, 0x34]).await;
            let fc = rig.next_frame().await;
            assert_eq!(fc.id(), TESTER_TX);
            assert_eq!(fc.data(), &[0x30, 0, 0, 0, 0, 0, 0, 0]);
            rig.inject(&[0x21, 0x47, 0x50, 0x30, 0x30, 0x52, 0x35, 0x35]).await;
            rig.inject(&[0x22, 0x42, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36]).await;
        };
        let (received, _) = tokio::join!(rig.engine.receive(&mut msg), peer);
        assert_eq!(received.unwrap(), 20);
        assert_eq!(&msg.data()[..3], &[0x49, 0x02, 0x01]);
        assert_eq!(&msg.data()[3..], b"1D4GP00R55B123456");
    }

    #[tokio::test]
    async fn test_receive_overflow_sends_overflow_flow_control() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let mut msg = IsoTpMessage::with_capacity(TESTER_TX, TESTER_RX, 16);

        let peer = async {
            rig.inject(&[0x10, 0x14, 1, 2, 3, 4, 5, 6]).await;
            rig.next_frame().await
        };
        let (received, fc) = tokio::join!(rig.engine.receive(&mut msg), peer);
        assert_eq!(
            received,
            Err(IsoTpError::BufferOverflow {
                needed: 20,
                capacity: 16
            })
        );
        assert_eq!(fc.data()[0], 0x32);
        assert!(msg.is_empty());
    }

    #[tokio::test]
    async fn test_sequence_violation_keeps_only_first_frame_bytes() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let mut msg = IsoTpMessage::with_capacity(TESTER_TX, TESTER_RX, 32);

        let peer = async {
            rig.inject(&[0x10, 0x0A, 1, 2, 3, 4, 5, 6]).await;
            rig.next_frame().await;
            rig.inject(&[0x23, 7, 8, 9, 10, 0, 0, 0]).await;
        };
        let (received, _) = tokio::join!(rig.engine.receive(&mut msg), peer);
        assert_eq!(
            received,
            Err(IsoTpError::SequenceMismatch {
                expected: 1,
                received: 3
            })
        );
        assert_eq!(msg.len(), 0);
        assert_eq!(&msg.buffer()[..6], &[1, 2, 3, 4, 5, 6]);
        assert!(msg.buffer()[6..].iter().all(|b| *b == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_session_timeout() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let mut msg = IsoTpMessage::with_capacity(TESTER_TX, TESTER_RX, 64);
        let start = Instant::now();
        let err = rig.engine.receive(&mut msg).await.unwrap_err();
        assert_eq!(err, IsoTpError::SessionTimeout(500));
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_consecutive_frame_timeout() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let mut msg = IsoTpMessage::with_capacity(TESTER_TX, TESTER_RX, 64);

        let peer = async {
            rig.inject(&[0x10, 0x14, 1, 2, 3, 4, 5, 6]).await;
            rig.next_frame().await;
        };
        let (received, _) = tokio::join!(rig.engine.receive(&mut msg), peer);
        assert_eq!(received, Err(IsoTpError::ConsecutiveFrameTimeout(250)));
    }

    #[tokio::test]
    async fn test_malformed_single_frame_aborts() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let mut msg = IsoTpMessage::with_capacity(TESTER_TX, TESTER_RX, 64);
        let frame = CanFrame::new(TESTER_RX, &[0x05, 0x41, 0x0C]).unwrap();

        let peer = async {
            rig.peer.transmit(&frame, WAIT).await.unwrap();
        };
        let (received, _) = tokio::join!(rig.engine.receive(&mut msg), peer);
        assert!(matches!(received, Err(IsoTpError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_engine_reusable_after_failure() {
        let rig = Rig::new(IsoTpConfig::default()).await;
        let mut msg = IsoTpMessage::with_capacity(TESTER_TX, TESTER_RX, 32);

        let peer = async {
            rig.inject(&[0x10, 0x0A, 1, 2, 3, 4, 5, 6]).await;
            rig.next_frame().await;
            rig.inject(&[0x22, 7, 8, 9, 10, 0, 0, 0]).await;
        };
        let (first, _) = tokio::join!(rig.engine.receive(&mut msg), peer);
        assert!(first.is_err());

        let peer = async {
            rig.inject(&[0x02, 0x41, 0x00]).await;
        };
        let (second, _) = tokio::join!(rig.engine.receive(&mut msg), peer);
        assert_eq!(second.unwrap(), 2);
        assert_eq!(msg.data(), &[0x41, 0x00]);
    }

    #[tokio::test]
    async fn test_round_trip_boundaries() {
        for len in [1usize, 7, 8, 13, 14, 62, 111, 112, 4095] {
            let payload: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
            assert_eq!(round_trip(payload.clone()).await, payload, "length {len}");
        }
    }

    #[tokio::test]
    async fn test_default_queue_round_trip_beyond_queue_depth() {
        let config = IsoTpConfig::default();
        assert_eq!(config.subscriber_queue_depth, 10);
        for len in [200usize, MAX_MESSAGE_LEN] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 253) as u8).collect();
            assert_eq!(
                round_trip_with(config.clone(), payload.clone()).await,
                payload,
                "length {len}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_queue_round_trip_with_paused_clock() {
        let payload: Vec<u8> = (0..200).map(|i| i as u8).collect();
        assert_eq!(round_trip_with(IsoTpConfig::default(), payload.clone()).await, payload);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn loopback_round_trip_preserves_bytes(
            payload in proptest::collection::vec(any::<u8>(), 1..=MAX_MESSAGE_LEN)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let received = rt.block_on(round_trip(payload.clone()));
            prop_assert_eq!(received, payload);
        }
    }
}
