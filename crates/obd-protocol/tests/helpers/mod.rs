//! Test doubles on the virtual bus: a raw frame peer and a scripted ECU.

use can_transport::{CanFrame, QueueSubscriber, Transport, VirtualBus, VirtualNode};
use iso_tp::{IsoTp, IsoTpConfig, IsoTpMessage};
use obd_protocol::{Obd2, Obd2Config};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const REQUEST_ID: u32 = 0x7DF;
pub const RESPONSE_ID: u32 = 0x7E8;

/// Node that sees every frame and injects frames verbatim.
#[allow(dead_code)]
pub struct RawPeer {
    node: VirtualNode,
    rx: Arc<QueueSubscriber>,
}

#[allow(dead_code)]
impl RawPeer {
    pub async fn attach(bus: &VirtualBus) -> Self {
        let node = bus.node("raw-peer");
        node.start().await.unwrap();
        let rx = Arc::new(QueueSubscriber::new(64));
        node.register_subscriber(rx.clone()).unwrap();
        Self { node, rx }
    }

    /// Next frame on the bus, failing the test after one second
    pub async fn expect_frame(&self) -> CanFrame {
        self.rx
            .receive(Duration::from_secs(1))
            .await
            .expect("no frame from the tester")
    }

    pub async fn send(&self, id: u32, data: &[u8]) {
        let frame = CanFrame::new(id, data).unwrap();
        self.node
            .transmit(&frame, Duration::from_millis(50))
            .await
            .unwrap();
    }
}

/// Spawn an ECU that answers scripted request payloads over ISO-TP
#[allow(dead_code)]
pub async fn spawn_scripted_ecu(bus: &VirtualBus, script: HashMap<Vec<u8>, Vec<u8>>) -> JoinHandle<()> {
    let node = bus.node("scripted-ecu");
    node.start().await.unwrap();
    let engine = IsoTp::new(node, IsoTpConfig::default()).unwrap();

    tokio::spawn(async move {
        loop {
            let mut request = IsoTpMessage::with_capacity(RESPONSE_ID, REQUEST_ID, 64);
            if engine.receive(&mut request).await.is_err() {
                continue;
            }
            if let Some(reply) = script.get(request.data()) {
                let response = IsoTpMessage::new(RESPONSE_ID, REQUEST_ID, reply);
                let _ = engine.send(&response).await;
            }
        }
    })
}

/// Tester-side OBD-II client on its own bus node
#[allow(dead_code)]
pub async fn tester(bus: &VirtualBus) -> Obd2<IsoTp<VirtualNode>> {
    let node = bus.node("tester");
    node.start().await.unwrap();
    let engine = IsoTp::new(node, IsoTpConfig::default()).unwrap();
    Obd2::new(engine, Obd2Config::default()).unwrap()
}
