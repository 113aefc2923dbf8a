//! In-memory CAN bus
//!
//! Each [`VirtualNode`] behaves like one controller attached to the bus: a
//! bounded transmit mailbox drained by a pump task, and a subscriber table
//! fed with every frame sent by the *other* nodes.
//!
//! A subscriber whose queue is full stalls the sending node's pump for up
//! to `delivery_timeout_ms` before the frame is dropped, so a reader that
//! keeps draining never loses frames to a fast burst.

use crate::error::TransportError;
use crate::frame::CanFrame;
use crate::registry::SubscriberRegistry;
use crate::subscriber::Subscriber;
use crate::transport::Transport;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Virtual bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualBusConfig {
    /// Subscriber table size per node
    pub max_subscribers: usize,
    /// Transmit mailbox depth per node
    pub tx_queue_depth: usize,
    /// How long a full subscriber may hold up delivery (milliseconds)
    pub delivery_timeout_ms: u64,
}

impl Default for VirtualBusConfig {
    fn default() -> Self {
        Self {
            max_subscribers: SubscriberRegistry::DEFAULT_MAX_SUBSCRIBERS,
            tx_queue_depth: 16,
            delivery_timeout_ms: 250,
        }
    }
}

struct NodeShared {
    id: usize,
    name: String,
    registry: SubscriberRegistry,
    started: AtomicBool,
}

struct BusInner {
    config: VirtualBusConfig,
    nodes: Mutex<Vec<Arc<NodeShared>>>,
    next_id: AtomicUsize,
    bus_off: AtomicBool,
}

impl BusInner {
    async fn broadcast(&self, origin: usize, frame: &CanFrame) {
        let peers: Vec<Arc<NodeShared>> = self
            .nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|n| n.id != origin && n.started.load(Ordering::Acquire))
            .cloned()
            .collect();

        let wait = Duration::from_millis(self.config.delivery_timeout_ms);
        for peer in peers {
            let delivered = peer.registry.dispatch_within(frame, wait).await;
            trace!(node = %peer.name, delivered, %frame, "Frame dispatched");
        }
    }
}

/// Shared in-memory bus
#[derive(Clone)]
pub struct VirtualBus {
    inner: Arc<BusInner>,
}

impl VirtualBus {
    pub fn new(config: VirtualBusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                config,
                nodes: Mutex::new(Vec::new()),
                next_id: AtomicUsize::new(0),
                bus_off: AtomicBool::new(false),
            }),
        }
    }

    /// Attach a new controller to the bus
    pub fn node(&self, name: &str) -> VirtualNode {
        let shared = Arc::new(NodeShared {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            registry: SubscriberRegistry::new(self.inner.config.max_subscribers),
            started: AtomicBool::new(false),
        });
        self.inner
            .nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&shared));
        debug!(node = name, "Node attached to virtual bus");

        VirtualNode {
            shared,
            bus: Arc::clone(&self.inner),
            mailbox: Mutex::new(None),
        }
    }

    /// Simulate a bus-off condition; transmits fail while set
    pub fn set_bus_off(&self, bus_off: bool) {
        if bus_off {
            warn!("Virtual bus entering bus-off");
        }
        self.inner.bus_off.store(bus_off, Ordering::Release);
    }

    /// Number of attached nodes
    pub fn node_count(&self) -> usize {
        self.inner
            .nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for VirtualBus {
    fn default() -> Self {
        Self::new(VirtualBusConfig::default())
    }
}

/// One controller on a [`VirtualBus`]
pub struct VirtualNode {
    shared: Arc<NodeShared>,
    bus: Arc<BusInner>,
    mailbox: Mutex<Option<mpsc::Sender<CanFrame>>>,
}

impl VirtualNode {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn is_started(&self) -> bool {
        self.shared.started.load(Ordering::Acquire)
    }

    fn sender(&self) -> Option<mpsc::Sender<CanFrame>> {
        self.mailbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Transport for VirtualNode {
    async fn start(&self) -> Result<(), TransportError> {
        if self.shared.started.swap(true, Ordering::AcqRel) {
            return Err(TransportError::AlreadyInitialised);
        }

        let (tx, mut rx) = mpsc::channel::<CanFrame>(self.bus.config.tx_queue_depth.max(1));
        *self.mailbox.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);

        let bus = Arc::clone(&self.bus);
        let origin = self.shared.id;
        let name = self.shared.name.clone();
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                bus.broadcast(origin, &frame).await;
            }
            debug!(node = %name, "Transmit pump stopped");
        });

        info!(node = %self.shared.name, "Virtual CAN node started");
        Ok(())
    }

    async fn transmit(&self, frame: &CanFrame, timeout: Duration) -> Result<(), TransportError> {
        let sender = self.sender().ok_or(TransportError::NotInitialised)?;
        if self.bus.bus_off.load(Ordering::Acquire) {
            return Err(TransportError::TransmitFailed("bus off".to_string()));
        }

        match tokio::time::timeout(timeout, sender.send(*frame)).await {
            Ok(Ok(())) => {
                trace!(node = %self.shared.name, %frame, "Frame accepted");
                Ok(())
            }
            Ok(Err(_)) => Err(TransportError::TransmitFailed(
                "transmit pump stopped".to_string(),
            )),
            Err(_) => Err(TransportError::Timeout(timeout.as_millis() as u64)),
        }
    }

    fn register_subscriber(&self, subscriber: Arc<dyn Subscriber>) -> Result<(), TransportError> {
        self.shared.registry.register(subscriber)
    }
}

impl Drop for VirtualNode {
    fn drop(&mut self) {
        let mut nodes = self.bus.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        nodes.retain(|n| n.id != self.shared.id);
    }
}
