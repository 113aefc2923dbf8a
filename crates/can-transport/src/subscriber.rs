//! Frame subscribers
//!
//! A subscriber sits between a transport's receive path and a consumer.
//! `deliver` is called from the dispatch path and must never block.
//! `deliver_within` is the paced variant used by transports that can
//! hold a frame back until the consumer has room for it.

use crate::frame::CanFrame;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::trace;

/// Consumer of frames dispatched by a transport
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Interest predicate; frames rejected here are never delivered.
    fn interested(&self, _frame: &CanFrame) -> bool {
        true
    }

    /// Non-blocking hand-off. Returns `false` when the frame was dropped.
    fn deliver(&self, frame: CanFrame) -> bool;

    /// Hand-off that may wait up to `timeout` for room.
    async fn deliver_within(&self, frame: CanFrame, _timeout: Duration) -> bool {
        self.deliver(frame)
    }
}

type Filter = Box<dyn Fn(&CanFrame) -> bool + Send + Sync>;

/// Bounded queue adapter read by a consumer at its own pace
pub struct QueueSubscriber {
    tx: mpsc::Sender<CanFrame>,
    rx: Mutex<mpsc::Receiver<CanFrame>>,
    filter: Option<Filter>,
    capacity: usize,
    dropped: AtomicU64,
}

impl QueueSubscriber {
    /// Default queue depth
    pub const DEFAULT_CAPACITY: usize = 10;

    /// Create a subscriber accepting every frame
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            filter: None,
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Create a subscriber that only accepts frames matching `filter`
    pub fn with_filter<F>(capacity: usize, filter: F) -> Self
    where
        F: Fn(&CanFrame) -> bool + Send + Sync + 'static,
    {
        Self {
            filter: Some(Box::new(filter)),
            ..Self::new(capacity)
        }
    }

    /// Wait up to `timeout` for the next frame
    pub async fn receive(&self, timeout: Duration) -> Option<CanFrame> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(frame) => frame,
            Err(_) => None,
        }
    }

    /// Take a queued frame without waiting
    pub fn try_receive(&self) -> Option<CanFrame> {
        let mut rx = self.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }

    /// Drop every queued frame, returning how many were discarded
    pub async fn clear(&self) -> usize {
        let mut rx = self.rx.lock().await;
        let mut discarded = 0;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }

    /// Queue depth
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames dropped because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for QueueSubscriber {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl Subscriber for QueueSubscriber {
    fn interested(&self, frame: &CanFrame) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(frame))
    }

    fn deliver(&self, frame: CanFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(frame)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!(%frame, "Queue is full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    async fn deliver_within(&self, frame: CanFrame, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.tx.send(frame)).await {
            Ok(sent) => sent.is_ok(),
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!(%frame, "Queue stayed full, dropping frame");
                false
            }
        }
    }
}

/// Subscriber that hands each frame to a closure
pub struct CallbackSubscriber<F> {
    callback: F,
    filter: Option<Filter>,
}

impl<F> CallbackSubscriber<F>
where
    F: Fn(CanFrame) -> bool + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            filter: None,
        }
    }

    pub fn with_filter<P>(callback: F, filter: P) -> Self
    where
        P: Fn(&CanFrame) -> bool + Send + Sync + 'static,
    {
        Self {
            callback,
            filter: Some(Box::new(filter)),
        }
    }
}

impl<F> Subscriber for CallbackSubscriber<F>
where
    F: Fn(CanFrame) -> bool + Send + Sync,
{
    fn interested(&self, frame: &CanFrame) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(frame))
    }

    fn deliver(&self, frame: CanFrame) -> bool {
        (self.callback)(frame)
    }
}
