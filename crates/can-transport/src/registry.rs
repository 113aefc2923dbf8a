//! Fixed-size subscriber table shared by a transport's receive path

use crate::error::TransportError;
use crate::frame::CanFrame;
use crate::subscriber::Subscriber;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Registry of subscribers with a fixed upper bound
pub struct SubscriberRegistry {
    entries: Mutex<Vec<Arc<dyn Subscriber>>>,
    max_subscribers: usize,
}

impl SubscriberRegistry {
    /// Default table size
    pub const DEFAULT_MAX_SUBSCRIBERS: usize = 8;

    pub fn new(max_subscribers: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(max_subscribers)),
            max_subscribers,
        }
    }

    /// Add a subscriber; fails with `NoMem` once the table is full
    pub fn register(&self, subscriber: Arc<dyn Subscriber>) -> Result<(), TransportError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= self.max_subscribers {
            warn!(
                "Subscriber table full ({} entries), rejecting registration",
                self.max_subscribers
            );
            return Err(TransportError::NoMem(self.max_subscribers));
        }
        entries.push(subscriber);
        debug!("Subscriber registered ({}/{})", entries.len(), self.max_subscribers);
        Ok(())
    }

    /// Offer `frame` to every interested subscriber.
    ///
    /// Returns the number of subscribers that accepted it.
    pub fn dispatch(&self, frame: &CanFrame) -> usize {
        let snapshot = self.snapshot();

        let mut delivered = 0;
        for subscriber in snapshot.iter().filter(|s| s.interested(frame)) {
            if subscriber.deliver(*frame) {
                delivered += 1;
            } else {
                warn!(%frame, "Subscriber could not accept frame, dropped");
            }
        }
        delivered
    }

    /// Like [`dispatch`](Self::dispatch), but a full subscriber may hold the
    /// frame back for up to `timeout` before it is dropped.
    pub async fn dispatch_within(&self, frame: &CanFrame, timeout: Duration) -> usize {
        let snapshot = self.snapshot();

        let mut delivered = 0;
        for subscriber in snapshot.iter().filter(|s| s.interested(frame)) {
            if subscriber.deliver_within(*frame, timeout).await {
                delivered += 1;
            } else {
                warn!(%frame, "Subscriber stayed full for {:?}, dropped", timeout);
            }
        }
        delivered
    }

    fn snapshot(&self) -> Vec<Arc<dyn Subscriber>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_subscribers(&self) -> usize {
        self.max_subscribers
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_SUBSCRIBERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::QueueSubscriber;
    use std::time::Duration;

    #[test]
    fn test_register_until_full() {
        let registry = SubscriberRegistry::new(2);
        registry.register(Arc::new(QueueSubscriber::default())).unwrap();
        registry.register(Arc::new(QueueSubscriber::default())).unwrap();
        let err = registry
            .register(Arc::new(QueueSubscriber::default()))
            .unwrap_err();
        assert_eq!(err, TransportError::NoMem(2));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_respects_interest() {
        let registry = SubscriberRegistry::default();
        let all = Arc::new(QueueSubscriber::default());
        let ecu_only = Arc::new(QueueSubscriber::with_filter(4, |f| f.id() == 0x7E8));
        registry.register(all.clone()).unwrap();
        registry.register(ecu_only.clone()).unwrap();

        let request = CanFrame::new(0x7DF, &[0x02, 0x01, 0x0C]).unwrap();
        let response = CanFrame::new(0x7E8, &[0x04, 0x41, 0x0C, 0x1A, 0xF8]).unwrap();
        assert_eq!(registry.dispatch(&request), 1);
        assert_eq!(registry.dispatch(&response), 2);

        let timeout = Duration::from_millis(10);
        assert_eq!(all.receive(timeout).await.unwrap(), request);
        assert_eq!(all.receive(timeout).await.unwrap(), response);
        assert_eq!(ecu_only.receive(timeout).await.unwrap(), response);
        assert!(ecu_only.try_receive().is_none());
    }

    #[test]
    fn test_slow_subscriber_does_not_block_others() {
        let registry = SubscriberRegistry::default();
        let slow = Arc::new(QueueSubscriber::new(1));
        let fast = Arc::new(QueueSubscriber::new(8));
        registry.register(slow.clone()).unwrap();
        registry.register(fast.clone()).unwrap();

        let frame = CanFrame::new(0x123, &[0xAA]).unwrap();
        assert_eq!(registry.dispatch(&frame), 2);
        assert_eq!(registry.dispatch(&frame), 1);
        assert_eq!(slow.dropped(), 1);
        assert_eq!(fast.dropped(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paced_dispatch_bounds_the_wait() {
        let registry = SubscriberRegistry::default();
        let stalled = Arc::new(QueueSubscriber::new(1));
        let fast = Arc::new(QueueSubscriber::new(8));
        registry.register(stalled.clone()).unwrap();
        registry.register(fast.clone()).unwrap();

        let frame = CanFrame::new(0x123, &[0xAA]).unwrap();
        let wait = Duration::from_millis(50);
        assert_eq!(registry.dispatch_within(&frame, wait).await, 2);

        let start = tokio::time::Instant::now();
        assert_eq!(registry.dispatch_within(&frame, wait).await, 1);
        assert!(start.elapsed() >= wait);
        assert_eq!(stalled.dropped(), 1);
        assert_eq!(fast.try_receive(), Some(frame));
        assert_eq!(fast.try_receive(), Some(frame));
    }
}
