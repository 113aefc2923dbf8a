//! Transport trait

use crate::error::TransportError;
use crate::frame::CanFrame;
use crate::subscriber::Subscriber;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Single-frame CAN transport with subscriber dispatch.
///
/// Implementations own the controller; upper layers hold an `Arc` to it and
/// never reach back into each other.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Initialise the controller, arm RX and begin dispatch
    async fn start(&self) -> Result<(), TransportError>;

    /// Queue `frame` for transmission, waiting up to `timeout` for the bus to accept it
    async fn transmit(&self, frame: &CanFrame, timeout: Duration) -> Result<(), TransportError>;

    /// Add a subscriber to the dispatch table
    fn register_subscriber(&self, subscriber: Arc<dyn Subscriber>) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn start(&self) -> Result<(), TransportError> {
        (**self).start().await
    }

    async fn transmit(&self, frame: &CanFrame, timeout: Duration) -> Result<(), TransportError> {
        (**self).transmit(frame, timeout).await
    }

    fn register_subscriber(&self, subscriber: Arc<dyn Subscriber>) -> Result<(), TransportError> {
        (**self).register_subscriber(subscriber)
    }
}
