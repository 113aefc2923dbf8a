//! CAN Transport Layer
//!
//! Single-frame classical CAN transport with a bounded subscriber fan-out.
//! Received frames are dispatched to every registered [`Subscriber`] whose
//! interest predicate accepts them; delivery never blocks the receive path.
//!
//! [`VirtualBus`] provides an in-memory backend used for loopback testing
//! and for running the diagnostic stack without hardware.

mod error;
mod frame;
mod registry;
mod subscriber;
mod transport;
mod virtual_bus;

pub use error::TransportError;
pub use frame::{CanFrame, MAX_DLC, MAX_EXTENDED_ID, MAX_STANDARD_ID};
pub use registry::SubscriberRegistry;
pub use subscriber::{CallbackSubscriber, QueueSubscriber, Subscriber};
pub use transport::Transport;
pub use virtual_bus::{VirtualBus, VirtualBusConfig, VirtualNode};
