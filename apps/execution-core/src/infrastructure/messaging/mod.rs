//! Messaging Adapters
//!
//! In-process implementation of the [`EventBus`](crate::application::ports::EventBus) port.

mod message_bus;

pub use message_bus::MessageBus;
