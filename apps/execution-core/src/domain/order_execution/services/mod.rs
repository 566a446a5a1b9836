//! Order Execution Domain Services
//!
//! Stateless business logic that doesn't fit in aggregates.

mod event_builder;
mod order_factory;
mod order_state_machine;

pub use event_builder::OrderEventBuilder;
pub use order_factory::OrderFactory;
pub use order_state_machine::OrderStateMachine;
