//! Application Ports (Driven)
//!
//! Interfaces the engines use to reach the outside world:
//! - **`ExecutionClient`**: venue connectivity
//! - **`CacheDatabase`**: durable store behind the cache
//! - **`EventBus`**: in-process publish/subscribe
//! - **`Clock`**: time source, live or simulated

mod cache_database;
mod clock;
mod event_bus;
mod execution_client;

pub use cache_database::{CacheDatabase, CacheError};
pub use clock::{Clock, LiveClock, TestClock};
pub use event_bus::{BusMessage, EventBus, topics};
pub use execution_client::{ExecutionClient, ExecutionClientError};

#[cfg(test)]
pub use execution_client::MockExecutionClient;
