//! Persistence Adapters
//!
//! Implementations of the [`CacheDatabase`](crate::application::ports::CacheDatabase) port.

pub mod in_memory;

pub use in_memory::InMemoryCacheDatabase;
