//! Runtime
//!
//! The single-writer engine loop and the handle used to feed it.

mod engine_loop;

pub use engine_loop::{EngineHandle, EngineLoop, EngineLoopError, EngineMessage, await_order_event};
