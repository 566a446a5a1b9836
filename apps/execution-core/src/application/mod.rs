//! Application Layer
//!
//! The application layer orchestrates domain logic. It defines:
//!
//! - **Ports**: Interfaces for venue clients, persistence, the bus and time
//! - **Cache**: The single store of orders, positions and accounts
//! - **Engines**: Risk and execution engines, execution algorithms and the
//!   kernel wiring them together

pub mod cache;
pub mod component;
pub mod exec_algorithm;
pub mod execution_engine;
pub mod kernel;
pub mod ports;
pub mod risk_engine;

#[cfg(test)]
pub(crate) mod test_kit;

pub use cache::{Cache, CacheConfig, QueryFilter, SharedCache};
pub use component::{ComponentState, ComponentTrigger};
pub use exec_algorithm::{ExecAlgorithm, ExecAlgorithmCore, TwapAlgorithm};
pub use execution_engine::{ExecEngineConfig, ExecutionEngine, ExecutionGateway};
pub use kernel::{KernelConfig, TradingKernel};
pub use ports::*;
pub use risk_engine::{RiskEngine, RiskEngineConfig};
