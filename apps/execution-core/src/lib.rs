// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Execution Core - Order, Position and Risk Engines
//!
//! Turns strategy commands and venue reports into consistent order and
//! position state while enforcing pre-trade risk limits.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic (aggregates, value objects, domain events)
//!   - `order_execution`: Order aggregate, status lifecycle, commands and events
//!   - `position_management`: Positions derived from fills, flips, OMS types
//!   - `account`: Cash and margin balances reported by venues
//!   - `risk_management`: Trading state, rate limits and throttling
//!   - `execution_tactics`: TWAP slice schedules
//!   - `reference_data`: Instruments and their trading limits
//!
//! - **Application**: Engines and orchestration
//!   - `cache`: The single store of orders, positions and accounts
//!   - `risk_engine`: Ordered pre-trade checks and the trading-state gate
//!   - `execution_engine`: Command routing, event application, contingencies
//!   - `exec_algorithm`: Exec-spawn families and the TWAP algorithm
//!   - `kernel`: Wires engines and algorithms together
//!   - `ports`: Interfaces for venue clients, persistence, the bus and time
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `messaging`: In-process message bus
//!   - `persistence`: In-memory cache database
//!   - `venue`: Channel-backed execution client
//!   - `runtime`: The single-writer engine loop
//!   - `config`, `telemetry`: YAML configuration and tracing setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Engines, cache and port definitions.
pub mod application;

/// Infrastructure layer - Adapters, configuration and runtime.
pub mod infrastructure;

/// Metrics helpers.
pub mod observability;

// =============================================================================
// Re-exports from Clean Architecture
// =============================================================================

// Domain re-exports
pub use domain::order_execution::{
    Order, OrderEventAny, OrderFactory, OrderList, OrderSide, OrderStatus, OrderType,
    TimeInForce, TradingCommand,
};
pub use domain::position_management::{OmsType, Position, PositionSide};
pub use domain::risk_management::TradingState;
pub use domain::shared::{
    ClientOrderId, InstrumentId, Money, PositionId, Price, Quantity, StrategyId, Timestamp,
    TraderId,
};

// Application re-exports
pub use application::{
    Cache, CacheConfig, ExecAlgorithm, ExecEngineConfig, ExecutionEngine, KernelConfig,
    QueryFilter, RiskEngine, RiskEngineConfig, SharedCache, TradingKernel, TwapAlgorithm,
};

// Infrastructure re-exports
pub use infrastructure::{
    ChannelExecutionClient, Config, EngineHandle, EngineLoop, EngineMessage, InMemoryCacheDatabase,
    MessageBus, init_telemetry, load_config,
};
