//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer, plus the
//! process-level concerns around the kernel:
//!
//! - **Driven Adapters (Outbound)**
//!   - `persistence/`: Cache database adapters
//!   - `messaging/`: In-process message bus
//!   - `venue/`: Execution clients that hand commands to venue tasks
//!
//! - **Runtime**
//!   - `runtime/`: The single-writer engine loop
//!   - `config/`: YAML configuration
//!   - `telemetry`: Tracing subscriber setup

pub mod config;
pub mod messaging;
pub mod persistence;
pub mod runtime;
pub mod telemetry;
pub mod venue;

pub use config::{Config, ConfigError, load_config, load_config_from_string};
pub use messaging::MessageBus;
pub use persistence::InMemoryCacheDatabase;
pub use runtime::{EngineHandle, EngineLoop, EngineLoopError, EngineMessage, await_order_event};
pub use telemetry::{TelemetryError, init_telemetry};
pub use venue::{ChannelExecutionClient, VenueCommand};
