//! Risk Management Bounded Context
//!
//! Engine-wide trading state and order-rate limits used by the pre-trade
//! risk engine.
//!
//! # Key Concepts
//!
//! - **Trading State**: ACTIVE, REDUCING or HALTED gate on outbound commands
//! - **Rate Limit**: `<limit>/<HH:MM:SS>` budget for submits and modifies
//! - **Throttler**: sliding-window counter enforcing a rate limit

pub mod errors;
pub mod events;
pub mod services;
pub mod value_objects;

pub use errors::RiskError;
pub use events::TradingStateChanged;
pub use services::Throttler;
pub use value_objects::{RateLimit, TradingState};
