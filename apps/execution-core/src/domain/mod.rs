//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Aggregates**: Consistency boundaries with invariants
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Events**: Records of state transitions
//! - **Domain Services**: Stateless business logic
//!
//! # Bounded Contexts
//!
//! - [`order_execution`]: Order lifecycle, commands and events
//! - [`position_management`]: Positions derived from fills
//! - [`account`]: Balances and margins reported by venues
//! - [`risk_management`]: Trading state and order-rate limits
//! - [`execution_tactics`]: Slice schedules for execution algorithms
//! - [`reference_data`]: Instruments and their trading limits

pub mod account;
pub mod execution_tactics;
pub mod order_execution;
pub mod position_management;
pub mod reference_data;
pub mod risk_management;
pub mod shared;
