//! Shared Domain Types
//!
//! Value objects and errors shared across bounded contexts.

pub mod errors;
pub mod value_objects;

pub use errors::DomainError;
pub use value_objects::{
    AccountId, ClientId, ClientOrderId, Currency, ExecAlgorithmId, InstrumentId, MAX_PRECISION,
    Money, OrderListId, PositionId, Price, Quantity, StrategyId, Timestamp, TradeId, TraderId,
    UUID4, Venue, VenueOrderId,
};
