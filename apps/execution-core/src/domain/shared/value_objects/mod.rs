//! Shared Value Objects
//!
//! Immutable domain types used across bounded contexts.
//! Value objects are compared by value, not identity.

mod identifiers;
mod money;
mod price;
mod quantity;

pub use identifiers::{
    AccountId, ClientId, ClientOrderId, Currency, ExecAlgorithmId, InstrumentId, OrderListId,
    PositionId, StrategyId, TradeId, TraderId, Venue, VenueOrderId,
};
pub use money::Money;
pub use price::Price;
pub use quantity::{MAX_PRECISION, Quantity};

/// Unique identifier of a command or event.
pub type UUID4 = uuid::Uuid;

/// Wall-clock timestamp used on commands and events.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
