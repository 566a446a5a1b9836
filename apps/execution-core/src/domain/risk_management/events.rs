//! Risk events.

use serde::{Deserialize, Serialize};

use super::value_objects::TradingState;
use crate::domain::shared::{Timestamp, TraderId, UUID4};

/// Published on `events.risk` when the trading state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingStateChanged {
    /// Trader instance.
    pub trader_id: TraderId,
    /// New trading state.
    pub state: TradingState,
    /// Unique event identifier.
    pub event_id: UUID4,
    /// When the state changed.
    pub ts_event: Timestamp,
    /// When the event object was created.
    pub ts_init: Timestamp,
}

impl TradingStateChanged {
    /// Create an event with a fresh ID.
    #[must_use]
    pub fn new(trader_id: TraderId, state: TradingState, ts: Timestamp) -> Self {
        Self {
            trader_id,
            state,
            event_id: UUID4::new_v4(),
            ts_event: ts,
            ts_init: ts,
        }
    }
}
