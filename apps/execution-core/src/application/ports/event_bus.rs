//! Event Bus Port (Driven Port)
//!
//! Engines publish every applied event by topic; strategies, algorithms and
//! the kernel subscribe by pattern.

use tokio::sync::mpsc::UnboundedReceiver;

use crate::domain::account::AccountState;
use crate::domain::order_execution::events::OrderEventAny;
use crate::domain::position_management::PositionEvent;
use crate::domain::risk_management::TradingStateChanged;

/// Message delivered to bus subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusMessage {
    /// An order event was applied (or a command was denied).
    OrderEvent(OrderEventAny),
    /// A position opened, changed or closed.
    PositionEvent(PositionEvent),
    /// An account state was applied.
    AccountState(AccountState),
    /// The risk engine changed trading state.
    TradingStateChanged(TradingStateChanged),
}

impl BusMessage {
    /// The order event, if this is one.
    #[must_use]
    pub const fn as_order_event(&self) -> Option<&OrderEventAny> {
        match self {
            Self::OrderEvent(event) => Some(event),
            _ => None,
        }
    }
}

/// Topic names.
pub mod topics {
    use crate::domain::shared::{AccountId, StrategyId};

    /// Risk engine notifications.
    pub const RISK: &str = "events.risk";

    /// Order events of one strategy.
    #[must_use]
    pub fn order_events(strategy_id: &StrategyId) -> String {
        format!("events.order.{strategy_id}")
    }

    /// Position events of one strategy.
    #[must_use]
    pub fn position_events(strategy_id: &StrategyId) -> String {
        format!("events.position.{strategy_id}")
    }

    /// Account states of one account.
    #[must_use]
    pub fn account_events(account_id: &AccountId) -> String {
        format!("events.account.{account_id}")
    }
}

/// Port for in-process publish/subscribe.
pub trait EventBus: Send + Sync {
    /// Deliver `message` to every subscriber whose pattern matches `topic`.
    /// Never blocks.
    fn publish(&self, topic: &str, message: BusMessage);

    /// Subscribe to an exact topic or a prefix ending in `*`.
    fn subscribe(&self, pattern: &str) -> UnboundedReceiver<BusMessage>;
}
