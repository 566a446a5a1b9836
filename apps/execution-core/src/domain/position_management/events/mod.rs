//! Position Events
//!
//! Published on `events.position.<strategy_id>` after the execution engine
//! applies a fill.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::aggregate::Position;
use super::value_objects::PositionSide;
use crate::domain::order_execution::value_objects::OrderSide;
use crate::domain::shared::{
    AccountId, ClientOrderId, Currency, InstrumentId, Money, PositionId, Price, Quantity,
    StrategyId, Timestamp, TraderId, UUID4,
};

/// Point-in-time view of a position carried by every position event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Trader instance.
    pub trader_id: TraderId,
    /// Owning strategy.
    pub strategy_id: StrategyId,
    /// Instrument.
    pub instrument_id: InstrumentId,
    /// Position ID.
    pub position_id: PositionId,
    /// Account of the opening fill.
    pub account_id: Option<AccountId>,
    /// Order that opened the position.
    pub opening_order_id: ClientOrderId,
    /// Order that closed the position.
    pub closing_order_id: Option<ClientOrderId>,
    /// Entry side.
    pub entry: OrderSide,
    /// Current side.
    pub side: PositionSide,
    /// Signed quantity.
    pub signed_qty: Decimal,
    /// Absolute quantity.
    pub quantity: Quantity,
    /// Peak absolute quantity.
    pub peak_qty: Quantity,
    /// Quantity of the triggering fill.
    pub last_qty: Option<Quantity>,
    /// Price of the triggering fill.
    pub last_px: Option<Price>,
    /// Settlement currency.
    pub currency: Currency,
    /// Average opening price.
    pub avg_px_open: Decimal,
    /// Average closing price.
    pub avg_px_close: Option<Decimal>,
    /// Realized return.
    pub realized_return: Decimal,
    /// Realized PnL.
    pub realized_pnl: Option<Money>,
    /// Unrealized PnL at the last fill price.
    pub unrealized_pnl: Option<Money>,
    /// Open duration in nanoseconds, once closed.
    pub duration_ns: Option<i64>,
    /// Unique event identifier.
    pub event_id: UUID4,
    /// When the position opened.
    pub ts_opened: Timestamp,
    /// When the position closed.
    pub ts_closed: Option<Timestamp>,
    /// When the event occurred.
    pub ts_event: Timestamp,
    /// When the event object was created.
    pub ts_init: Timestamp,
}

impl PositionSnapshot {
    /// Snapshot `position` as of `ts_init`.
    #[must_use]
    pub fn of(position: &Position, ts_init: Timestamp) -> Self {
        let last_px = position.last_px();
        Self {
            trader_id: position.trader_id().clone(),
            strategy_id: position.strategy_id().clone(),
            instrument_id: position.instrument_id().clone(),
            position_id: position.id().clone(),
            account_id: position.account_id().cloned(),
            opening_order_id: position.opening_order_id().clone(),
            closing_order_id: position.closing_order_id().cloned(),
            entry: position.entry(),
            side: position.side(),
            signed_qty: position.signed_qty(),
            quantity: position.quantity(),
            peak_qty: position.peak_qty(),
            last_qty: position.last_qty(),
            last_px,
            currency: position.settlement_currency().clone(),
            avg_px_open: position.avg_px_open(),
            avg_px_close: position.avg_px_close(),
            realized_return: position.realized_return(),
            realized_pnl: position.realized_pnl().cloned(),
            unrealized_pnl: last_px.map(|px| position.unrealized_pnl(px)),
            duration_ns: position
                .duration()
                .and_then(|duration| duration.num_nanoseconds()),
            event_id: UUID4::new_v4(),
            ts_opened: position.ts_opened(),
            ts_closed: position.ts_closed(),
            ts_event: position.ts_last(),
            ts_init,
        }
    }
}

/// All position events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "snapshot", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionEvent {
    /// First fill opened the position.
    Opened(PositionSnapshot),
    /// A fill changed an open position.
    Changed(PositionSnapshot),
    /// A fill returned the position to flat.
    Closed(PositionSnapshot),
}

impl PositionEvent {
    /// Event for a position that was just created.
    #[must_use]
    pub fn opened(position: &Position, ts_init: Timestamp) -> Self {
        Self::Opened(PositionSnapshot::of(position, ts_init))
    }

    /// `Closed` when flat, `Changed` otherwise.
    #[must_use]
    pub fn after_fill(position: &Position, ts_init: Timestamp) -> Self {
        let snapshot = PositionSnapshot::of(position, ts_init);
        if position.is_closed() {
            Self::Closed(snapshot)
        } else {
            Self::Changed(snapshot)
        }
    }

    /// Snapshot carried by the event.
    #[must_use]
    pub const fn snapshot(&self) -> &PositionSnapshot {
        match self {
            Self::Opened(s) | Self::Changed(s) | Self::Closed(s) => s,
        }
    }

    /// Position the event belongs to.
    #[must_use]
    pub const fn position_id(&self) -> &PositionId {
        &self.snapshot().position_id
    }

    /// Owning strategy.
    #[must_use]
    pub const fn strategy_id(&self) -> &StrategyId {
        &self.snapshot().strategy_id
    }

    /// Event type name (`POSITION_OPENED`, ...).
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Opened(_) => "POSITION_OPENED",
            Self::Changed(_) => "POSITION_CHANGED",
            Self::Closed(_) => "POSITION_CLOSED",
        }
    }
}
