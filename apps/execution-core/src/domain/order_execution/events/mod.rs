//! Domain events for order execution.
//!
//! Every status change of an order is the result of applying one of these
//! events. Venue clients emit them; the execution engine applies them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::value_objects::{ContingencyType, LiquiditySide, OrderSide, OrderType, TimeInForce};
use crate::domain::shared::{
    AccountId, ClientOrderId, Currency, ExecAlgorithmId, InstrumentId, Money, OrderListId,
    PositionId, Price, Quantity, StrategyId, Timestamp, TradeId, TraderId, VenueOrderId, UUID4,
};

/// Identity and timing fields shared by every order event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEventHeader {
    /// Trader instance.
    pub trader_id: TraderId,
    /// Owning strategy.
    pub strategy_id: StrategyId,
    /// Instrument traded.
    pub instrument_id: InstrumentId,
    /// Client order ID.
    pub client_order_id: ClientOrderId,
    /// Venue order ID, when known.
    pub venue_order_id: Option<VenueOrderId>,
    /// Account the order trades on, when known.
    pub account_id: Option<AccountId>,
    /// Unique event identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub ts_event: Timestamp,
    /// When the event object was created.
    pub ts_init: Timestamp,
}

impl OrderEventHeader {
    /// Create a header with a fresh event id and no venue identifiers.
    #[must_use]
    pub fn new(
        trader_id: TraderId,
        strategy_id: StrategyId,
        instrument_id: InstrumentId,
        client_order_id: ClientOrderId,
        ts_event: Timestamp,
    ) -> Self {
        Self {
            trader_id,
            strategy_id,
            instrument_id,
            client_order_id,
            venue_order_id: None,
            account_id: None,
            event_id: UUID4::new_v4(),
            ts_event,
            ts_init: ts_event,
        }
    }

    /// Set the venue order ID.
    #[must_use]
    pub fn with_venue_order_id(mut self, venue_order_id: VenueOrderId) -> Self {
        self.venue_order_id = Some(venue_order_id);
        self
    }

    /// Set the account ID.
    #[must_use]
    pub fn with_account_id(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }
}

/// All order events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventAny {
    /// Order created with its immutable parameters.
    Initialized(OrderInitialized),
    /// Order denied before submission.
    Denied(OrderDenied),
    /// Order held locally by the engine.
    Emulated(OrderEmulated),
    /// Order released from local holding.
    Released(OrderReleased),
    /// Order handed to the venue.
    Submitted(OrderSubmitted),
    /// Order acknowledged by the venue.
    Accepted(OrderAccepted),
    /// Order declined by the venue.
    Rejected(OrderRejected),
    /// Order canceled.
    Canceled(OrderCanceled),
    /// Order expired.
    Expired(OrderExpired),
    /// Stop or touch condition reached.
    Triggered(OrderTriggered),
    /// Amend request in flight.
    PendingUpdate(OrderPendingUpdate),
    /// Cancel request in flight.
    PendingCancel(OrderPendingCancel),
    /// Amend request declined.
    ModifyRejected(OrderModifyRejected),
    /// Cancel request declined.
    CancelRejected(OrderCancelRejected),
    /// Order quantity or prices amended.
    Updated(OrderUpdated),
    /// Execution against the order.
    Filled(OrderFilled),
}

macro_rules! with_header {
    ($event:expr, $e:ident => $body:expr) => {
        match $event {
            OrderEventAny::Initialized($e) => $body,
            OrderEventAny::Denied($e) => $body,
            OrderEventAny::Emulated($e) => $body,
            OrderEventAny::Released($e) => $body,
            OrderEventAny::Submitted($e) => $body,
            OrderEventAny::Accepted($e) => $body,
            OrderEventAny::Rejected($e) => $body,
            OrderEventAny::Canceled($e) => $body,
            OrderEventAny::Expired($e) => $body,
            OrderEventAny::Triggered($e) => $body,
            OrderEventAny::PendingUpdate($e) => $body,
            OrderEventAny::PendingCancel($e) => $body,
            OrderEventAny::ModifyRejected($e) => $body,
            OrderEventAny::CancelRejected($e) => $body,
            OrderEventAny::Updated($e) => $body,
            OrderEventAny::Filled($e) => $body,
        }
    };
}

impl OrderEventAny {
    /// Shared identity and timing fields.
    #[must_use]
    pub const fn header(&self) -> &OrderEventHeader {
        with_header!(self, e => &e.header)
    }

    /// Mutable access to the shared fields.
    pub fn header_mut(&mut self) -> &mut OrderEventHeader {
        with_header!(self, e => &mut e.header)
    }

    /// Client order ID the event applies to.
    #[must_use]
    pub const fn client_order_id(&self) -> &ClientOrderId {
        &self.header().client_order_id
    }

    /// Strategy owning the order.
    #[must_use]
    pub const fn strategy_id(&self) -> &StrategyId {
        &self.header().strategy_id
    }

    /// Instrument of the order.
    #[must_use]
    pub const fn instrument_id(&self) -> &InstrumentId {
        &self.header().instrument_id
    }

    /// Venue order ID, when the event carries one.
    #[must_use]
    pub const fn venue_order_id(&self) -> Option<&VenueOrderId> {
        self.header().venue_order_id.as_ref()
    }

    /// Account ID, when the event carries one.
    #[must_use]
    pub const fn account_id(&self) -> Option<&AccountId> {
        self.header().account_id.as_ref()
    }

    /// Unique event identifier.
    #[must_use]
    pub const fn event_id(&self) -> UUID4 {
        self.header().event_id
    }

    /// When the event occurred.
    #[must_use]
    pub const fn ts_event(&self) -> Timestamp {
        self.header().ts_event
    }

    /// Returns the fill if this is an `OrderFilled`.
    #[must_use]
    pub const fn as_fill(&self) -> Option<&OrderFilled> {
        match self {
            Self::Filled(fill) => Some(fill),
            _ => None,
        }
    }

    /// Returns true if this event closes an order that has not been filled further.
    #[must_use]
    pub const fn is_closing(&self) -> bool {
        matches!(
            self,
            Self::Denied(_) | Self::Rejected(_) | Self::Canceled(_) | Self::Expired(_)
        )
    }

    /// Get the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Initialized(_) => "ORDER_INITIALIZED",
            Self::Denied(_) => "ORDER_DENIED",
            Self::Emulated(_) => "ORDER_EMULATED",
            Self::Released(_) => "ORDER_RELEASED",
            Self::Submitted(_) => "ORDER_SUBMITTED",
            Self::Accepted(_) => "ORDER_ACCEPTED",
            Self::Rejected(_) => "ORDER_REJECTED",
            Self::Canceled(_) => "ORDER_CANCELED",
            Self::Expired(_) => "ORDER_EXPIRED",
            Self::Triggered(_) => "ORDER_TRIGGERED",
            Self::PendingUpdate(_) => "ORDER_PENDING_UPDATE",
            Self::PendingCancel(_) => "ORDER_PENDING_CANCEL",
            Self::ModifyRejected(_) => "ORDER_MODIFY_REJECTED",
            Self::CancelRejected(_) => "ORDER_CANCEL_REJECTED",
            Self::Updated(_) => "ORDER_UPDATED",
            Self::Filled(_) => "ORDER_FILLED",
        }
    }
}

/// Event: Order created. Always the first event of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInitialized {
    /// Shared event fields.
    pub header: OrderEventHeader,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Order quantity.
    pub quantity: Quantity,
    /// Limit price.
    pub price: Option<Price>,
    /// Stop or touch trigger price.
    pub trigger_price: Option<Price>,
    /// Time in force.
    pub time_in_force: TimeInForce,
    /// Expiry for GTD orders.
    pub expire_time: Option<Timestamp>,
    /// Order must only add liquidity.
    pub post_only: bool,
    /// Order must only reduce an existing position.
    pub reduce_only: bool,
    /// Contingency relationship to linked orders.
    pub contingency_type: ContingencyType,
    /// Order list this order was submitted with.
    pub order_list_id: Option<OrderListId>,
    /// Orders linked by the contingency.
    pub linked_order_ids: Vec<ClientOrderId>,
    /// Parent of an OTO child.
    pub parent_order_id: Option<ClientOrderId>,
    /// Execution algorithm managing the order.
    pub exec_algorithm_id: Option<ExecAlgorithmId>,
    /// Execution algorithm parameters.
    pub exec_algorithm_params: BTreeMap<String, String>,
    /// Primary order of the exec-spawn family.
    pub exec_spawn_id: Option<ClientOrderId>,
    /// Free-form tags.
    pub tags: Vec<String>,
}

impl OrderInitialized {
    /// Hand the order to an execution algorithm as the primary of a new
    /// exec-spawn family.
    #[must_use]
    pub fn with_exec_algorithm(
        mut self,
        exec_algorithm_id: ExecAlgorithmId,
        params: BTreeMap<String, String>,
    ) -> Self {
        self.exec_spawn_id = Some(self.header.client_order_id.clone());
        self.exec_algorithm_id = Some(exec_algorithm_id);
        self.exec_algorithm_params = params;
        self
    }
}

/// Event: Order denied before submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDenied {
    /// Shared event fields.
    pub header: OrderEventHeader,
    /// Why the order was denied.
    pub reason: String,
}

/// Event: Order held locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEmulated {
    /// Shared event fields.
    pub header: OrderEventHeader,
}

/// Event: Order released from local holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReleased {
    /// Shared event fields.
    pub header: OrderEventHeader,
}

/// Event: Order handed to the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmitted {
    /// Shared event fields.
    pub header: OrderEventHeader,
}

/// Event: Order accepted by the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAccepted {
    /// Shared event fields.
    pub header: OrderEventHeader,
}

/// Event: Order rejected by the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRejected {
    /// Shared event fields.
    pub header: OrderEventHeader,
    /// Venue's reason.
    pub reason: String,
}

/// Event: Order canceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCanceled {
    /// Shared event fields.
    pub header: OrderEventHeader,
}

/// Event: Order expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExpired {
    /// Shared event fields.
    pub header: OrderEventHeader,
}

/// Event: Order triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTriggered {
    /// Shared event fields.
    pub header: OrderEventHeader,
}

/// Event: Amend request sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPendingUpdate {
    /// Shared event fields.
    pub header: OrderEventHeader,
}

/// Event: Cancel request sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPendingCancel {
    /// Shared event fields.
    pub header: OrderEventHeader,
}

/// Event: Amend request declined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderModifyRejected {
    /// Shared event fields.
    pub header: OrderEventHeader,
    /// Why the amend was declined.
    pub reason: String,
}

/// Event: Cancel request declined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelRejected {
    /// Shared event fields.
    pub header: OrderEventHeader,
    /// Why the cancel was declined.
    pub reason: String,
}

/// Event: Order amended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdated {
    /// Shared event fields.
    pub header: OrderEventHeader,
    /// New order quantity.
    pub quantity: Quantity,
    /// New limit price.
    pub price: Option<Price>,
    /// New trigger price.
    pub trigger_price: Option<Price>,
}

/// Event: Order (partially) filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilled {
    /// Shared event fields.
    pub header: OrderEventHeader,
    /// Venue trade identifier.
    pub trade_id: TradeId,
    /// Position the fill applies to, assigned by the execution engine.
    pub position_id: Option<PositionId>,
    /// Side of the fill.
    pub order_side: OrderSide,
    /// Type of the filled order.
    pub order_type: OrderType,
    /// Quantity of this fill.
    pub last_qty: Quantity,
    /// Price of this fill.
    pub last_px: Price,
    /// Settlement currency.
    pub currency: Currency,
    /// Commission charged for this fill.
    pub commission: Option<Money>,
    /// Maker or taker.
    pub liquidity_side: LiquiditySide,
}

impl From<OrderFilled> for OrderEventAny {
    fn from(fill: OrderFilled) -> Self {
        Self::Filled(fill)
    }
}

impl OrderFilled {
    /// Signed fill quantity (positive for buys).
    #[must_use]
    pub fn signed_qty(&self) -> rust_decimal::Decimal {
        self.last_qty.as_decimal() * self.order_side.sign()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_header() -> OrderEventHeader {
        OrderEventHeader::new(
            TraderId::new("TESTER-000"),
            StrategyId::new("S-001"),
            InstrumentId::new("AUD/USD.SIM"),
            ClientOrderId::new("O-1"),
            Utc::now(),
        )
    }

    #[test]
    fn header_accessors() {
        let event = OrderEventAny::Accepted(OrderAccepted {
            header: make_header().with_venue_order_id(VenueOrderId::new("V-1")),
        });
        assert_eq!(event.client_order_id().as_str(), "O-1");
        assert_eq!(event.venue_order_id().unwrap().as_str(), "V-1");
        assert!(event.account_id().is_none());
        assert_eq!(event.event_type(), "ORDER_ACCEPTED");
    }

    #[test]
    fn closing_events() {
        let canceled = OrderEventAny::Canceled(OrderCanceled {
            header: make_header(),
        });
        let triggered = OrderEventAny::Triggered(OrderTriggered {
            header: make_header(),
        });
        assert!(canceled.is_closing());
        assert!(!triggered.is_closing());
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = OrderEventAny::Denied(OrderDenied {
            header: make_header(),
            reason: "Duplicate".to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "DENIED");
        assert_eq!(json["reason"], "Duplicate");
    }

    #[test]
    fn signed_fill_quantity() {
        let fill = OrderFilled {
            header: make_header(),
            trade_id: TradeId::new("T-1"),
            position_id: None,
            order_side: OrderSide::Sell,
            order_type: OrderType::Market,
            last_qty: Quantity::from_u64(10),
            last_px: "1.0".parse().unwrap(),
            currency: Currency::new("USD"),
            commission: None,
            liquidity_side: LiquiditySide::Taker,
        };
        assert_eq!(fill.signed_qty(), rust_decimal::Decimal::from(-10));
    }
}
