//! Order Aggregate Root
//!
//! An order's state only advances by applying [`OrderEventAny`] values. The
//! aggregate keeps the full event history, which doubles as the idempotence
//! record for replayed venue messages.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::events::{
    OrderEventAny, OrderEventHeader, OrderFilled, OrderInitialized, OrderUpdated,
};
use crate::domain::order_execution::services::OrderStateMachine;
use crate::domain::order_execution::value_objects::{
    ContingencyType, LiquiditySide, OrderSide, OrderStatus, OrderType, TimeInForce,
};
use crate::domain::position_management::PositionSide;
use crate::domain::shared::{
    AccountId, ClientOrderId, Currency, ExecAlgorithmId, InstrumentId, Money, OrderListId,
    PositionId, Price, Quantity, StrategyId, Timestamp, TradeId, TraderId, Venue, VenueOrderId,
    UUID4,
};

/// Order Aggregate Root.
#[allow(clippy::struct_field_names, clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    trader_id: TraderId,
    strategy_id: StrategyId,
    instrument_id: InstrumentId,
    client_order_id: ClientOrderId,
    venue_order_id: Option<VenueOrderId>,
    position_id: Option<PositionId>,
    account_id: Option<AccountId>,
    last_trade_id: Option<TradeId>,
    side: OrderSide,
    order_type: OrderType,
    quantity: Quantity,
    price: Option<Price>,
    trigger_price: Option<Price>,
    time_in_force: TimeInForce,
    expire_time: Option<Timestamp>,
    post_only: bool,
    reduce_only: bool,
    liquidity_side: LiquiditySide,
    contingency_type: ContingencyType,
    order_list_id: Option<OrderListId>,
    linked_order_ids: Vec<ClientOrderId>,
    parent_order_id: Option<ClientOrderId>,
    exec_algorithm_id: Option<ExecAlgorithmId>,
    exec_algorithm_params: BTreeMap<String, String>,
    exec_spawn_id: Option<ClientOrderId>,
    tags: Vec<String>,
    status: OrderStatus,
    status_before_pending: Option<OrderStatus>,
    filled_qty: Quantity,
    leaves_qty: Quantity,
    overfill_qty: Option<Quantity>,
    avg_px: Option<Decimal>,
    commissions: BTreeMap<Currency, Money>,
    trade_ids: Vec<TradeId>,
    events: Vec<OrderEventAny>,
    init_id: UUID4,
    ts_init: Timestamp,
    ts_submitted: Option<Timestamp>,
    ts_accepted: Option<Timestamp>,
    ts_closed: Option<Timestamp>,
    ts_last: Timestamp,
}

impl Order {
    /// Create an order in `INITIALIZED` status from its initialization event.
    #[must_use]
    pub fn new(init: OrderInitialized) -> Self {
        let header = &init.header;
        let filled_qty = Quantity::zero(init.quantity.precision());
        Self {
            trader_id: header.trader_id.clone(),
            strategy_id: header.strategy_id.clone(),
            instrument_id: header.instrument_id.clone(),
            client_order_id: header.client_order_id.clone(),
            venue_order_id: None,
            position_id: None,
            account_id: None,
            last_trade_id: None,
            side: init.side,
            order_type: init.order_type,
            quantity: init.quantity,
            price: init.price,
            trigger_price: init.trigger_price,
            time_in_force: init.time_in_force,
            expire_time: init.expire_time,
            post_only: init.post_only,
            reduce_only: init.reduce_only,
            liquidity_side: LiquiditySide::NoLiquiditySide,
            contingency_type: init.contingency_type,
            order_list_id: init.order_list_id.clone(),
            linked_order_ids: init.linked_order_ids.clone(),
            parent_order_id: init.parent_order_id.clone(),
            exec_algorithm_id: init.exec_algorithm_id.clone(),
            exec_algorithm_params: init.exec_algorithm_params.clone(),
            exec_spawn_id: init.exec_spawn_id.clone(),
            tags: init.tags.clone(),
            status: OrderStatus::Initialized,
            status_before_pending: None,
            filled_qty,
            leaves_qty: init.quantity,
            overfill_qty: None,
            avg_px: None,
            commissions: BTreeMap::new(),
            trade_ids: Vec::new(),
            init_id: header.event_id,
            ts_init: header.ts_event,
            ts_submitted: None,
            ts_accepted: None,
            ts_closed: None,
            ts_last: header.ts_event,
            events: vec![OrderEventAny::Initialized(init)],
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Trader instance.
    #[must_use]
    pub const fn trader_id(&self) -> &TraderId {
        &self.trader_id
    }

    /// Owning strategy.
    #[must_use]
    pub const fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    /// Instrument traded.
    #[must_use]
    pub const fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    /// Venue of the instrument.
    #[must_use]
    pub fn venue(&self) -> Venue {
        self.instrument_id.venue()
    }

    /// Client order ID.
    #[must_use]
    pub const fn client_order_id(&self) -> &ClientOrderId {
        &self.client_order_id
    }

    /// Venue order ID, once accepted.
    #[must_use]
    pub const fn venue_order_id(&self) -> Option<&VenueOrderId> {
        self.venue_order_id.as_ref()
    }

    /// Position the last fill was applied to.
    #[must_use]
    pub const fn position_id(&self) -> Option<&PositionId> {
        self.position_id.as_ref()
    }

    /// Account the order trades on.
    #[must_use]
    pub const fn account_id(&self) -> Option<&AccountId> {
        self.account_id.as_ref()
    }

    /// Last applied trade ID.
    #[must_use]
    pub const fn last_trade_id(&self) -> Option<&TradeId> {
        self.last_trade_id.as_ref()
    }

    /// Order side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Order quantity.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Limit price.
    #[must_use]
    pub const fn price(&self) -> Option<Price> {
        self.price
    }

    /// Trigger price.
    #[must_use]
    pub const fn trigger_price(&self) -> Option<Price> {
        self.trigger_price
    }

    /// Time in force.
    #[must_use]
    pub const fn time_in_force(&self) -> TimeInForce {
        self.time_in_force
    }

    /// Expiry of a GTD order.
    #[must_use]
    pub const fn expire_time(&self) -> Option<Timestamp> {
        self.expire_time
    }

    /// Post-only flag.
    #[must_use]
    pub const fn is_post_only(&self) -> bool {
        self.post_only
    }

    /// Reduce-only flag.
    #[must_use]
    pub const fn is_reduce_only(&self) -> bool {
        self.reduce_only
    }

    /// Liquidity side of the last fill.
    #[must_use]
    pub const fn liquidity_side(&self) -> LiquiditySide {
        self.liquidity_side
    }

    /// Contingency type.
    #[must_use]
    pub const fn contingency_type(&self) -> ContingencyType {
        self.contingency_type
    }

    /// Order list ID.
    #[must_use]
    pub const fn order_list_id(&self) -> Option<&OrderListId> {
        self.order_list_id.as_ref()
    }

    /// Contingency-linked orders.
    #[must_use]
    pub fn linked_order_ids(&self) -> &[ClientOrderId] {
        &self.linked_order_ids
    }

    /// Parent of an OTO child.
    #[must_use]
    pub const fn parent_order_id(&self) -> Option<&ClientOrderId> {
        self.parent_order_id.as_ref()
    }

    /// Execution algorithm ID.
    #[must_use]
    pub const fn exec_algorithm_id(&self) -> Option<&ExecAlgorithmId> {
        self.exec_algorithm_id.as_ref()
    }

    /// Execution algorithm parameters.
    #[must_use]
    pub const fn exec_algorithm_params(&self) -> &BTreeMap<String, String> {
        &self.exec_algorithm_params
    }

    /// Exec-spawn family ID (the primary's client order ID).
    #[must_use]
    pub const fn exec_spawn_id(&self) -> Option<&ClientOrderId> {
        self.exec_spawn_id.as_ref()
    }

    /// Free-form tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Cumulative filled quantity.
    #[must_use]
    pub const fn filled_qty(&self) -> Quantity {
        self.filled_qty
    }

    /// Unfilled remainder.
    #[must_use]
    pub const fn leaves_qty(&self) -> Quantity {
        self.leaves_qty
    }

    /// Quantity filled beyond the order quantity, if any.
    #[must_use]
    pub const fn overfill_qty(&self) -> Option<Quantity> {
        self.overfill_qty
    }

    /// Quantity-weighted average fill price.
    #[must_use]
    pub const fn avg_px(&self) -> Option<Decimal> {
        self.avg_px
    }

    /// Commission charged so far, per currency.
    #[must_use]
    pub const fn commissions(&self) -> &BTreeMap<Currency, Money> {
        &self.commissions
    }

    /// Trade IDs applied so far.
    #[must_use]
    pub fn trade_ids(&self) -> &[TradeId] {
        &self.trade_ids
    }

    /// Event ID of the `OrderInitialized` event.
    #[must_use]
    pub const fn init_id(&self) -> UUID4 {
        self.init_id
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn ts_init(&self) -> Timestamp {
        self.ts_init
    }

    /// When the order was submitted.
    #[must_use]
    pub const fn ts_submitted(&self) -> Option<Timestamp> {
        self.ts_submitted
    }

    /// When the order was accepted (or first filled).
    #[must_use]
    pub const fn ts_accepted(&self) -> Option<Timestamp> {
        self.ts_accepted
    }

    /// When the order closed.
    #[must_use]
    pub const fn ts_closed(&self) -> Option<Timestamp> {
        self.ts_closed
    }

    /// Timestamp of the last applied event.
    #[must_use]
    pub const fn ts_last(&self) -> Timestamp {
        self.ts_last
    }

    /// All applied events in order.
    #[must_use]
    pub fn events(&self) -> &[OrderEventAny] {
        &self.events
    }

    /// Number of applied events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// The `OrderInitialized` event.
    #[must_use]
    pub fn init_event(&self) -> Option<&OrderInitialized> {
        match self.events.first() {
            Some(OrderEventAny::Initialized(init)) => Some(init),
            _ => None,
        }
    }

    /// The most recently applied event.
    #[must_use]
    pub fn last_event(&self) -> Option<&OrderEventAny> {
        self.events.last()
    }

    // ========================================================================
    // Status Queries
    // ========================================================================

    /// Working locally or at the venue.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// In a terminal status.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.status.is_closed()
    }

    /// Awaiting a venue acknowledgement.
    #[must_use]
    pub const fn is_inflight(&self) -> bool {
        self.status.is_inflight()
    }

    /// Held locally by the engine (`EMULATED`).
    #[must_use]
    pub fn is_emulated(&self) -> bool {
        self.status == OrderStatus::Emulated
    }

    /// Not yet known to any venue (`INITIALIZED`, `EMULATED` or `RELEASED`).
    #[must_use]
    pub const fn is_active_local(&self) -> bool {
        matches!(self.status, OrderStatus::Initialized) || self.status.is_active_local()
    }

    /// An amend request is in flight.
    #[must_use]
    pub fn is_pending_update(&self) -> bool {
        self.status == OrderStatus::PendingUpdate
    }

    /// A cancel request is in flight.
    #[must_use]
    pub fn is_pending_cancel(&self) -> bool {
        self.status == OrderStatus::PendingCancel
    }

    /// The primary order of an exec-spawn family.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.exec_algorithm_id.is_some()
            && self.exec_spawn_id.as_ref() == Some(&self.client_order_id)
    }

    /// A child spawned from a primary by an execution algorithm.
    #[must_use]
    pub fn is_spawned(&self) -> bool {
        self.exec_algorithm_id.is_some()
            && self
                .exec_spawn_id
                .as_ref()
                .is_some_and(|spawn| spawn != &self.client_order_id)
    }

    /// Contingency type is set.
    #[must_use]
    pub fn has_contingency(&self) -> bool {
        self.contingency_type != ContingencyType::NoContingency
    }

    /// Quantity signed by side (positive for buys).
    #[must_use]
    pub fn signed_decimal_qty(&self) -> Decimal {
        self.quantity.as_decimal() * self.side.sign()
    }

    /// Returns true if filling the remaining quantity cannot increase a position.
    #[must_use]
    pub fn would_reduce_only(&self, position_side: PositionSide, position_qty: Quantity) -> bool {
        match (self.side, position_side) {
            (_, PositionSide::Flat)
            | (OrderSide::Buy, PositionSide::Long)
            | (OrderSide::Sell, PositionSide::Short) => false,
            (OrderSide::Buy, PositionSide::Short) | (OrderSide::Sell, PositionSide::Long) => {
                self.leaves_qty <= position_qty
            }
        }
    }

    /// Header for a new event about this order.
    #[must_use]
    pub fn event_header(&self, ts_event: Timestamp) -> OrderEventHeader {
        let mut header = OrderEventHeader::new(
            self.trader_id.clone(),
            self.strategy_id.clone(),
            self.instrument_id.clone(),
            self.client_order_id.clone(),
            ts_event,
        );
        header.venue_order_id.clone_from(&self.venue_order_id);
        header.account_id.clone_from(&self.account_id);
        header
    }

    // ========================================================================
    // Event Application
    // ========================================================================

    /// Returns true if the event (or its trade) has already been applied.
    #[must_use]
    pub fn is_duplicate(&self, event: &OrderEventAny) -> bool {
        let event_id = event.event_id();
        if self.events.iter().any(|e| e.event_id() == event_id) {
            return true;
        }
        event
            .as_fill()
            .is_some_and(|fill| self.trade_ids.contains(&fill.trade_id))
    }

    /// Apply an event, advancing the order's status.
    ///
    /// On error the order is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns error if the event belongs to another order, was already
    /// applied, or is not valid for the current status.
    pub fn apply(&mut self, event: OrderEventAny) -> Result<(), OrderError> {
        if event.client_order_id() != &self.client_order_id {
            return Err(OrderError::MismatchedEvent {
                expected: self.client_order_id.to_string(),
                received: event.client_order_id().to_string(),
            });
        }
        if self.is_duplicate(&event) {
            let key = event.as_fill().map_or_else(
                || event.event_id().to_string(),
                |fill| fill.trade_id.to_string(),
            );
            return Err(OrderError::DuplicateEvent {
                order_id: self.client_order_id.to_string(),
                key,
            });
        }
        if matches!(event, OrderEventAny::Initialized(_)) {
            return Err(OrderError::AlreadyInitialized {
                order_id: self.client_order_id.to_string(),
            });
        }

        let next = OrderStateMachine::transition(self.status, &event)?;
        let header = event.header();
        if let Some(account_id) = &header.account_id {
            self.account_id = Some(account_id.clone());
        }
        let ts_event = header.ts_event;

        match &event {
            OrderEventAny::Initialized(_) => {}
            OrderEventAny::Denied(_)
            | OrderEventAny::Rejected(_)
            | OrderEventAny::Canceled(_)
            | OrderEventAny::Expired(_) => {
                self.status = next;
                self.ts_closed = Some(ts_event);
            }
            OrderEventAny::Emulated(_)
            | OrderEventAny::Released(_)
            | OrderEventAny::Triggered(_) => self.status = next,
            OrderEventAny::Submitted(_) => {
                self.status = next;
                self.ts_submitted = Some(ts_event);
            }
            OrderEventAny::Accepted(e) => {
                self.status = next;
                if let Some(venue_order_id) = &e.header.venue_order_id {
                    self.venue_order_id = Some(venue_order_id.clone());
                }
                self.ts_accepted = Some(ts_event);
            }
            OrderEventAny::PendingUpdate(_) | OrderEventAny::PendingCancel(_) => {
                if !matches!(
                    self.status,
                    OrderStatus::PendingUpdate | OrderStatus::PendingCancel
                ) {
                    self.status_before_pending = Some(self.status);
                }
                self.status = next;
            }
            OrderEventAny::ModifyRejected(_) => {
                if self.status == OrderStatus::PendingUpdate {
                    self.restore_pre_pending_status();
                }
            }
            OrderEventAny::CancelRejected(_) => {
                if self.status == OrderStatus::PendingCancel {
                    self.restore_pre_pending_status();
                }
            }
            OrderEventAny::Updated(e) => self.updated(e),
            OrderEventAny::Filled(e) => self.filled(e),
        }

        self.ts_last = ts_event;
        self.events.push(event);
        Ok(())
    }

    // ========================================================================
    // Private Helpers
    // ========================================================================

    fn restore_pre_pending_status(&mut self) {
        self.status = self
            .status_before_pending
            .take()
            .unwrap_or(OrderStatus::Accepted);
    }

    fn updated(&mut self, event: &OrderUpdated) {
        if let Some(venue_order_id) = &event.header.venue_order_id {
            self.venue_order_id = Some(venue_order_id.clone());
        }
        if self.status == OrderStatus::PendingUpdate {
            self.restore_pre_pending_status();
        }

        self.quantity = event.quantity;
        self.leaves_qty = self.quantity.saturating_sub(self.filled_qty);
        if let Some(price) = event.price {
            self.price = Some(price);
        }
        if let Some(trigger_price) = event.trigger_price {
            self.trigger_price = Some(trigger_price);
        }

        if self.filled_qty.is_positive() && self.filled_qty >= self.quantity {
            self.status = OrderStatus::Filled;
            self.ts_closed = Some(event.header.ts_event);
        }
    }

    fn filled(&mut self, fill: &OrderFilled) {
        let filled_qty = self.filled_qty + fill.last_qty;
        if filled_qty > self.quantity {
            self.overfill_qty = Some(filled_qty.saturating_sub(self.quantity));
        }

        if filled_qty < self.quantity {
            self.status = OrderStatus::PartiallyFilled;
            self.ts_closed = None;
        } else {
            self.status = OrderStatus::Filled;
            self.ts_closed = Some(fill.header.ts_event);
        }
        self.status_before_pending = None;

        if let Some(venue_order_id) = &fill.header.venue_order_id {
            self.venue_order_id = Some(venue_order_id.clone());
        }
        if let Some(position_id) = &fill.position_id {
            self.position_id = Some(position_id.clone());
        }
        self.trade_ids.push(fill.trade_id.clone());
        self.last_trade_id = Some(fill.trade_id.clone());
        self.liquidity_side = fill.liquidity_side;
        if let Some(commission) = &fill.commission {
            let total = self
                .commissions
                .entry(commission.currency().clone())
                .or_insert_with(|| Money::zero(commission.currency().clone()));
            if let Ok(sum) = total.checked_add(commission) {
                *total = sum;
            }
        }
        if self.ts_accepted.is_none() {
            self.ts_accepted = Some(fill.header.ts_event);
        }

        self.avg_px = Some(self.next_avg_px(fill.last_qty, fill.last_px));
        self.filled_qty = filled_qty;
        self.leaves_qty = self.quantity.saturating_sub(filled_qty);
    }

    fn next_avg_px(&self, last_qty: Quantity, last_px: Price) -> Decimal {
        let prior_qty = self.filled_qty.as_decimal();
        let total_qty = prior_qty + last_qty.as_decimal();
        match self.avg_px {
            Some(avg_px) if !total_qty.is_zero() => {
                (avg_px * prior_qty + last_px.as_decimal() * last_qty.as_decimal()) / total_qty
            }
            _ => last_px.as_decimal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::services::{OrderEventBuilder, OrderFactory};
    use chrono::Utc;

    fn make_factory() -> OrderFactory {
        OrderFactory::new(TraderId::new("TESTER-000"), StrategyId::new("S-001"))
    }

    fn make_order(qty: u64) -> Order {
        make_factory().limit(
            InstrumentId::new("AUD/USD.SIM"),
            OrderSide::Buy,
            Quantity::from_u64(qty),
            "1.00000".parse().unwrap(),
        )
    }

    fn events(order: &Order) -> OrderEventBuilder<'_> {
        OrderEventBuilder::new(order, Utc::now())
    }

    fn make_accepted(qty: u64) -> Order {
        let mut order = make_order(qty);
        let submitted = events(&order).submitted(AccountId::new("SIM-001"));
        order.apply(submitted).unwrap();
        let accepted = events(&order).accepted(VenueOrderId::new("V-1"));
        order.apply(accepted).unwrap();
        order
    }

    fn fill(order: &Order, trade_id: &str, qty: u64, px: &str) -> OrderEventAny {
        events(order)
            .filled(
                TradeId::new(trade_id),
                Quantity::from_u64(qty),
                px.parse().unwrap(),
                Currency::new("USD"),
            )
            .into()
    }

    #[test]
    fn new_order_is_initialized() {
        let order = make_order(100);
        assert_eq!(order.status(), OrderStatus::Initialized);
        assert_eq!(order.leaves_qty(), Quantity::from_u64(100));
        assert!(order.filled_qty().is_zero());
        assert_eq!(order.init_id(), order.events()[0].event_id());
        assert!(order.is_active_local());
        assert!(!order.is_open());
    }

    #[test]
    fn submit_and_accept_record_venue_identity() {
        let order = make_accepted(100);
        assert_eq!(order.status(), OrderStatus::Accepted);
        assert_eq!(order.venue_order_id().unwrap().as_str(), "V-1");
        assert_eq!(order.account_id().unwrap().as_str(), "SIM-001");
        assert!(order.ts_submitted().is_some());
        assert!(order.is_open());
    }

    #[test]
    fn partial_then_full_fill() {
        let mut order = make_accepted(100);
        let first = fill(&order, "T-1", 40, "1.00000");
        order.apply(first).unwrap();
        assert_eq!(order.status(), OrderStatus::PartiallyFilled);
        assert_eq!(order.leaves_qty(), Quantity::from_u64(60));

        let second = fill(&order, "T-2", 60, "1.00010");
        order.apply(second).unwrap();
        assert_eq!(order.status(), OrderStatus::Filled);
        assert!(order.leaves_qty().is_zero());
        assert_eq!(
            order.avg_px().unwrap(),
            "1.00006".parse::<Decimal>().unwrap()
        );
        assert!(order.ts_closed().is_some());
    }

    #[test]
    fn replayed_fill_is_a_duplicate() {
        let mut order = make_accepted(100);
        let event = fill(&order, "T-1", 40, "1.00000");
        order.apply(event.clone()).unwrap();

        let err = order.apply(event).unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(order.filled_qty(), Quantity::from_u64(40));
    }

    #[test]
    fn fill_with_known_trade_id_is_a_duplicate() {
        let mut order = make_accepted(100);
        let first = fill(&order, "T-1", 40, "1.00000");
        order.apply(first).unwrap();
        let again = fill(&order, "T-1", 40, "1.00000");
        assert!(order.is_duplicate(&again));
        assert!(order.apply(again).is_err());
    }

    #[test]
    fn fill_on_initialized_order_is_rejected_and_leaves_order_unchanged() {
        let mut order = make_order(100);
        let event = fill(&order, "T-1", 10, "1.00000");
        let before = order.clone();
        assert!(matches!(
            order.apply(event),
            Err(OrderError::InvalidStateTransition { .. })
        ));
        assert_eq!(order, before);
    }

    #[test]
    fn late_fill_reopens_canceled_order() {
        let mut order = make_accepted(100);
        let canceled = events(&order).canceled();
        order.apply(canceled).unwrap();
        assert!(order.is_closed());

        let late = fill(&order, "T-1", 30, "1.00000");
        order.apply(late).unwrap();
        assert_eq!(order.status(), OrderStatus::PartiallyFilled);
        assert!(order.is_open());
        assert!(order.ts_closed().is_none());
    }

    #[test]
    fn overfill_is_flagged() {
        let mut order = make_accepted(100);
        let event = fill(&order, "T-1", 120, "1.00000");
        order.apply(event).unwrap();
        assert_eq!(order.status(), OrderStatus::Filled);
        assert_eq!(order.overfill_qty(), Some(Quantity::from_u64(20)));
        assert!(order.leaves_qty().is_zero());
    }

    #[test]
    fn modify_rejected_restores_previous_status() {
        let mut order = make_accepted(100);
        let partial = fill(&order, "T-1", 10, "1.00000");
        order.apply(partial).unwrap();
        let pending = events(&order).pending_update();
        order.apply(pending).unwrap();
        let pending_again = events(&order).pending_update();
        order.apply(pending_again).unwrap();
        assert_eq!(order.status(), OrderStatus::PendingUpdate);

        let rejected = events(&order).modify_rejected("venue says no");
        order.apply(rejected).unwrap();
        assert_eq!(order.status(), OrderStatus::PartiallyFilled);
    }

    #[test]
    fn cancel_rejected_restores_previous_status() {
        let mut order = make_accepted(100);
        let pending = events(&order).pending_cancel();
        order.apply(pending).unwrap();
        let rejected = events(&order).cancel_rejected("too late");
        order.apply(rejected).unwrap();
        assert_eq!(order.status(), OrderStatus::Accepted);
    }

    #[test]
    fn updated_changes_quantity_and_leaves() {
        let mut order = make_accepted(100);
        let partial = fill(&order, "T-1", 30, "1.00000");
        order.apply(partial).unwrap();
        let pending = events(&order).pending_update();
        order.apply(pending).unwrap();

        let updated = events(&order).updated(Quantity::from_u64(50), None, None);
        order.apply(updated).unwrap();
        assert_eq!(order.status(), OrderStatus::PartiallyFilled);
        assert_eq!(order.quantity(), Quantity::from_u64(50));
        assert_eq!(order.leaves_qty(), Quantity::from_u64(20));
        assert_eq!(order.price(), Some("1.00000".parse().unwrap()));
    }

    #[test]
    fn updated_down_to_filled_quantity_fills_order() {
        let mut order = make_accepted(100);
        let partial = fill(&order, "T-1", 30, "1.00000");
        order.apply(partial).unwrap();
        let updated = events(&order).updated(Quantity::from_u64(30), None, None);
        order.apply(updated).unwrap();
        assert_eq!(order.status(), OrderStatus::Filled);
    }

    #[test]
    fn event_for_other_order_is_rejected() {
        let mut order = make_order(100);
        let other = make_order(100);
        let denied = events(&other).denied("x");
        assert!(matches!(
            order.apply(denied),
            Err(OrderError::MismatchedEvent { .. })
        ));
    }

    #[test]
    fn would_reduce_only() {
        let order = make_order(100);
        assert!(!order.would_reduce_only(PositionSide::Flat, Quantity::ZERO));
        assert!(!order.would_reduce_only(PositionSide::Long, Quantity::from_u64(100)));
        assert!(order.would_reduce_only(PositionSide::Short, Quantity::from_u64(100)));
        assert!(!order.would_reduce_only(PositionSide::Short, Quantity::from_u64(50)));
    }

    #[test]
    fn commissions_accumulate_per_currency() {
        let mut order = make_accepted(100);
        for (trade, qty) in [("T-1", 50), ("T-2", 50)] {
            let mut event = events(&order).filled(
                TradeId::new(trade),
                Quantity::from_u64(qty),
                "1.0".parse().unwrap(),
                Currency::new("USD"),
            );
            event.commission = Some(Money::new(Decimal::ONE, Currency::new("USD")));
            order.apply(event.into()).unwrap();
        }
        assert_eq!(
            order.commissions()[&Currency::new("USD")].amount(),
            Decimal::TWO
        );
    }
}
