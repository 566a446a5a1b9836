//! Trading commands.
//!
//! Commands flow from strategies through the risk engine to the execution
//! engine, which forwards them to venue clients. All commands carry a unique
//! `command_id` and serialize to a tagged JSON record for audit logging.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::aggregate::{Order, OrderList};
use super::value_objects::OrderSide;
use crate::domain::shared::{
    ClientId, ClientOrderId, InstrumentId, PositionId, Price, Quantity, StrategyId, Timestamp,
    TraderId, VenueOrderId, UUID4,
};

/// All trading commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradingCommand {
    /// Submit a single order.
    SubmitOrder(SubmitOrder),
    /// Submit a list of orders together.
    SubmitOrderList(SubmitOrderList),
    /// Amend an order.
    ModifyOrder(ModifyOrder),
    /// Cancel an order.
    CancelOrder(CancelOrder),
    /// Cancel every open order of an instrument.
    CancelAllOrders(CancelAllOrders),
    /// Cancel several orders in one request.
    BatchCancelOrders(BatchCancelOrders),
    /// Ask the venue for an order's current state.
    QueryOrder(QueryOrder),
}

impl TradingCommand {
    /// Unique command identifier.
    #[must_use]
    pub const fn command_id(&self) -> UUID4 {
        match self {
            Self::SubmitOrder(c) => c.command_id,
            Self::SubmitOrderList(c) => c.command_id,
            Self::ModifyOrder(c) => c.command_id,
            Self::CancelOrder(c) => c.command_id,
            Self::CancelAllOrders(c) => c.command_id,
            Self::BatchCancelOrders(c) => c.command_id,
            Self::QueryOrder(c) => c.command_id,
        }
    }

    /// Issuing strategy.
    #[must_use]
    pub const fn strategy_id(&self) -> &StrategyId {
        match self {
            Self::SubmitOrder(c) => &c.strategy_id,
            Self::SubmitOrderList(c) => &c.strategy_id,
            Self::ModifyOrder(c) => &c.strategy_id,
            Self::CancelOrder(c) => &c.strategy_id,
            Self::CancelAllOrders(c) => &c.strategy_id,
            Self::BatchCancelOrders(c) => &c.strategy_id,
            Self::QueryOrder(c) => &c.strategy_id,
        }
    }

    /// Instrument the command targets.
    #[must_use]
    pub const fn instrument_id(&self) -> &InstrumentId {
        match self {
            Self::SubmitOrder(c) => &c.instrument_id,
            Self::SubmitOrderList(c) => &c.instrument_id,
            Self::ModifyOrder(c) => &c.instrument_id,
            Self::CancelOrder(c) => &c.instrument_id,
            Self::CancelAllOrders(c) => &c.instrument_id,
            Self::BatchCancelOrders(c) => &c.instrument_id,
            Self::QueryOrder(c) => &c.instrument_id,
        }
    }

    /// Explicitly addressed venue client, if any.
    #[must_use]
    pub const fn client_id(&self) -> Option<&ClientId> {
        match self {
            Self::SubmitOrder(c) => c.client_id.as_ref(),
            Self::SubmitOrderList(c) => c.client_id.as_ref(),
            Self::ModifyOrder(c) => c.client_id.as_ref(),
            Self::CancelOrder(c) => c.client_id.as_ref(),
            Self::CancelAllOrders(c) => c.client_id.as_ref(),
            Self::BatchCancelOrders(c) => c.client_id.as_ref(),
            Self::QueryOrder(c) => c.client_id.as_ref(),
        }
    }

    /// Get the command type name.
    #[must_use]
    pub const fn command_type(&self) -> &'static str {
        match self {
            Self::SubmitOrder(_) => "SUBMIT_ORDER",
            Self::SubmitOrderList(_) => "SUBMIT_ORDER_LIST",
            Self::ModifyOrder(_) => "MODIFY_ORDER",
            Self::CancelOrder(_) => "CANCEL_ORDER",
            Self::CancelAllOrders(_) => "CANCEL_ALL_ORDERS",
            Self::BatchCancelOrders(_) => "BATCH_CANCEL_ORDERS",
            Self::QueryOrder(_) => "QUERY_ORDER",
        }
    }
}

/// Command: submit a single order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrder {
    /// Trader instance.
    pub trader_id: TraderId,
    /// Explicit venue client.
    pub client_id: Option<ClientId>,
    /// Issuing strategy.
    pub strategy_id: StrategyId,
    /// Instrument of the order.
    pub instrument_id: InstrumentId,
    /// Order to submit.
    pub order: Order,
    /// Position the order is meant to act on.
    pub position_id: Option<PositionId>,
    /// Unique command identifier.
    pub command_id: UUID4,
    /// Creation timestamp.
    pub ts_init: Timestamp,
}

impl SubmitOrder {
    /// Submit `order`, deriving the identity fields from it.
    #[must_use]
    pub fn new(order: Order, position_id: Option<PositionId>) -> Self {
        Self {
            trader_id: order.trader_id().clone(),
            client_id: None,
            strategy_id: order.strategy_id().clone(),
            instrument_id: order.instrument_id().clone(),
            order,
            position_id,
            command_id: UUID4::new_v4(),
            ts_init: Utc::now(),
        }
    }

    /// Address a specific venue client.
    #[must_use]
    pub fn with_client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }
}

/// Command: submit an order list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrderList {
    /// Trader instance.
    pub trader_id: TraderId,
    /// Explicit venue client.
    pub client_id: Option<ClientId>,
    /// Issuing strategy.
    pub strategy_id: StrategyId,
    /// Instrument of the list.
    pub instrument_id: InstrumentId,
    /// Orders to submit.
    pub order_list: OrderList,
    /// Position the orders are meant to act on.
    pub position_id: Option<PositionId>,
    /// Unique command identifier.
    pub command_id: UUID4,
    /// Creation timestamp.
    pub ts_init: Timestamp,
}

impl SubmitOrderList {
    /// Submit `order_list`, deriving the identity fields from its first order.
    #[must_use]
    pub fn new(trader_id: TraderId, order_list: OrderList, position_id: Option<PositionId>) -> Self {
        Self {
            trader_id,
            client_id: None,
            strategy_id: order_list.strategy_id().clone(),
            instrument_id: order_list.instrument_id().clone(),
            order_list,
            position_id,
            command_id: UUID4::new_v4(),
            ts_init: Utc::now(),
        }
    }
}

/// Command: amend an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyOrder {
    /// Trader instance.
    pub trader_id: TraderId,
    /// Explicit venue client.
    pub client_id: Option<ClientId>,
    /// Issuing strategy.
    pub strategy_id: StrategyId,
    /// Instrument of the order.
    pub instrument_id: InstrumentId,
    /// Order to amend.
    pub client_order_id: ClientOrderId,
    /// Venue order ID, if known.
    pub venue_order_id: Option<VenueOrderId>,
    /// New quantity.
    pub quantity: Option<Quantity>,
    /// New limit price.
    pub price: Option<Price>,
    /// New trigger price.
    pub trigger_price: Option<Price>,
    /// Unique command identifier.
    pub command_id: UUID4,
    /// Creation timestamp.
    pub ts_init: Timestamp,
}

impl ModifyOrder {
    /// Amend `order` with the given values; `None` keeps the current value.
    #[must_use]
    pub fn new(
        order: &Order,
        quantity: Option<Quantity>,
        price: Option<Price>,
        trigger_price: Option<Price>,
    ) -> Self {
        Self {
            trader_id: order.trader_id().clone(),
            client_id: None,
            strategy_id: order.strategy_id().clone(),
            instrument_id: order.instrument_id().clone(),
            client_order_id: order.client_order_id().clone(),
            venue_order_id: order.venue_order_id().cloned(),
            quantity,
            price,
            trigger_price,
            command_id: UUID4::new_v4(),
            ts_init: Utc::now(),
        }
    }
}

/// Command: cancel an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    /// Trader instance.
    pub trader_id: TraderId,
    /// Explicit venue client.
    pub client_id: Option<ClientId>,
    /// Issuing strategy.
    pub strategy_id: StrategyId,
    /// Instrument of the order.
    pub instrument_id: InstrumentId,
    /// Order to cancel.
    pub client_order_id: ClientOrderId,
    /// Venue order ID, if known.
    pub venue_order_id: Option<VenueOrderId>,
    /// Unique command identifier.
    pub command_id: UUID4,
    /// Creation timestamp.
    pub ts_init: Timestamp,
}

impl CancelOrder {
    /// Cancel `order`.
    #[must_use]
    pub fn new(order: &Order) -> Self {
        Self {
            trader_id: order.trader_id().clone(),
            client_id: None,
            strategy_id: order.strategy_id().clone(),
            instrument_id: order.instrument_id().clone(),
            client_order_id: order.client_order_id().clone(),
            venue_order_id: order.venue_order_id().cloned(),
            command_id: UUID4::new_v4(),
            ts_init: Utc::now(),
        }
    }
}

/// Command: cancel all open orders of an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelAllOrders {
    /// Trader instance.
    pub trader_id: TraderId,
    /// Explicit venue client.
    pub client_id: Option<ClientId>,
    /// Issuing strategy.
    pub strategy_id: StrategyId,
    /// Instrument whose orders are canceled.
    pub instrument_id: InstrumentId,
    /// Only cancel this side; `None` cancels both.
    pub order_side: Option<OrderSide>,
    /// Unique command identifier.
    pub command_id: UUID4,
    /// Creation timestamp.
    pub ts_init: Timestamp,
}

impl CancelAllOrders {
    /// Cancel all of `strategy_id`'s open orders on `instrument_id`.
    #[must_use]
    pub fn new(
        trader_id: TraderId,
        strategy_id: StrategyId,
        instrument_id: InstrumentId,
        order_side: Option<OrderSide>,
    ) -> Self {
        Self {
            trader_id,
            client_id: None,
            strategy_id,
            instrument_id,
            order_side,
            command_id: UUID4::new_v4(),
            ts_init: Utc::now(),
        }
    }
}

/// Command: cancel several orders of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCancelOrders {
    /// Trader instance.
    pub trader_id: TraderId,
    /// Explicit venue client.
    pub client_id: Option<ClientId>,
    /// Issuing strategy.
    pub strategy_id: StrategyId,
    /// Instrument of the orders.
    pub instrument_id: InstrumentId,
    /// Individual cancels.
    pub cancels: Vec<CancelOrder>,
    /// Unique command identifier.
    pub command_id: UUID4,
    /// Creation timestamp.
    pub ts_init: Timestamp,
}

impl BatchCancelOrders {
    /// Batch the given cancels; they must share an instrument.
    #[must_use]
    pub fn new(
        trader_id: TraderId,
        strategy_id: StrategyId,
        instrument_id: InstrumentId,
        cancels: Vec<CancelOrder>,
    ) -> Self {
        Self {
            trader_id,
            client_id: None,
            strategy_id,
            instrument_id,
            cancels,
            command_id: UUID4::new_v4(),
            ts_init: Utc::now(),
        }
    }
}

/// Command: query an order's state at the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOrder {
    /// Trader instance.
    pub trader_id: TraderId,
    /// Explicit venue client.
    pub client_id: Option<ClientId>,
    /// Issuing strategy.
    pub strategy_id: StrategyId,
    /// Instrument of the order.
    pub instrument_id: InstrumentId,
    /// Order to query.
    pub client_order_id: ClientOrderId,
    /// Venue order ID, if known.
    pub venue_order_id: Option<VenueOrderId>,
    /// Unique command identifier.
    pub command_id: UUID4,
    /// Creation timestamp.
    pub ts_init: Timestamp,
}

impl QueryOrder {
    /// Query `order`.
    #[must_use]
    pub fn new(order: &Order) -> Self {
        Self {
            trader_id: order.trader_id().clone(),
            client_id: None,
            strategy_id: order.strategy_id().clone(),
            instrument_id: order.instrument_id().clone(),
            client_order_id: order.client_order_id().clone(),
            venue_order_id: order.venue_order_id().cloned(),
            command_id: UUID4::new_v4(),
            ts_init: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::services::OrderFactory;

    fn make_order() -> Order {
        OrderFactory::new(TraderId::new("TESTER-000"), StrategyId::new("S-001")).market(
            InstrumentId::new("AUD/USD.SIM"),
            OrderSide::Buy,
            Quantity::from_u64(100_000),
        )
    }

    #[test]
    fn submit_order_derives_identity_from_order() {
        let order = make_order();
        let command = TradingCommand::SubmitOrder(SubmitOrder::new(order.clone(), None));
        assert_eq!(command.strategy_id(), order.strategy_id());
        assert_eq!(command.instrument_id(), order.instrument_id());
        assert!(command.client_id().is_none());
        assert_eq!(command.command_type(), "SUBMIT_ORDER");
    }

    #[test]
    fn command_ids_are_unique() {
        let order = make_order();
        assert_ne!(
            CancelOrder::new(&order).command_id,
            CancelOrder::new(&order).command_id
        );
    }

    #[test]
    fn command_serializes_with_type_tag() {
        let order = make_order();
        let command = TradingCommand::CancelOrder(CancelOrder::new(&order));
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["type"], "CANCEL_ORDER");
        assert_eq!(json["client_order_id"], order.client_order_id().as_str());
    }
}
