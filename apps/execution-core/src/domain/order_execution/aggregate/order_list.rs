//! Order lists submitted as one unit (brackets, OTO/OCO groups).

use serde::{Deserialize, Serialize};

use super::Order;
use crate::domain::order_execution::errors::OrderError;
use crate::domain::shared::{ClientOrderId, InstrumentId, OrderListId, StrategyId, Timestamp};

/// A group of orders for one instrument and strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderList {
    id: OrderListId,
    instrument_id: InstrumentId,
    strategy_id: StrategyId,
    orders: Vec<Order>,
    ts_init: Timestamp,
}

impl OrderList {
    /// Create an order list.
    ///
    /// # Errors
    ///
    /// Returns error if the list is empty or mixes instruments or strategies.
    pub fn new(id: OrderListId, orders: Vec<Order>, ts_init: Timestamp) -> Result<Self, OrderError> {
        let Some(first) = orders.first() else {
            return Err(OrderError::InvalidParameters {
                field: "orders".to_string(),
                message: format!("order list {id} is empty"),
            });
        };
        let instrument_id = first.instrument_id().clone();
        let strategy_id = first.strategy_id().clone();
        if let Some(other) = orders
            .iter()
            .find(|o| o.instrument_id() != &instrument_id || o.strategy_id() != &strategy_id)
        {
            return Err(OrderError::InvalidParameters {
                field: "orders".to_string(),
                message: format!(
                    "order {} does not match list instrument {instrument_id} and strategy {strategy_id}",
                    other.client_order_id()
                ),
            });
        }
        Ok(Self {
            id,
            instrument_id,
            strategy_id,
            orders,
            ts_init,
        })
    }

    /// List ID.
    #[must_use]
    pub const fn id(&self) -> &OrderListId {
        &self.id
    }

    /// Instrument shared by all orders.
    #[must_use]
    pub const fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    /// Strategy shared by all orders.
    #[must_use]
    pub const fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    /// Orders in submission order.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Mutable access for engines annotating orders before caching.
    pub fn orders_mut(&mut self) -> &mut [Order] {
        &mut self.orders
    }

    /// First order of the list (the entry of a bracket).
    #[must_use]
    pub fn first(&self) -> Option<&Order> {
        self.orders.first()
    }

    /// Client order IDs in submission order.
    #[must_use]
    pub fn client_order_ids(&self) -> Vec<ClientOrderId> {
        self.orders
            .iter()
            .map(|o| o.client_order_id().clone())
            .collect()
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn ts_init(&self) -> Timestamp {
        self.ts_init
    }
}
