//! Order Factory
//!
//! Creates `INITIALIZED` orders and order lists for one trader and strategy.
//! Client order IDs follow `O-YYYYMMDD-HHMMSS-<trader tag>-<strategy tag>-<count>`.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::domain::order_execution::aggregate::{Order, OrderList};
use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::events::{OrderEventHeader, OrderInitialized};
use crate::domain::order_execution::value_objects::{
    ContingencyType, OrderSide, OrderType, TimeInForce,
};
use crate::domain::shared::{
    ClientOrderId, InstrumentId, OrderListId, Price, Quantity, StrategyId, Timestamp, TraderId,
};

/// Factory for orders owned by one strategy.
#[derive(Debug, Clone)]
pub struct OrderFactory {
    trader_id: TraderId,
    strategy_id: StrategyId,
    order_count: usize,
    list_count: usize,
    fixed_time: Option<Timestamp>,
}

impl OrderFactory {
    /// Create a factory stamping orders with the current time.
    #[must_use]
    pub const fn new(trader_id: TraderId, strategy_id: StrategyId) -> Self {
        Self {
            trader_id,
            strategy_id,
            order_count: 0,
            list_count: 0,
            fixed_time: None,
        }
    }

    /// Stamp every order with `ts` instead of the wall clock.
    #[must_use]
    pub const fn with_fixed_time(mut self, ts: Timestamp) -> Self {
        self.fixed_time = Some(ts);
        self
    }

    /// Strategy the factory creates orders for.
    #[must_use]
    pub const fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    /// Number of client order IDs generated so far.
    #[must_use]
    pub const fn order_count(&self) -> usize {
        self.order_count
    }

    /// Reset the ID counters.
    pub fn reset(&mut self) {
        self.order_count = 0;
        self.list_count = 0;
    }

    fn now(&self) -> Timestamp {
        self.fixed_time.unwrap_or_else(Utc::now)
    }

    fn id_stem(&self, prefix: &str, ts: Timestamp, count: usize) -> String {
        format!(
            "{prefix}-{}-{}-{}-{count}",
            ts.format("%Y%m%d-%H%M%S"),
            self.trader_id.tag(),
            self.strategy_id.tag()
        )
    }

    /// Generate the next client order ID.
    pub fn generate_client_order_id(&mut self) -> ClientOrderId {
        self.order_count += 1;
        ClientOrderId::new(self.id_stem("O", self.now(), self.order_count))
    }

    /// Generate the next order list ID.
    pub fn generate_order_list_id(&mut self) -> OrderListId {
        self.list_count += 1;
        OrderListId::new(self.id_stem("OL", self.now(), self.list_count))
    }

    /// Initialization event for a new GTC order with no prices or contingency.
    ///
    /// Callers adjust the public fields before passing it to [`Order::new`].
    pub fn initialized(
        &mut self,
        instrument_id: InstrumentId,
        side: OrderSide,
        order_type: OrderType,
        quantity: Quantity,
    ) -> OrderInitialized {
        let client_order_id = self.generate_client_order_id();
        OrderInitialized {
            header: OrderEventHeader::new(
                self.trader_id.clone(),
                self.strategy_id.clone(),
                instrument_id,
                client_order_id,
                self.now(),
            ),
            side,
            order_type,
            quantity,
            price: None,
            trigger_price: None,
            time_in_force: TimeInForce::Gtc,
            expire_time: None,
            post_only: false,
            reduce_only: false,
            contingency_type: ContingencyType::NoContingency,
            order_list_id: None,
            linked_order_ids: Vec::new(),
            parent_order_id: None,
            exec_algorithm_id: None,
            exec_algorithm_params: BTreeMap::new(),
            exec_spawn_id: None,
            tags: Vec::new(),
        }
    }

    /// Market order.
    pub fn market(
        &mut self,
        instrument_id: InstrumentId,
        side: OrderSide,
        quantity: Quantity,
    ) -> Order {
        Order::new(self.initialized(instrument_id, side, OrderType::Market, quantity))
    }

    /// Limit order.
    pub fn limit(
        &mut self,
        instrument_id: InstrumentId,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
    ) -> Order {
        let mut init = self.initialized(instrument_id, side, OrderType::Limit, quantity);
        init.price = Some(price);
        Order::new(init)
    }

    /// Stop-market order.
    pub fn stop_market(
        &mut self,
        instrument_id: InstrumentId,
        side: OrderSide,
        quantity: Quantity,
        trigger_price: Price,
    ) -> Order {
        let mut init = self.initialized(instrument_id, side, OrderType::StopMarket, quantity);
        init.trigger_price = Some(trigger_price);
        Order::new(init)
    }

    /// Stop-limit order.
    pub fn stop_limit(
        &mut self,
        instrument_id: InstrumentId,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
        trigger_price: Price,
    ) -> Order {
        let mut init = self.initialized(instrument_id, side, OrderType::StopLimit, quantity);
        init.price = Some(price);
        init.trigger_price = Some(trigger_price);
        Order::new(init)
    }

    /// Bracket: a market entry (OTO parent) with a stop-loss and a take-profit
    /// child linked to each other by `tp_sl_contingency` (OCO or OUO).
    ///
    /// # Errors
    ///
    /// Returns error if `tp_sl_contingency` is not OCO or OUO.
    pub fn bracket(
        &mut self,
        instrument_id: InstrumentId,
        side: OrderSide,
        quantity: Quantity,
        sl_trigger_price: Price,
        tp_price: Price,
        tp_sl_contingency: ContingencyType,
    ) -> Result<OrderList, OrderError> {
        if !matches!(tp_sl_contingency, ContingencyType::Oco | ContingencyType::Ouo) {
            return Err(OrderError::InvalidParameters {
                field: "contingency_type".to_string(),
                message: format!("bracket children must be OCO or OUO, was {tp_sl_contingency}"),
            });
        }

        let list_id = self.generate_order_list_id();
        let mut entry = self.initialized(instrument_id.clone(), side, OrderType::Market, quantity);
        let mut sl = self.initialized(
            instrument_id.clone(),
            side.opposite(),
            OrderType::StopMarket,
            quantity,
        );
        let mut tp = self.initialized(instrument_id, side.opposite(), OrderType::Limit, quantity);

        let entry_id = entry.header.client_order_id.clone();
        let sl_id = sl.header.client_order_id.clone();
        let tp_id = tp.header.client_order_id.clone();

        entry.contingency_type = ContingencyType::Oto;
        entry.linked_order_ids = vec![sl_id.clone(), tp_id.clone()];
        entry.order_list_id = Some(list_id.clone());

        sl.trigger_price = Some(sl_trigger_price);
        sl.reduce_only = true;
        sl.contingency_type = tp_sl_contingency;
        sl.linked_order_ids = vec![tp_id];
        sl.parent_order_id = Some(entry_id.clone());
        sl.order_list_id = Some(list_id.clone());

        tp.price = Some(tp_price);
        tp.reduce_only = true;
        tp.contingency_type = tp_sl_contingency;
        tp.linked_order_ids = vec![sl_id];
        tp.parent_order_id = Some(entry_id);
        tp.order_list_id = Some(list_id.clone());

        OrderList::new(
            list_id,
            vec![Order::new(entry), Order::new(sl), Order::new(tp)],
            self.now(),
        )
    }

    /// Wrap existing orders in a new order list.
    ///
    /// # Errors
    ///
    /// Returns error if the orders do not form a valid list.
    pub fn create_list(&mut self, orders: Vec<Order>) -> Result<OrderList, OrderError> {
        let list_id = self.generate_order_list_id();
        OrderList::new(list_id, orders, self.now())
    }
}
