//! Command routing: registers submitted orders in the cache and hands
//! commands to the venue client for the order's venue.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::ExecutionEngine;
use crate::application::cache::QueryFilter;
use crate::application::ports::{BusMessage, ExecutionClient, topics};
use crate::domain::order_execution::{
    BatchCancelOrders, CancelAllOrders, CancelOrder, ModifyOrder, Order, OrderEventBuilder,
    OrderStatus, QueryOrder, SubmitOrder, SubmitOrderList, TradingCommand,
};
use crate::domain::shared::{ClientId, ClientOrderId, Price, Quantity, UUID4, Venue};
use crate::observability::{record_command, record_denial};

/// Returns true when `order` is the still-local primary of an execution
/// algorithm being submitted again (the algorithm's final slice).
pub(crate) fn is_primary_resubmission(cached: &Order, order: &Order) -> bool {
    cached.is_primary()
        && cached.status() == OrderStatus::Initialized
        && cached.init_id() == order.init_id()
}

impl ExecutionEngine {
    pub(super) fn execute_command(&mut self, command: TradingCommand) {
        self.command_count += 1;
        record_command("exec_engine", command.command_type());
        if self.config.debug {
            debug!(?command, "Executing command");
        }

        match command {
            TradingCommand::SubmitOrder(c) => self.handle_submit_order(c),
            TradingCommand::SubmitOrderList(c) => self.handle_submit_order_list(c),
            TradingCommand::ModifyOrder(c) => self.handle_modify_order(&c),
            TradingCommand::CancelOrder(c) => self.handle_cancel_order(&c),
            TradingCommand::CancelAllOrders(c) => self.handle_cancel_all_orders(&c),
            TradingCommand::BatchCancelOrders(c) => self.handle_batch_cancel_orders(&c),
            TradingCommand::QueryOrder(c) => self.handle_query_order(&c),
        }
    }

    // ========================================================================
    // Client Selection
    // ========================================================================

    /// Explicit client, then the venue route, then the default client.
    fn client_for(
        &self,
        client_id: Option<&ClientId>,
        venue: &Venue,
    ) -> Option<Arc<dyn ExecutionClient>> {
        if let Some(client) = client_id.and_then(|id| self.clients.get(id)) {
            return Some(Arc::clone(client));
        }
        self.routing
            .get(venue)
            .and_then(|id| self.clients.get(id))
            .or_else(|| {
                self.default_client
                    .as_ref()
                    .and_then(|id| self.clients.get(id))
            })
            .cloned()
    }

    /// Client for an order already in the cache.
    pub(super) fn client_for_order(&self, order: &Order) -> Option<Arc<dyn ExecutionClient>> {
        let client_id = self.cache.read().client_id(order.client_order_id()).cloned();
        self.client_for(client_id.as_ref(), &order.venue())
    }

    // ========================================================================
    // Denials
    // ========================================================================

    /// Deny a cached order that never reached a venue.
    pub(super) fn deny_order(&mut self, client_order_id: &ClientOrderId, reason: &str) {
        let Some(order) = self.cache.read().order(client_order_id).cloned() else {
            error!(%client_order_id, reason, "Cannot deny unknown order");
            return;
        };
        if !matches!(
            order.status(),
            OrderStatus::Initialized | OrderStatus::Released
        ) {
            warn!(%client_order_id, status = %order.status(), reason, "Order already left local state, not denied");
            return;
        }
        record_denial("exec_engine", "pre_venue");
        warn!(%client_order_id, reason, "Order denied");
        let event = OrderEventBuilder::new(&order, self.clock.now()).denied(reason);
        self.handle_event(event);
    }

    /// Publish a denial for an order whose client order ID is already taken.
    /// The cached order keeps its state.
    pub(super) fn deny_duplicate(&self, order: &Order) {
        let client_order_id = order.client_order_id();
        record_denial("exec_engine", "duplicate_client_order_id");
        warn!(%client_order_id, "Duplicate ClientOrderId, order denied");
        let event = OrderEventBuilder::new(order, self.clock.now())
            .denied(format!("Duplicate ClientOrderId {client_order_id}"));
        self.bus.publish(
            &topics::order_events(order.strategy_id()),
            BusMessage::OrderEvent(event),
        );
    }

    // ========================================================================
    // Submit
    // ========================================================================

    fn handle_submit_order(&mut self, command: SubmitOrder) {
        let client = self.client_for(command.client_id.as_ref(), &command.order.venue());
        let client_order_id = command.order.client_order_id().clone();

        let existing = self.cache.read().order(&client_order_id).cloned();
        let order = match existing {
            Some(cached) if is_primary_resubmission(&cached, &command.order) => cached,
            Some(_) => {
                self.deny_duplicate(&command.order);
                return;
            }
            None => {
                let added = self.cache.write().add_order(
                    command.order.clone(),
                    command.position_id.clone(),
                    client.as_ref().map(|c| c.client_id()),
                );
                if let Err(e) = added {
                    error!(%client_order_id, error = %e, "Cannot cache submitted order");
                    return;
                }
                command.order.clone()
            }
        };

        let instrument_id = order.instrument_id().clone();
        if self.cache.read().instrument(&instrument_id).is_none() {
            self.deny_order(&client_order_id, &format!("Instrument {instrument_id} not found"));
            return;
        }
        let Some(client) = client else {
            let venue = order.venue();
            error!(%client_order_id, %venue, "No execution client for venue");
            self.deny_order(&client_order_id, &format!("No execution client for venue {venue}"));
            return;
        };

        let outbound = SubmitOrder { order, ..command };
        if let Err(e) = client.submit_order(&outbound) {
            error!(%client_order_id, error = %e, "Execution client failed to submit order");
            self.deny_order(&client_order_id, &format!("failed-to-submit-order-to-client: {e}"));
        }
    }

    fn handle_submit_order_list(&mut self, command: SubmitOrderList) {
        let orders = command.order_list.orders().to_vec();
        let venue = command.instrument_id.venue();
        let client = self.client_for(command.client_id.as_ref(), &venue);
        let client_id = client.as_ref().map(|c| c.client_id());
        let list_id = command.order_list.id().clone();

        let duplicates: Vec<&Order> = {
            let cache = self.cache.read();
            orders
                .iter()
                .filter(|o| cache.order_exists(o.client_order_id()))
                .collect()
        };
        if !duplicates.is_empty() {
            for order in &duplicates {
                self.deny_duplicate(order);
            }
            let mut fresh = Vec::new();
            {
                let mut cache = self.cache.write();
                for order in &orders {
                    if cache.order_exists(order.client_order_id()) {
                        continue;
                    }
                    match cache.add_order(order.clone(), command.position_id.clone(), client_id.clone()) {
                        Ok(()) => fresh.push(order.client_order_id().clone()),
                        Err(e) => error!(client_order_id = %order.client_order_id(), error = %e, "Cannot cache listed order"),
                    }
                }
            }
            for client_order_id in &fresh {
                self.deny_order(client_order_id, "Order list contains a duplicate ClientOrderId");
            }
            return;
        }

        {
            let mut cache = self.cache.write();
            if let Err(e) = cache.add_order_list(command.order_list.clone()) {
                error!(order_list_id = %list_id, error = %e, "Cannot cache order list");
                return;
            }
            for order in &orders {
                if let Err(e) =
                    cache.add_order(order.clone(), command.position_id.clone(), client_id.clone())
                {
                    error!(client_order_id = %order.client_order_id(), error = %e, "Cannot cache listed order");
                }
            }
        }

        let ids: Vec<ClientOrderId> = orders.iter().map(|o| o.client_order_id().clone()).collect();
        if self.cache.read().instrument(&command.instrument_id).is_none() {
            let reason = format!("Instrument {} not found", command.instrument_id);
            for client_order_id in &ids {
                self.deny_order(client_order_id, &reason);
            }
            return;
        }
        let Some(client) = client else {
            let reason = format!("No execution client for venue {venue}");
            error!(order_list_id = %list_id, %venue, "No execution client for venue");
            for client_order_id in &ids {
                self.deny_order(client_order_id, &reason);
            }
            return;
        };

        // OTO children wait locally for their parent's fills
        let list_members: HashSet<&ClientOrderId> = ids.iter().collect();
        let mut outbound = Vec::new();
        for order in &orders {
            let held = self.config.manage_contingent_orders
                && order
                    .parent_order_id()
                    .is_some_and(|parent| list_members.contains(parent));
            if held {
                let event = OrderEventBuilder::new(order, self.clock.now()).emulated();
                self.handle_event(event);
            } else {
                outbound.push(order.clone());
            }
        }

        info!(order_list_id = %list_id, orders = ids.len(), submitted = outbound.len(), "Submitting order list");
        for order in outbound {
            let client_order_id = order.client_order_id().clone();
            let submit = SubmitOrder {
                trader_id: command.trader_id.clone(),
                client_id: command.client_id.clone(),
                strategy_id: command.strategy_id.clone(),
                instrument_id: command.instrument_id.clone(),
                order,
                position_id: command.position_id.clone(),
                command_id: UUID4::new_v4(),
                ts_init: command.ts_init,
            };
            if let Err(e) = client.submit_order(&submit) {
                error!(%client_order_id, error = %e, "Execution client failed to submit order");
                self.deny_order(&client_order_id, &format!("failed-to-submit-order-to-client: {e}"));
            }
        }
    }

    /// Submit a held order that was just released.
    pub(super) fn submit_released(&mut self, order: &Order) {
        let client_order_id = order.client_order_id().clone();
        let Some(client) = self.client_for_order(order) else {
            let reason = format!("No execution client for venue {}", order.venue());
            self.deny_order(&client_order_id, &reason);
            return;
        };
        let position_id = self.cache.read().position_id(&client_order_id).cloned();
        let submit = SubmitOrder {
            client_id: Some(client.client_id()),
            ts_init: self.clock.now(),
            ..SubmitOrder::new(order.clone(), position_id)
        };
        if let Err(e) = client.submit_order(&submit) {
            error!(%client_order_id, error = %e, "Execution client failed to submit released order");
            self.deny_order(&client_order_id, &format!("failed-to-submit-order-to-client: {e}"));
        }
    }

    // ========================================================================
    // Modify, Cancel, Query
    // ========================================================================

    /// Cached order that can still be amended or canceled.
    fn live_order(&self, client_order_id: &ClientOrderId, action: &str) -> Option<Order> {
        let Some(order) = self.cache.read().order(client_order_id).cloned() else {
            warn!(%client_order_id, action, "Order not found");
            return None;
        };
        if order.is_closed() {
            warn!(%client_order_id, action, status = %order.status(), "Order already closed");
            return None;
        }
        if order.is_pending_cancel() {
            warn!(%client_order_id, action, "Order already pending cancel");
            return None;
        }
        Some(order)
    }

    fn handle_modify_order(&mut self, command: &ModifyOrder) {
        let Some(order) = self.live_order(&command.client_order_id, "modify") else {
            return;
        };
        if order.is_active_local() {
            self.update_local(
                &order,
                command.quantity.unwrap_or_else(|| order.quantity()),
                command.price,
                command.trigger_price,
            );
            return;
        }
        self.send_modify(&order, command);
    }

    /// Apply an update to an order that has not reached a venue.
    pub(super) fn update_local(
        &mut self,
        order: &Order,
        quantity: Quantity,
        price: Option<Price>,
        trigger_price: Option<Price>,
    ) {
        let event =
            OrderEventBuilder::new(order, self.clock.now()).updated(quantity, price, trigger_price);
        self.handle_event(event);
    }

    /// Mark the order pending update and hand the amend to its venue client.
    pub(super) fn send_modify(&mut self, order: &Order, command: &ModifyOrder) {
        let client_order_id = order.client_order_id().clone();
        let Some(client) = self.client_for(command.client_id.as_ref(), &order.venue()) else {
            error!(%client_order_id, "No execution client to modify order");
            return;
        };
        if !order.is_pending_update() {
            let pending = OrderEventBuilder::new(order, self.clock.now()).pending_update();
            self.handle_event(pending);
        }
        if let Err(e) = client.modify_order(command) {
            error!(%client_order_id, error = %e, "Execution client failed to modify order");
            let current = self.cache.read().order(&client_order_id).cloned();
            if let Some(order) = current.filter(Order::is_pending_update) {
                let rejected = OrderEventBuilder::new(&order, self.clock.now())
                    .modify_rejected(format!("failed-to-modify-order-with-client: {e}"));
                self.handle_event(rejected);
            }
        }
    }

    fn handle_cancel_order(&mut self, command: &CancelOrder) {
        let Some(order) = self.live_order(&command.client_order_id, "cancel") else {
            return;
        };
        if order.is_active_local() {
            self.cancel_local(&order);
            return;
        }
        self.send_cancel(&order, command);
    }

    /// Cancel an order that has not reached a venue.
    pub(super) fn cancel_local(&mut self, order: &Order) {
        let event = OrderEventBuilder::new(order, self.clock.now()).canceled();
        self.handle_event(event);
    }

    /// Mark the order pending cancel and hand the cancel to its venue client.
    pub(super) fn send_cancel(&mut self, order: &Order, command: &CancelOrder) {
        let client_order_id = order.client_order_id().clone();
        let Some(client) = self.client_for(command.client_id.as_ref(), &order.venue()) else {
            error!(%client_order_id, "No execution client to cancel order");
            return;
        };
        let pending = OrderEventBuilder::new(order, self.clock.now()).pending_cancel();
        self.handle_event(pending);
        if let Err(e) = client.cancel_order(command) {
            error!(%client_order_id, error = %e, "Execution client failed to cancel order");
            self.reject_cancel(&client_order_id, &e.to_string());
        }
    }

    fn reject_cancel(&mut self, client_order_id: &ClientOrderId, reason: &str) {
        let Some(order) = self.cache.read().order(client_order_id).cloned() else {
            return;
        };
        if order.is_pending_cancel() {
            let rejected = OrderEventBuilder::new(&order, self.clock.now())
                .cancel_rejected(format!("failed-to-cancel-order-with-client: {reason}"));
            self.handle_event(rejected);
        }
    }

    fn handle_cancel_all_orders(&mut self, command: &CancelAllOrders) {
        let mut filter = QueryFilter::all()
            .instrument(command.instrument_id.clone())
            .strategy(command.strategy_id.clone());
        filter.order_side = command.order_side;
        let open: Vec<Order> = self
            .cache
            .read()
            .orders_open(&filter)
            .into_iter()
            .filter(|o| !o.is_pending_cancel())
            .cloned()
            .collect();

        let (local, at_venue): (Vec<Order>, Vec<Order>) =
            open.into_iter().partition(Order::is_active_local);
        for order in &local {
            self.cancel_local(order);
        }
        if at_venue.is_empty() {
            debug!(instrument_id = %command.instrument_id, "No venue orders to cancel");
            return;
        }

        let Some(client) = self.client_for(command.client_id.as_ref(), &command.instrument_id.venue())
        else {
            error!(instrument_id = %command.instrument_id, "No execution client to cancel orders");
            return;
        };
        for order in &at_venue {
            let pending = OrderEventBuilder::new(order, self.clock.now()).pending_cancel();
            self.handle_event(pending);
        }
        if let Err(e) = client.cancel_all_orders(command) {
            error!(instrument_id = %command.instrument_id, error = %e, "Execution client failed to cancel all orders");
            for order in &at_venue {
                self.reject_cancel(order.client_order_id(), &e.to_string());
            }
        }
    }

    fn handle_batch_cancel_orders(&mut self, command: &BatchCancelOrders) {
        let mut at_venue = Vec::new();
        for cancel in &command.cancels {
            let Some(order) = self.live_order(&cancel.client_order_id, "batch cancel") else {
                continue;
            };
            if order.is_active_local() {
                self.cancel_local(&order);
            } else {
                let pending = OrderEventBuilder::new(&order, self.clock.now()).pending_cancel();
                self.handle_event(pending);
                at_venue.push(cancel.clone());
            }
        }
        if at_venue.is_empty() {
            return;
        }

        let Some(client) = self.client_for(command.client_id.as_ref(), &command.instrument_id.venue())
        else {
            error!(instrument_id = %command.instrument_id, "No execution client to cancel orders");
            return;
        };
        let ids: Vec<ClientOrderId> = at_venue.iter().map(|c| c.client_order_id.clone()).collect();
        let batch = BatchCancelOrders {
            cancels: at_venue,
            ..command.clone()
        };
        if let Err(e) = client.batch_cancel_orders(&batch) {
            error!(instrument_id = %command.instrument_id, error = %e, "Execution client failed to batch cancel");
            for client_order_id in &ids {
                self.reject_cancel(client_order_id, &e.to_string());
            }
        }
    }

    fn handle_query_order(&mut self, command: &QueryOrder) {
        let Some(order) = self.cache.read().order(&command.client_order_id).cloned() else {
            warn!(client_order_id = %command.client_order_id, "Cannot query unknown order");
            return;
        };
        let Some(client) = self.client_for(command.client_id.as_ref(), &order.venue()) else {
            error!(client_order_id = %command.client_order_id, "No execution client to query order");
            return;
        };
        if let Err(e) = client.query_order(command) {
            error!(client_order_id = %command.client_order_id, error = %e, "Execution client failed to query order");
        }
    }
}
