//! Contingent order management (OTO, OCO, OUO) and exec-spawn leaves
//! restoration.

use tracing::{debug, warn};

use super::ExecutionEngine;
use crate::domain::order_execution::{
    CancelOrder, ContingencyType, ModifyOrder, Order, OrderEventAny, OrderEventBuilder,
    OrderStatus,
};
use crate::domain::shared::{ClientOrderId, Quantity};

impl ExecutionEngine {
    // ========================================================================
    // Exec Spawns
    // ========================================================================

    /// Return the unfilled part of a spawned child that just closed to its
    /// primary, while the primary is still held locally.
    pub(super) fn restore_spawned_leaves(&mut self, order: &Order, event: &OrderEventAny) {
        if !order.is_spawned() || !event.is_closing() {
            return;
        }
        let Some(spawn_id) = order.exec_spawn_id() else {
            return;
        };
        let leaves = order.quantity().saturating_sub(order.filled_qty());
        if leaves.is_zero() {
            return;
        }
        let primary = self.cache.read().order(spawn_id).cloned();
        let Some(primary) = primary else {
            warn!(%spawn_id, "Primary order not found, cannot restore spawned leaves");
            return;
        };
        if !primary.is_active_local() {
            debug!(
                client_order_id = %order.client_order_id(),
                %spawn_id,
                status = %primary.status(),
                "Primary already left local state, spawned leaves not restored"
            );
            return;
        }
        debug!(
            client_order_id = %order.client_order_id(),
            %spawn_id,
            %leaves,
            "Restoring spawned leaves to primary"
        );
        self.update_local(&primary, primary.quantity() + leaves, None, None);
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    pub(super) fn handle_contingencies(&mut self, order: &Order, event: &OrderEventAny) {
        match order.contingency_type() {
            ContingencyType::NoContingency => {}
            ContingencyType::Oto => self.handle_oto_parent(order, event),
            ContingencyType::Oco => self.handle_oco_member(order, event),
            ContingencyType::Ouo => self.handle_ouo_member(order, event),
        }
    }

    /// Cached copies of `ids`, skipping unknown orders.
    fn linked_orders(&self, order: &Order, ids: &[ClientOrderId]) -> Vec<Order> {
        let cache = self.cache.read();
        ids.iter()
            .filter_map(|id| {
                let linked = cache.order(id).cloned();
                if linked.is_none() {
                    warn!(client_order_id = %order.client_order_id(), linked_order_id = %id, "Linked order not found");
                }
                linked
            })
            .collect()
    }

    /// Filled quantity of the order, or of its whole exec-spawn family.
    fn family_filled_qty(&self, order: &Order) -> Quantity {
        order
            .exec_spawn_id()
            .and_then(|spawn_id| self.cache.read().exec_spawn_total_filled_qty(spawn_id, false))
            .unwrap_or_else(|| order.filled_qty())
    }

    /// Leaves quantity of the order, or of its family's active members.
    fn family_leaves_qty(&self, order: &Order) -> Quantity {
        order
            .exec_spawn_id()
            .and_then(|spawn_id| self.cache.read().exec_spawn_total_leaves_qty(spawn_id, true))
            .unwrap_or_else(|| order.leaves_qty())
    }

    /// The order's exec-spawn family still has active leaves.
    fn family_active(&self, order: &Order) -> bool {
        order.exec_spawn_id().is_some() && self.family_leaves_qty(order).is_positive()
    }

    // ========================================================================
    // OTO
    // ========================================================================

    fn handle_oto_parent(&mut self, parent: &Order, event: &OrderEventAny) {
        let children = self.linked_orders(parent, parent.linked_order_ids());
        match event {
            OrderEventAny::Filled(fill) => {
                let filled = self.family_filled_qty(parent);
                for child in children.iter().filter(|c| !c.is_closed()) {
                    if let Some(position_id) = &fill.position_id {
                        self.cache.write().add_position_id(
                            position_id,
                            child.client_order_id(),
                            child.strategy_id(),
                        );
                    }
                    if child.is_emulated() {
                        self.release_child(child, filled);
                    } else {
                        self.modify_quantity(child, filled);
                    }
                }
            }
            OrderEventAny::Updated(_) => {
                for child in children.iter().filter(|c| c.is_emulated()) {
                    self.modify_quantity(child, parent.quantity());
                }
            }
            e if e.is_closing() && parent.filled_qty().is_zero() => {
                if self.family_active(parent) {
                    return;
                }
                for child in &children {
                    self.cancel_contingent(child);
                }
            }
            _ => {}
        }
    }

    /// Size a held child to `quantity`, release it and send it to its venue.
    fn release_child(&mut self, child: &Order, quantity: Quantity) {
        let client_order_id = child.client_order_id().clone();
        let current = self.cache.read().order(&client_order_id).cloned();
        if let Some(child) = current.filter(|c| c.quantity() != quantity) {
            self.update_local(&child, quantity, None, None);
        }
        let current = self.cache.read().order(&client_order_id).cloned();
        let Some(child) = current.filter(Order::is_emulated) else {
            return;
        };
        debug!(%client_order_id, %quantity, "Releasing contingent order");
        let released = OrderEventBuilder::new(&child, self.clock.now()).released();
        self.handle_event(released);

        let current = self.cache.read().order(&client_order_id).cloned();
        if let Some(child) = current.filter(|c| c.status() == OrderStatus::Released) {
            self.submit_released(&child);
        }
    }

    // ========================================================================
    // OCO
    // ========================================================================

    fn handle_oco_member(&mut self, order: &Order, event: &OrderEventAny) {
        let triggers = event.as_fill().is_some() || event.is_closing();
        if !triggers || self.family_active_after_close(order, event) {
            return;
        }
        for linked in self.linked_orders(order, order.linked_order_ids()) {
            self.cancel_contingent(&linked);
        }
    }

    /// A closing member of a still-working exec-spawn family does not yet
    /// release its siblings.
    fn family_active_after_close(&self, order: &Order, event: &OrderEventAny) -> bool {
        event.is_closing() && self.family_active(order)
    }

    // ========================================================================
    // OUO
    // ========================================================================

    fn handle_ouo_member(&mut self, order: &Order, event: &OrderEventAny) {
        let linked = self.linked_orders(order, order.linked_order_ids());
        match event {
            _ if order.is_closed() => {
                if self.family_active(order) {
                    return;
                }
                for sibling in &linked {
                    self.cancel_contingent(sibling);
                }
            }
            OrderEventAny::Filled(fill) => {
                let trigger_leaves = self.family_leaves_qty(order);
                for sibling in linked.iter().filter(|s| !s.is_closed()) {
                    let new_leaves = sibling
                        .leaves_qty()
                        .saturating_sub(fill.last_qty)
                        .min_of(trigger_leaves);
                    if new_leaves.is_zero() {
                        self.cancel_contingent(sibling);
                    } else {
                        self.modify_quantity(sibling, sibling.filled_qty() + new_leaves);
                    }
                }
            }
            OrderEventAny::Updated(_) => {
                let leaves = order.leaves_qty();
                for sibling in linked.iter().filter(|s| !s.is_closed()) {
                    self.modify_quantity(sibling, sibling.filled_qty() + leaves);
                }
            }
            _ => {}
        }
    }

    // ========================================================================
    // Linked Order Actions
    // ========================================================================

    /// Change a linked order's quantity, in place when it is local. Reads the
    /// order afresh since earlier propagation may already have closed it.
    fn modify_quantity(&mut self, order: &Order, quantity: Quantity) {
        let Some(order) = self.cache.read().order(order.client_order_id()).cloned() else {
            return;
        };
        let order = &order;
        if order.quantity() == quantity || order.is_closed() || order.is_pending_cancel() {
            return;
        }
        debug!(client_order_id = %order.client_order_id(), from = %order.quantity(), to = %quantity, "Modifying contingent order");
        if order.is_active_local() {
            self.update_local(order, quantity, None, None);
        } else {
            let command = ModifyOrder::new(order, Some(quantity), None, None);
            self.send_modify(order, &command);
        }
    }

    /// Cancel a linked order, in place when it is local.
    fn cancel_contingent(&mut self, order: &Order) {
        let Some(order) = self.cache.read().order(order.client_order_id()).cloned() else {
            return;
        };
        let order = &order;
        if order.is_closed() || order.is_pending_cancel() {
            return;
        }
        debug!(client_order_id = %order.client_order_id(), "Canceling contingent order");
        if order.is_active_local() {
            self.cancel_local(order);
        } else {
            self.send_cancel(order, &CancelOrder::new(order));
        }
    }
}
