//! Spawn and in-place operations over the cache.

use std::sync::Arc;

use tracing::debug;

use super::{AlgorithmAction, AlgorithmError, SpawnKind, SpawnRequest};
use crate::application::cache::SharedCache;
use crate::application::ports::Clock;
use crate::domain::order_execution::{
    CancelOrder, Order, OrderEventAny, OrderEventBuilder, OrderEventHeader,
    OrderInitialized, OrderStatus, OrderType, SubmitOrder, TradingCommand,
};
use crate::domain::shared::{ClientOrderId, ExecAlgorithmId, Price, Quantity};

/// Something the kernel must feed to the engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmOutput {
    /// Local event for the execution engine to apply.
    Event(OrderEventAny),
    /// Command for the risk engine.
    Command(TradingCommand),
}

/// A child taken from a primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnedOrder {
    /// Reduces the primary by the child's quantity.
    pub primary_update: OrderEventAny,
    /// The new child, not yet cached.
    pub child: Order,
}

/// Spawn and in-place operations shared by every algorithm.
#[derive(Clone)]
pub struct ExecAlgorithmCore {
    id: ExecAlgorithmId,
    cache: SharedCache,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ExecAlgorithmCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecAlgorithmCore")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl ExecAlgorithmCore {
    /// Create a core for algorithm `id`.
    pub fn new(id: ExecAlgorithmId, cache: SharedCache, clock: Arc<dyn Clock>) -> Self {
        Self { id, cache, clock }
    }

    /// Algorithm served.
    #[must_use]
    pub const fn id(&self) -> &ExecAlgorithmId {
        &self.id
    }

    /// Turn an action into what the engines must process, in order.
    ///
    /// # Errors
    ///
    /// Returns the validation error of the underlying operation.
    pub fn resolve(&self, action: AlgorithmAction) -> Result<Vec<AlgorithmOutput>, AlgorithmError> {
        match action {
            AlgorithmAction::Spawn(request) => {
                let spawned = self.spawn(&request)?;
                let position_id = self.cache.read().position_id(&request.primary_id).cloned();
                Ok(vec![
                    AlgorithmOutput::Event(spawned.primary_update),
                    AlgorithmOutput::Command(TradingCommand::SubmitOrder(SubmitOrder::new(
                        spawned.child,
                        position_id,
                    ))),
                ])
            }
            AlgorithmAction::SubmitPrimary(primary_id) => {
                let primary = self.primary(&primary_id)?;
                let position_id = self.cache.read().position_id(&primary_id).cloned();
                Ok(vec![AlgorithmOutput::Command(TradingCommand::SubmitOrder(
                    SubmitOrder::new(primary, position_id),
                ))])
            }
            AlgorithmAction::ModifyInPlace {
                client_order_id,
                quantity,
                price,
                trigger_price,
            } => {
                let event =
                    self.modify_order_in_place(&client_order_id, quantity, price, trigger_price)?;
                Ok(vec![AlgorithmOutput::Event(event)])
            }
            AlgorithmAction::Cancel(client_order_id) => {
                let command = self.cancel_order(&client_order_id)?;
                Ok(vec![AlgorithmOutput::Command(TradingCommand::CancelOrder(
                    command,
                ))])
            }
        }
    }

    // ========================================================================
    // Spawning
    // ========================================================================

    /// Spawn a market child of `quantity` from the primary.
    ///
    /// # Errors
    ///
    /// Returns error if the primary is unknown, not local, or has less than
    /// `quantity` left.
    pub fn spawn_market(
        &self,
        primary_id: &ClientOrderId,
        quantity: Quantity,
    ) -> Result<SpawnedOrder, AlgorithmError> {
        self.spawn(&SpawnRequest::market(primary_id.clone(), quantity))
    }

    /// Spawn a limit child of `quantity` at `price` from the primary.
    ///
    /// # Errors
    ///
    /// Same as [`Self::spawn_market`].
    pub fn spawn_limit(
        &self,
        primary_id: &ClientOrderId,
        quantity: Quantity,
        price: Price,
    ) -> Result<SpawnedOrder, AlgorithmError> {
        self.spawn(&SpawnRequest {
            kind: SpawnKind::Limit(price),
            ..SpawnRequest::market(primary_id.clone(), quantity)
        })
    }

    /// Spawn a market-to-limit child of `quantity` from the primary.
    ///
    /// # Errors
    ///
    /// Same as [`Self::spawn_market`].
    pub fn spawn_market_to_limit(
        &self,
        primary_id: &ClientOrderId,
        quantity: Quantity,
    ) -> Result<SpawnedOrder, AlgorithmError> {
        self.spawn(&SpawnRequest {
            kind: SpawnKind::MarketToLimit,
            ..SpawnRequest::market(primary_id.clone(), quantity)
        })
    }

    /// Build a child for `request` and the update reducing its primary.
    /// The child keeps the primary's contingency links. Nothing is written to
    /// the cache.
    ///
    /// # Errors
    ///
    /// Same as [`Self::spawn_market`].
    pub fn spawn(&self, request: &SpawnRequest) -> Result<SpawnedOrder, AlgorithmError> {
        let primary = self.primary(&request.primary_id)?;
        ensure_local(&primary)?;
        if !request.quantity.is_positive() || request.quantity > primary.quantity() {
            return Err(AlgorithmError::InvalidSpawnQuantity {
                primary: request.primary_id.clone(),
                requested: request.quantity,
                available: primary.quantity(),
            });
        }

        let sequence = self
            .cache
            .read()
            .orders_for_exec_spawn(&request.primary_id)
            .len();
        let child_id = request.primary_id.spawned(sequence);
        let now = self.clock.now();

        let (order_type, price) = match request.kind {
            SpawnKind::Market => (OrderType::Market, None),
            SpawnKind::Limit(price) => (OrderType::Limit, Some(price)),
            SpawnKind::MarketToLimit => (OrderType::MarketToLimit, None),
        };
        let child = Order::new(OrderInitialized {
            header: OrderEventHeader::new(
                primary.trader_id().clone(),
                primary.strategy_id().clone(),
                primary.instrument_id().clone(),
                child_id.clone(),
                now,
            ),
            side: primary.side(),
            order_type,
            quantity: request.quantity,
            price,
            trigger_price: None,
            time_in_force: request.time_in_force,
            expire_time: None,
            post_only: false,
            reduce_only: request.reduce_only,
            contingency_type: primary.contingency_type(),
            order_list_id: primary.order_list_id().cloned(),
            linked_order_ids: primary.linked_order_ids().to_vec(),
            parent_order_id: primary.parent_order_id().cloned(),
            exec_algorithm_id: primary.exec_algorithm_id().cloned(),
            exec_algorithm_params: primary.exec_algorithm_params().clone(),
            exec_spawn_id: Some(request.primary_id.clone()),
            tags: request.tags.clone(),
        });

        let remaining = primary.quantity().saturating_sub(request.quantity);
        let primary_update = OrderEventBuilder::new(&primary, now).updated(remaining, None, None);
        debug!(
            algorithm = %self.id,
            primary_id = %request.primary_id,
            %child_id,
            quantity = %request.quantity,
            %remaining,
            "Spawned order"
        );
        Ok(SpawnedOrder {
            primary_update,
            child,
        })
    }

    // ========================================================================
    // Primary Management
    // ========================================================================

    /// Update event amending a local order in place.
    ///
    /// # Errors
    ///
    /// Returns error if the order is unknown, no longer local, or nothing
    /// would change.
    pub fn modify_order_in_place(
        &self,
        client_order_id: &ClientOrderId,
        quantity: Option<Quantity>,
        price: Option<Price>,
        trigger_price: Option<Price>,
    ) -> Result<OrderEventAny, AlgorithmError> {
        let order = self.order(client_order_id)?;
        ensure_local(&order)?;

        let changes_qty = quantity.is_some_and(|q| q != order.quantity());
        let changes_price = price.is_some() && price != order.price();
        let changes_trigger = trigger_price.is_some() && trigger_price != order.trigger_price();
        if !(changes_qty || changes_price || changes_trigger) {
            return Err(AlgorithmError::NothingToModify(client_order_id.clone()));
        }
        Ok(OrderEventBuilder::new(&order, self.clock.now()).updated(
            quantity.unwrap_or_else(|| order.quantity()),
            price,
            trigger_price,
        ))
    }

    /// Cancel command for an order, handled like a strategy's own cancel.
    ///
    /// # Errors
    ///
    /// Returns error if the order is unknown or already closed.
    pub fn cancel_order(&self, client_order_id: &ClientOrderId) -> Result<CancelOrder, AlgorithmError> {
        let order = self.order(client_order_id)?;
        if order.is_closed() {
            return Err(AlgorithmError::OrderClosed(client_order_id.clone()));
        }
        Ok(CancelOrder::new(&order))
    }

    fn order(&self, client_order_id: &ClientOrderId) -> Result<Order, AlgorithmError> {
        self.cache
            .read()
            .order(client_order_id)
            .cloned()
            .ok_or_else(|| AlgorithmError::OrderNotFound(client_order_id.clone()))
    }

    fn primary(&self, client_order_id: &ClientOrderId) -> Result<Order, AlgorithmError> {
        let order = self.order(client_order_id)?;
        if !order.is_primary() {
            return Err(AlgorithmError::NotPrimary(client_order_id.clone()));
        }
        Ok(order)
    }
}

/// In-place changes are only possible before the order reaches a venue.
fn ensure_local(order: &Order) -> Result<(), AlgorithmError> {
    match order.status() {
        OrderStatus::Initialized | OrderStatus::Emulated | OrderStatus::Released => Ok(()),
        status => Err(AlgorithmError::NotLocal {
            client_order_id: order.client_order_id().clone(),
            status: status.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TestClock;
    use crate::application::test_kit::{audusd, make_cache, make_factory};
    use crate::domain::order_execution::{OrderFactory, OrderSide};
    use crate::domain::shared::AccountId;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn qty(value: u64) -> Quantity {
        Quantity::from_u64(value)
    }

    fn make_core() -> (ExecAlgorithmCore, SharedCache) {
        let cache = make_cache();
        let core = ExecAlgorithmCore::new(
            ExecAlgorithmId::new("TWAP"),
            Arc::clone(&cache),
            Arc::new(TestClock::new(Utc::now())),
        );
        (core, cache)
    }

    fn make_primary(factory: &mut OrderFactory, cache: &SharedCache, quantity: u64) -> ClientOrderId {
        let init = factory
            .initialized(audusd().id, OrderSide::Buy, OrderType::Market, qty(quantity))
            .with_exec_algorithm(ExecAlgorithmId::new("TWAP"), BTreeMap::new());
        let order = Order::new(init);
        let id = order.client_order_id().clone();
        cache.write().add_order(order, None, None).unwrap();
        id
    }

    /// Apply a spawn the way the kernel would: update the primary, cache the child.
    fn apply(cache: &SharedCache, spawned: SpawnedOrder) -> Order {
        let mut cache = cache.write();
        let primary_id = spawned.primary_update.client_order_id().clone();
        let mut primary = cache.order(&primary_id).cloned().unwrap();
        primary.apply(spawned.primary_update).unwrap();
        cache.update_order(primary).unwrap();
        cache.add_order(spawned.child.clone(), None, None).unwrap();
        spawned.child
    }

    #[test]
    fn spawn_market_reduces_primary_and_derives_id() {
        let (core, cache) = make_core();
        let mut factory = make_factory();
        let primary_id = make_primary(&mut factory, &cache, 100);

        let spawned = core.spawn_market(&primary_id, qty(40)).unwrap();
        let OrderEventAny::Updated(update) = &spawned.primary_update else {
            panic!("expected update");
        };
        assert_eq!(update.quantity, qty(60));
        assert_eq!(
            spawned.child.client_order_id().as_str(),
            format!("{primary_id}-E1")
        );
        assert_eq!(spawned.child.exec_spawn_id(), Some(&primary_id));
        assert!(spawned.child.is_spawned());
        assert_eq!(spawned.child.side(), OrderSide::Buy);
    }

    #[test]
    fn spawn_sequence_follows_family_size() {
        let (core, cache) = make_core();
        let mut factory = make_factory();
        let primary_id = make_primary(&mut factory, &cache, 100);

        apply(&cache, core.spawn_market(&primary_id, qty(10)).unwrap());
        let limit = core
            .spawn_limit(&primary_id, qty(10), "1.00000".parse().unwrap())
            .unwrap();
        let second = apply(&cache, limit);

        assert_eq!(second.client_order_id().as_str(), format!("{primary_id}-E2"));
        assert_eq!(second.order_type(), OrderType::Limit);
        let total = cache
            .read()
            .exec_spawn_total_quantity(&primary_id, false)
            .unwrap();
        assert_eq!(total, qty(100));
    }

    #[test]
    fn spawn_more_than_primary_fails_without_change() {
        let (core, cache) = make_core();
        let mut factory = make_factory();
        let primary_id = make_primary(&mut factory, &cache, 100);

        let result = core.spawn_market_to_limit(&primary_id, qty(101));

        assert!(matches!(
            result,
            Err(AlgorithmError::InvalidSpawnQuantity { .. })
        ));
        assert_eq!(cache.read().order(&primary_id).unwrap().quantity(), qty(100));
        assert_eq!(cache.read().orders_for_exec_spawn(&primary_id).len(), 1);
    }

    #[test]
    fn spawn_from_plain_order_fails() {
        let (core, cache) = make_core();
        let order = make_factory().market(audusd().id, OrderSide::Buy, qty(100));
        let id = order.client_order_id().clone();
        cache.write().add_order(order, None, None).unwrap();

        assert_eq!(
            core.spawn_market(&id, qty(10)).unwrap_err(),
            AlgorithmError::NotPrimary(id)
        );
    }

    #[test]
    fn modify_in_place_requires_change() {
        let (core, cache) = make_core();
        let mut factory = make_factory();
        let primary_id = make_primary(&mut factory, &cache, 100);

        assert_eq!(
            core.modify_order_in_place(&primary_id, Some(qty(100)), None, None)
                .unwrap_err(),
            AlgorithmError::NothingToModify(primary_id.clone())
        );
        let event = core
            .modify_order_in_place(&primary_id, Some(qty(80)), None, None)
            .unwrap();
        assert!(matches!(event, OrderEventAny::Updated(u) if u.quantity == qty(80)));
    }

    #[test]
    fn modify_in_place_rejects_venue_orders() {
        let (core, cache) = make_core();
        let mut factory = make_factory();
        let primary_id = make_primary(&mut factory, &cache, 100);
        {
            let mut cache = cache.write();
            let mut primary = cache.order(&primary_id).cloned().unwrap();
            let submitted = OrderEventBuilder::new(&primary, Utc::now())
                .submitted(AccountId::new("SIM-001"));
            primary.apply(submitted).unwrap();
            cache.update_order(primary).unwrap();
        }

        let result = core.modify_order_in_place(&primary_id, Some(qty(80)), None, None);
        assert!(matches!(result, Err(AlgorithmError::NotLocal { .. })));
    }

    #[test]
    fn resolve_spawn_updates_primary_before_submitting_child() {
        let (core, cache) = make_core();
        let mut factory = make_factory();
        let primary_id = make_primary(&mut factory, &cache, 100);

        let outputs = core
            .resolve(AlgorithmAction::Spawn(SpawnRequest::market(
                primary_id.clone(),
                qty(25),
            )))
            .unwrap();

        assert!(matches!(&outputs[0], AlgorithmOutput::Event(OrderEventAny::Updated(_))));
        assert!(matches!(
            &outputs[1],
            AlgorithmOutput::Command(TradingCommand::SubmitOrder(s)) if s.order.quantity() == qty(25)
        ));
    }

    #[test]
    fn cancel_closed_order_fails() {
        let (core, cache) = make_core();
        let mut factory = make_factory();
        let primary_id = make_primary(&mut factory, &cache, 100);
        {
            let mut cache = cache.write();
            let mut primary = cache.order(&primary_id).cloned().unwrap();
            primary
                .apply(OrderEventBuilder::new(&primary, Utc::now()).canceled())
                .unwrap();
            cache.update_order(primary).unwrap();
        }

        assert_eq!(
            core.cancel_order(&primary_id).unwrap_err(),
            AlgorithmError::OrderClosed(primary_id)
        );
    }
}
