//! Execution Engine
//!
//! Routes trading commands to venue execution clients and applies venue
//! events to the cache. Fills open, update, close or flip positions; with
//! `manage_contingent_orders` set, events on OTO/OCO/OUO orders propagate to
//! their linked orders.
//!
//! All mutation of orders and positions happens here, on the engine loop.
//! Commands and events already represented in the cache are logged and
//! dropped, so transports may redeliver freely.

mod contingency;
mod positions;
mod routing;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

pub(crate) use routing::is_primary_resubmission;

use crate::application::cache::{QueryFilter, SharedCache};
use crate::application::component::{ComponentState, ComponentTrigger};
use crate::application::ports::{BusMessage, Clock, EventBus, ExecutionClient, topics};
use crate::domain::account::{Account, AccountState};
use crate::domain::order_execution::{OrderError, OrderEventAny, TradingCommand};
use crate::domain::position_management::{OmsType, PositionIdGenerator};
use crate::domain::shared::{ClientId, ClientOrderId, DomainError, StrategyId, TraderId, Venue};
use crate::observability::{record_dropped_event, record_order_event, update_open_orders};

/// Execution engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecEngineConfig {
    /// OMS type for strategies without an override.
    pub default_oms_type: OmsType,
    /// Propagate events across OTO/OCO/OUO links.
    pub manage_contingent_orders: bool,
    /// Log every command and event at debug level.
    pub debug: bool,
}

impl Default for ExecEngineConfig {
    fn default() -> Self {
        Self {
            default_oms_type: OmsType::Netting,
            manage_contingent_orders: true,
            debug: false,
        }
    }
}

/// Where the risk engine sends approved commands and synthesized events.
#[cfg_attr(test, mockall::automock)]
pub trait ExecutionGateway {
    /// Handle an approved trading command.
    fn execute(&mut self, command: TradingCommand);

    /// Apply an order event.
    fn process(&mut self, event: OrderEventAny);
}

/// Routes commands to venues and applies their events.
pub struct ExecutionEngine {
    config: ExecEngineConfig,
    state: ComponentState,
    cache: SharedCache,
    bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    clients: HashMap<ClientId, Arc<dyn ExecutionClient>>,
    routing: HashMap<Venue, ClientId>,
    default_client: Option<ClientId>,
    oms_overrides: HashMap<StrategyId, OmsType>,
    position_ids: PositionIdGenerator,
    command_count: u64,
    event_count: u64,
    report_count: u64,
    unknown_strategy_count: u64,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("state", &self.state)
            .field("clients", &self.clients.keys().collect::<Vec<_>>())
            .field("default_client", &self.default_client)
            .field("command_count", &self.command_count)
            .field("event_count", &self.event_count)
            .finish_non_exhaustive()
    }
}

impl ExecutionEngine {
    /// Create a `READY` engine.
    pub fn new(
        trader_id: TraderId,
        config: ExecEngineConfig,
        cache: SharedCache,
        bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            state: ComponentState::Ready,
            cache,
            bus,
            clock,
            clients: HashMap::new(),
            routing: HashMap::new(),
            default_client: None,
            oms_overrides: HashMap::new(),
            position_ids: PositionIdGenerator::new(trader_id),
            command_count: 0,
            event_count: 0,
            report_count: 0,
            unknown_strategy_count: 0,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Engine settings.
    #[must_use]
    pub const fn config(&self) -> &ExecEngineConfig {
        &self.config
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ComponentState {
        self.state
    }

    /// Shared cache handle.
    #[must_use]
    pub const fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Commands received.
    #[must_use]
    pub const fn command_count(&self) -> u64 {
        self.command_count
    }

    /// Order events received, including locally synthesized ones.
    #[must_use]
    pub const fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Account states received.
    #[must_use]
    pub const fn report_count(&self) -> u64 {
        self.report_count
    }

    /// Events whose strategy is unknown to the cache, so never routed to it.
    #[must_use]
    pub const fn unknown_strategy_count(&self) -> u64 {
        self.unknown_strategy_count
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn transition(&mut self, trigger: ComponentTrigger) -> Result<(), DomainError> {
        self.state = self.state.transition(trigger)?;
        info!(component = "ExecutionEngine", state = %self.state, "Lifecycle");
        Ok(())
    }

    /// Start processing.
    ///
    /// # Errors
    ///
    /// Returns error unless the engine is `READY` or `STOPPED`.
    pub fn start(&mut self) -> Result<(), DomainError> {
        self.transition(ComponentTrigger::Start)
    }

    /// Stop processing.
    ///
    /// # Errors
    ///
    /// Returns error unless the engine is `RUNNING`.
    pub fn stop(&mut self) -> Result<(), DomainError> {
        self.transition(ComponentTrigger::Stop)
    }

    /// Clear counters and the position ID generator.
    ///
    /// # Errors
    ///
    /// Returns error unless the engine is `READY` or `STOPPED`.
    pub fn reset(&mut self) -> Result<(), DomainError> {
        self.transition(ComponentTrigger::Reset)?;
        self.position_ids.reset();
        self.command_count = 0;
        self.event_count = 0;
        self.report_count = 0;
        self.unknown_strategy_count = 0;
        Ok(())
    }

    /// Release clients for good.
    ///
    /// # Errors
    ///
    /// Returns error unless the engine is `READY` or `STOPPED`.
    pub fn dispose(&mut self) -> Result<(), DomainError> {
        self.transition(ComponentTrigger::Dispose)?;
        self.clients.clear();
        self.routing.clear();
        self.default_client = None;
        Ok(())
    }

    /// Seed the position ID generator from positions already in the cache,
    /// so generated IDs continue after a restart.
    pub fn load_cache(&mut self) {
        let cache = self.cache.read();
        for strategy_id in cache.strategy_ids() {
            let filter =
                QueryFilter::all().strategy(strategy_id.clone());
            let count = cache.positions_total_count(&filter);
            self.position_ids.set_count(strategy_id.clone(), count);
        }
        info!(strategies = cache.strategy_ids().len(), "Loaded position ID counts");
    }

    /// Run the cache's index audit.
    #[must_use]
    pub fn check_integrity(&self) -> bool {
        self.cache.read().check_integrity()
    }

    // ========================================================================
    // Client Registration
    // ========================================================================

    /// Register a venue client; it also becomes the route for its venue.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if a client with the same ID is registered.
    pub fn register_client(&mut self, client: Arc<dyn ExecutionClient>) -> Result<(), DomainError> {
        let client_id = client.client_id();
        if self.clients.contains_key(&client_id) {
            return Err(DomainError::Duplicate {
                entity_type: "ExecutionClient".to_string(),
                id: client_id.to_string(),
            });
        }
        if let Some(venue) = client.venue() {
            self.routing.insert(venue, client_id.clone());
        }
        info!(%client_id, "Registered execution client");
        self.clients.insert(client_id, client);
        Ok(())
    }

    /// Register a client used when no venue route matches.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if a client with the same ID is registered.
    pub fn register_default_client(
        &mut self,
        client: Arc<dyn ExecutionClient>,
    ) -> Result<(), DomainError> {
        let client_id = client.client_id();
        self.register_client(client)?;
        info!(%client_id, "Registered default execution client");
        self.default_client = Some(client_id);
        Ok(())
    }

    /// Route `venue` to an already registered client.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the client is not registered.
    pub fn register_venue_routing(
        &mut self,
        client_id: &ClientId,
        venue: Venue,
    ) -> Result<(), DomainError> {
        if !self.clients.contains_key(client_id) {
            return Err(DomainError::NotFound {
                entity_type: "ExecutionClient".to_string(),
                id: client_id.to_string(),
            });
        }
        info!(%client_id, %venue, "Registered venue routing");
        self.routing.insert(venue, client_id.clone());
        Ok(())
    }

    /// Remove a client and any routes to it.
    pub fn deregister_client(&mut self, client_id: &ClientId) {
        if self.clients.remove(client_id).is_none() {
            warn!(%client_id, "Cannot deregister unknown execution client");
            return;
        }
        self.routing.retain(|_, routed| routed != client_id);
        if self.default_client.as_ref() == Some(client_id) {
            self.default_client = None;
        }
        info!(%client_id, "Deregistered execution client");
    }

    /// IDs of the registered clients.
    #[must_use]
    pub fn registered_clients(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.clients.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Use `oms_type` for `strategy_id` instead of the configured default.
    pub fn register_oms_type(&mut self, strategy_id: StrategyId, oms_type: OmsType) {
        info!(%strategy_id, %oms_type, "Registered OMS type");
        self.oms_overrides.insert(strategy_id, oms_type);
    }

    fn oms_type_for(&self, strategy_id: &StrategyId) -> OmsType {
        self.oms_overrides
            .get(strategy_id)
            .copied()
            .unwrap_or(self.config.default_oms_type)
    }

    // ========================================================================
    // Account States
    // ========================================================================

    /// Apply an account state to the cache and publish it.
    pub fn process_account_state(&mut self, state: AccountState) {
        self.report_count += 1;
        let account_id = state.account_id.clone();
        {
            let mut cache = self.cache.write();
            let result = match cache.account(&account_id).cloned() {
                Some(mut account) => match account.apply(state.clone()) {
                    Ok(()) => cache.update_account(account),
                    Err(e) => {
                        error!(%account_id, error = %e, "Cannot apply account state");
                        return;
                    }
                },
                None => cache.add_account(Account::new(state.clone())),
            };
            if let Err(e) = result {
                error!(%account_id, error = %e, "Cannot cache account state");
                return;
            }
        }
        debug!(%account_id, "Applied account state");
        self.bus.publish(
            &topics::account_events(&account_id),
            BusMessage::AccountState(state),
        );
    }

    // ========================================================================
    // Event Handling
    // ========================================================================

    /// Resolve the cached client order ID for an event, falling back to its
    /// venue order ID for orders the venue knows under a foreign client ID.
    fn resolve_client_order_id(&self, event: &OrderEventAny) -> Option<ClientOrderId> {
        let cache = self.cache.read();
        if cache.order_exists(event.client_order_id()) {
            return Some(event.client_order_id().clone());
        }
        event
            .venue_order_id()
            .and_then(|venue_order_id| cache.client_order_id(venue_order_id))
            .cloned()
    }

    fn handle_event(&mut self, mut event: OrderEventAny) {
        self.event_count += 1;
        record_order_event(event.event_type());
        if self.config.debug {
            debug!(?event, "Processing event");
        }

        let Some(client_order_id) = self.resolve_client_order_id(&event) else {
            if event.as_fill().is_some()
                && !self.cache.read().strategy_ids().contains(event.strategy_id())
            {
                self.unknown_strategy_count += 1;
                record_dropped_event("unknown_strategy");
                warn!(
                    client_order_id = %event.client_order_id(),
                    strategy_id = %event.strategy_id(),
                    "Fill for unknown strategy and order, not applied"
                );
                return;
            }
            record_dropped_event("unknown_order");
            warn!(
                client_order_id = %event.client_order_id(),
                venue_order_id = ?event.venue_order_id(),
                event_type = event.event_type(),
                "Cannot apply event: order not found"
            );
            return;
        };

        let Some(mut order) = self.cache.read().order(&client_order_id).cloned() else {
            return;
        };
        if event.client_order_id() != &client_order_id
            || event.strategy_id() != order.strategy_id()
        {
            let header = event.header_mut();
            header.client_order_id = client_order_id.clone();
            header.strategy_id = order.strategy_id().clone();
        }

        if order.is_duplicate(&event) {
            record_dropped_event("duplicate");
            warn!(
                %client_order_id,
                event_id = %event.event_id(),
                event_type = event.event_type(),
                "Duplicate event ignored"
            );
            return;
        }

        let oms_type = self.oms_type_for(order.strategy_id());
        if let OrderEventAny::Filled(fill) = &mut event {
            let position_id = self.determine_position_id(&order, fill, oms_type);
            fill.position_id = Some(position_id);
        }

        if let Err(e) = order.apply(event.clone()) {
            if e.is_duplicate() {
                warn!(%client_order_id, error = %e, "Duplicate event ignored");
            } else if matches!(e, OrderError::InvalidStateTransition { .. }) {
                warn!(%client_order_id, status = %order.status(), error = %e, "Event not applied");
            } else {
                error!(%client_order_id, error = %e, "Event not applied");
            }
            return;
        }
        if let (Some(overfill), Some(_)) = (order.overfill_qty(), event.as_fill()) {
            error!(
                %client_order_id,
                quantity = %order.quantity(),
                filled_qty = %order.filled_qty(),
                %overfill,
                "Order overfilled"
            );
        }

        if let Err(e) = self.cache.write().update_order(order.clone()) {
            error!(%client_order_id, error = %e, "Cannot update cached order");
            return;
        }
        update_open_orders(self.cache.read().orders_open_count(&QueryFilter::all()));
        if self.cache.read().strategy_ids().contains(order.strategy_id()) {
            self.publish_order_event(event.clone());
        } else {
            self.unknown_strategy_count += 1;
            record_dropped_event("unknown_strategy");
            warn!(
                %client_order_id,
                strategy_id = %order.strategy_id(),
                "Event applied but strategy unknown, not routed"
            );
        }

        if let OrderEventAny::Filled(fill) = &event {
            self.handle_order_fill(&order, fill, oms_type);
        }
        self.restore_spawned_leaves(&order, &event);
        if self.config.manage_contingent_orders {
            self.handle_contingencies(&order, &event);
        }
    }

    fn publish_order_event(&self, event: OrderEventAny) {
        let topic = topics::order_events(event.strategy_id());
        self.bus.publish(&topic, BusMessage::OrderEvent(event));
    }
}

impl ExecutionGateway for ExecutionEngine {
    fn execute(&mut self, command: TradingCommand) {
        self.execute_command(command);
    }

    fn process(&mut self, event: OrderEventAny) {
        self.handle_event(event);
    }
}
