//! Trading Kernel
//!
//! Wires the cache, message bus, risk engine, execution engine and execution
//! algorithms together behind one entry point per input kind:
//!
//! - strategy commands: orders carrying an `exec_algorithm_id` go to their
//!   algorithm, everything else through risk and on to execution
//! - venue events and account states: straight to the execution engine
//! - timer ticks: to every algorithm
//!
//! After every entry point the kernel drains the order events published on
//! the bus and hands those for algorithm-owned orders back to the owning
//! algorithm, so algorithms see local events (denials, in-place cancels) as
//! well as venue ones.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use crate::application::cache::SharedCache;
use crate::application::component::{ComponentState, ComponentTrigger};
use crate::application::exec_algorithm::{
    AlgorithmAction, AlgorithmOutput, ExecAlgorithm, ExecAlgorithmCore,
};
use crate::application::execution_engine::{ExecEngineConfig, ExecutionEngine, ExecutionGateway};
use crate::application::ports::{BusMessage, Clock, EventBus, topics};
use crate::application::risk_engine::{RiskEngine, RiskEngineConfig};
use crate::domain::account::AccountState;
use crate::domain::order_execution::{
    Order, OrderEventAny, OrderEventBuilder, OrderStatus, SubmitOrder, TradingCommand,
};
use crate::domain::shared::{DomainError, ExecAlgorithmId, TraderId};
use crate::observability::record_denial;

/// Bus pattern the kernel listens on for algorithm-owned orders.
const ORDER_EVENTS_PATTERN: &str = "events.order.*";

/// Engine settings for one trader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Trader instance.
    pub trader_id: TraderId,
    /// Risk engine settings.
    pub risk_engine: RiskEngineConfig,
    /// Execution engine settings.
    pub exec_engine: ExecEngineConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            trader_id: TraderId::new("TRADER-001"),
            risk_engine: RiskEngineConfig::default(),
            exec_engine: ExecEngineConfig::default(),
        }
    }
}

struct RegisteredAlgorithm {
    algorithm: Box<dyn ExecAlgorithm>,
    core: ExecAlgorithmCore,
}

/// Owns the engines and algorithms of one trader.
pub struct TradingKernel {
    trader_id: TraderId,
    state: ComponentState,
    cache: SharedCache,
    bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    risk: RiskEngine,
    exec: ExecutionEngine,
    algorithms: BTreeMap<ExecAlgorithmId, RegisteredAlgorithm>,
    order_events: UnboundedReceiver<BusMessage>,
}

impl std::fmt::Debug for TradingKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingKernel")
            .field("trader_id", &self.trader_id)
            .field("state", &self.state)
            .field("risk", &self.risk)
            .field("exec", &self.exec)
            .field("algorithms", &self.algorithms.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl TradingKernel {
    /// Build both engines over the shared cache. The kernel starts `READY`.
    pub fn new(
        config: KernelConfig,
        cache: SharedCache,
        bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let risk = RiskEngine::new(
            config.trader_id.clone(),
            config.risk_engine,
            Arc::clone(&cache),
            Arc::clone(&bus),
            Arc::clone(&clock),
        );
        let exec = ExecutionEngine::new(
            config.trader_id.clone(),
            config.exec_engine,
            Arc::clone(&cache),
            Arc::clone(&bus),
            Arc::clone(&clock),
        );
        let order_events = bus.subscribe(ORDER_EVENTS_PATTERN);
        Self {
            trader_id: config.trader_id,
            state: ComponentState::Ready,
            cache,
            bus,
            clock,
            risk,
            exec,
            algorithms: BTreeMap::new(),
            order_events,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Trader instance.
    #[must_use]
    pub const fn trader_id(&self) -> &TraderId {
        &self.trader_id
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

    /// Message bus.
    #[must_use]
    pub fn bus(&self) -> Arc<dyn EventBus> {
        Arc::clone(&self.bus)
    }

    /// Risk engine.
    #[must_use]
    pub const fn risk_engine(&self) -> &RiskEngine {
        &self.risk
    }

    /// Risk engine, for trading-state and limit changes.
    pub fn risk_engine_mut(&mut self) -> &mut RiskEngine {
        &mut self.risk
    }

    /// Execution engine.
    #[must_use]
    pub const fn exec_engine(&self) -> &ExecutionEngine {
        &self.exec
    }

    /// Execution engine, for client registration.
    pub fn exec_engine_mut(&mut self) -> &mut ExecutionEngine {
        &mut self.exec
    }

    /// IDs of the registered algorithms.
    #[must_use]
    pub fn exec_algorithm_ids(&self) -> Vec<ExecAlgorithmId> {
        self.algorithms.keys().cloned().collect()
    }

    /// Register an execution algorithm under its own ID.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if an algorithm with the same ID is registered.
    pub fn register_exec_algorithm(
        &mut self,
        algorithm: Box<dyn ExecAlgorithm>,
    ) -> Result<(), DomainError> {
        let id = algorithm.id().clone();
        if self.algorithms.contains_key(&id) {
            return Err(DomainError::Duplicate {
                entity_type: "ExecAlgorithm".to_string(),
                id: id.to_string(),
            });
        }
        let core = ExecAlgorithmCore::new(id.clone(), Arc::clone(&self.cache), Arc::clone(&self.clock));
        info!(exec_algorithm_id = %id, "Registered execution algorithm");
        self.algorithms
            .insert(id, RegisteredAlgorithm { algorithm, core });
        Ok(())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start both engines.
    ///
    /// # Errors
    ///
    /// Returns error unless the kernel and engines are `READY` or `STOPPED`.
    pub fn start(&mut self) -> Result<(), DomainError> {
        self.state = self.state.transition(ComponentTrigger::Start)?;
        self.exec.load_cache();
        self.exec.start()?;
        self.risk.start()?;
        info!(trader_id = %self.trader_id, "Kernel started");
        Ok(())
    }

    /// Stop the algorithms, then both engines.
    ///
    /// # Errors
    ///
    /// Returns error unless the kernel and engines are `RUNNING`.
    pub fn stop(&mut self) -> Result<(), DomainError> {
        self.state = self.state.transition(ComponentTrigger::Stop)?;
        let ids: Vec<ExecAlgorithmId> = self.algorithms.keys().cloned().collect();
        for id in ids {
            let actions = match self.algorithms.get_mut(&id) {
                Some(registered) => registered.algorithm.on_stop(),
                None => continue,
            };
            self.apply_actions(&id, actions);
        }
        self.drain_order_events();
        self.risk.stop()?;
        self.exec.stop()?;
        info!(trader_id = %self.trader_id, "Kernel stopped");
        Ok(())
    }

    /// Clear engine counters and the cache for a fresh session.
    ///
    /// # Errors
    ///
    /// Returns error unless the kernel and engines are `READY` or `STOPPED`.
    pub fn reset(&mut self) -> Result<(), DomainError> {
        self.state = self.state.transition(ComponentTrigger::Reset)?;
        self.risk.reset()?;
        self.exec.reset()?;
        self.cache.write().reset();
        while self.order_events.try_recv().is_ok() {}
        Ok(())
    }

    /// Release both engines for good.
    ///
    /// # Errors
    ///
    /// Returns error unless the kernel and engines are `READY` or `STOPPED`.
    pub fn dispose(&mut self) -> Result<(), DomainError> {
        self.state = self.state.transition(ComponentTrigger::Dispose)?;
        self.risk.dispose()?;
        self.exec.dispose()?;
        self.algorithms.clear();
        self.cache.write().dispose();
        Ok(())
    }

    // ========================================================================
    // Inputs
    // ========================================================================

    /// Handle a strategy command.
    pub fn execute(&mut self, command: TradingCommand) {
        match command {
            TradingCommand::SubmitOrder(submit) if submit.order.exec_algorithm_id().is_some() => {
                self.submit_to_algorithm(submit);
            }
            command => self.risk.execute(command, &mut self.exec),
        }
        self.drain_order_events();
    }

    /// Apply a venue order event.
    pub fn process(&mut self, event: OrderEventAny) {
        self.exec.process(event);
        self.drain_order_events();
    }

    /// Apply a venue account state.
    pub fn process_account_state(&mut self, state: AccountState) {
        self.exec.process_account_state(state);
    }

    /// Drive every algorithm's timers to the clock's current time.
    pub fn on_timer(&mut self) {
        let now = self.clock.now();
        let ids: Vec<ExecAlgorithmId> = self.algorithms.keys().cloned().collect();
        for id in ids {
            let actions = match self.algorithms.get_mut(&id) {
                Some(registered) => registered.algorithm.on_time(now),
                None => continue,
            };
            self.apply_actions(&id, actions);
        }
        self.drain_order_events();
    }

    // ========================================================================
    // Algorithm Routing
    // ========================================================================

    fn submit_to_algorithm(&mut self, submit: SubmitOrder) {
        let order = submit.order;
        let client_order_id = order.client_order_id().clone();
        let now = self.clock.now();

        if self.cache.read().order_exists(&client_order_id) {
            self.deny_duplicate(&order);
            return;
        }
        let added = self
            .cache
            .write()
            .add_order(order.clone(), submit.position_id, submit.client_id);
        if let Err(e) = added {
            error!(%client_order_id, error = %e, "Cannot cache primary order");
            return;
        }

        let Some(exec_algorithm_id) = order.exec_algorithm_id().cloned() else {
            return;
        };
        let result = match self.algorithms.get_mut(&exec_algorithm_id) {
            Some(registered) => registered.algorithm.on_order(&order, now),
            None => {
                error!(%client_order_id, %exec_algorithm_id, "Execution algorithm not registered");
                let event = OrderEventBuilder::new(&order, now)
                    .denied(format!("ExecAlgorithm {exec_algorithm_id} not registered"));
                self.exec.process(event);
                return;
            }
        };
        match result {
            Ok(actions) => self.apply_actions(&exec_algorithm_id, actions),
            Err(e) => {
                error!(%client_order_id, %exec_algorithm_id, error = %e, "Execution algorithm refused order");
                let event = OrderEventBuilder::new(&order, now).denied(e.to_string());
                self.exec.process(event);
            }
        }
    }

    /// Publish a denial for a primary whose client order ID is already taken.
    /// The cached order keeps its state.
    fn deny_duplicate(&self, order: &Order) {
        let client_order_id = order.client_order_id();
        record_denial("kernel", "duplicate_client_order_id");
        warn!(%client_order_id, "Duplicate ClientOrderId for execution algorithm, order denied");
        let event = OrderEventBuilder::new(order, self.clock.now())
            .denied(format!("Duplicate ClientOrderId {client_order_id}"));
        self.bus.publish(
            &topics::order_events(order.strategy_id()),
            BusMessage::OrderEvent(event),
        );
    }

    /// Resolve each action against the cache as it stands, then feed its
    /// outputs to the engines before resolving the next one.
    fn apply_actions(&mut self, exec_algorithm_id: &ExecAlgorithmId, actions: Vec<AlgorithmAction>) {
        for action in actions {
            let resolved = match self.algorithms.get(exec_algorithm_id) {
                Some(registered) => registered.core.resolve(action),
                None => return,
            };
            let outputs = match resolved {
                Ok(outputs) => outputs,
                Err(e) => {
                    warn!(%exec_algorithm_id, error = %e, "Algorithm action not applied");
                    continue;
                }
            };
            for output in outputs {
                match output {
                    AlgorithmOutput::Event(event) => self.exec.process(event),
                    AlgorithmOutput::Command(command) => self.risk.execute(command, &mut self.exec),
                }
            }
        }
    }

    fn drain_order_events(&mut self) {
        while let Ok(message) = self.order_events.try_recv() {
            let BusMessage::OrderEvent(event) = message else {
                continue;
            };
            let exec_algorithm_id = {
                let cache = self.cache.read();
                let Some(order) = cache.order(event.client_order_id()) else {
                    continue;
                };
                // Denials of duplicate submissions leave the cached order as is.
                if matches!(event, OrderEventAny::Denied(_))
                    && order.status() != OrderStatus::Denied
                {
                    continue;
                }
                order.exec_algorithm_id().cloned()
            };
            let Some(exec_algorithm_id) = exec_algorithm_id else {
                continue;
            };
            let actions = match self.algorithms.get_mut(&exec_algorithm_id) {
                Some(registered) => registered.algorithm.on_order_event(&event),
                None => continue,
            };
            if !actions.is_empty() {
                debug!(%exec_algorithm_id, count = actions.len(), "Algorithm reacted to event");
                self.apply_actions(&exec_algorithm_id, actions);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::exec_algorithm::TwapAlgorithm;
    use crate::application::ports::{MockExecutionClient, TestClock};
    use crate::application::test_kit::{audusd, make_cache, make_factory};
    use crate::domain::execution_tactics::TwapParams;
    use crate::domain::order_execution::{CancelOrder, OrderSide, OrderType};
    use crate::domain::shared::{AccountId, ClientId, Quantity, Venue};
    use crate::infrastructure::MessageBus;
    use chrono::{Duration, Utc};
    use std::collections::BTreeMap;

    struct Harness {
        kernel: TradingKernel,
        clock: Arc<TestClock>,
        bus: Arc<MessageBus>,
    }

    fn make_client(submits: usize) -> MockExecutionClient {
        let mut client = MockExecutionClient::new();
        client.expect_client_id().return_const(ClientId::new("SIM"));
        client.expect_venue().return_const(Some(Venue::new("SIM")));
        client
            .expect_account_id()
            .return_const(AccountId::new("SIM-001"));
        client
            .expect_submit_order()
            .times(submits)
            .returning(|_| Ok(()));
        client
    }

    fn make_kernel(client: MockExecutionClient) -> Harness {
        let clock = Arc::new(TestClock::new(Utc::now()));
        let bus = Arc::new(MessageBus::new());
        let mut kernel = TradingKernel::new(
            KernelConfig::default(),
            make_cache(),
            bus.clone(),
            clock.clone(),
        );
        kernel.exec_engine_mut().register_client(Arc::new(client)).unwrap();
        kernel
            .register_exec_algorithm(Box::new(TwapAlgorithm::default()))
            .unwrap();
        kernel.start().unwrap();
        Harness { kernel, clock, bus }
    }

    fn twap_submit(quantity: u64, horizon: &str, interval: &str) -> SubmitOrder {
        let params = BTreeMap::from([
            (TwapParams::HORIZON_SECS.to_string(), horizon.to_string()),
            (TwapParams::INTERVAL_SECS.to_string(), interval.to_string()),
        ]);
        let init = make_factory()
            .initialized(
                audusd().id,
                OrderSide::Buy,
                OrderType::Market,
                Quantity::from_u64(quantity),
            )
            .with_exec_algorithm(ExecAlgorithmId::new("TWAP"), params);
        SubmitOrder::new(Order::new(init), None)
    }

    #[test]
    fn plain_order_goes_through_risk_to_venue() {
        let mut h = make_kernel(make_client(1));
        let order = make_factory().market(audusd().id, OrderSide::Buy, Quantity::from_u64(100));
        let client_order_id = order.client_order_id().clone();

        h.kernel
            .execute(TradingCommand::SubmitOrder(SubmitOrder::new(order, None)));

        assert_eq!(h.kernel.risk_engine().command_count(), 1);
        assert_eq!(h.kernel.exec_engine().command_count(), 1);
        assert!(h.kernel.cache().read().order_exists(&client_order_id));
    }

    #[test]
    fn twap_primary_is_sliced_over_time() {
        let mut h = make_kernel(make_client(3));
        let submit = twap_submit(90, "3", "1");
        let primary_id = submit.order.client_order_id().clone();

        h.kernel.execute(TradingCommand::SubmitOrder(submit));
        h.clock.advance(Duration::seconds(1));
        h.kernel.on_timer();
        h.clock.advance(Duration::seconds(1));
        h.kernel.on_timer();

        let cache = h.kernel.cache().read();
        let family: Vec<String> = cache
            .orders_for_exec_spawn(&primary_id)
            .iter()
            .map(|o| o.client_order_id().to_string())
            .collect();
        assert_eq!(
            family,
            vec![
                primary_id.to_string(),
                format!("{primary_id}-E1"),
                format!("{primary_id}-E2"),
            ]
        );
        let primary = cache.order(&primary_id).unwrap();
        assert_eq!(primary.status(), OrderStatus::Initialized);
        assert_eq!(primary.quantity(), Quantity::from_u64(30));
        assert_eq!(h.kernel.risk_engine().command_count(), 3);
        assert_eq!(
            cache.exec_spawn_total_quantity(&primary_id, false),
            Some(Quantity::from_u64(90))
        );
    }

    #[test]
    fn duplicate_primary_is_denied_and_original_keeps_slicing() {
        let mut h = make_kernel(make_client(2));
        let mut events = h.bus.subscribe("events.order.*");
        let submit = twap_submit(90, "3", "1");
        let primary_id = submit.order.client_order_id().clone();

        h.kernel.execute(TradingCommand::SubmitOrder(submit.clone()));
        h.kernel.execute(TradingCommand::SubmitOrder(submit));
        h.clock.advance(Duration::seconds(1));
        h.kernel.on_timer();

        let mut denied = Vec::new();
        while let Ok(message) = events.try_recv() {
            if let BusMessage::OrderEvent(OrderEventAny::Denied(event)) = message {
                denied.push(event);
            }
        }
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].header.client_order_id, primary_id);
        assert!(denied[0].reason.contains("Duplicate ClientOrderId"));
        let cache = h.kernel.cache().read();
        assert_eq!(cache.order(&primary_id).unwrap().status(), OrderStatus::Initialized);
        assert_eq!(cache.orders_for_exec_spawn(&primary_id).len(), 3);
    }

    #[test]
    fn invalid_params_deny_primary() {
        let mut h = make_kernel(make_client(0));
        let submit = twap_submit(90, "1", "5");
        let primary_id = submit.order.client_order_id().clone();

        h.kernel.execute(TradingCommand::SubmitOrder(submit));

        let status = h.kernel.cache().read().order(&primary_id).unwrap().status();
        assert_eq!(status, OrderStatus::Denied);
    }

    #[test]
    fn unregistered_algorithm_denies_primary() {
        let mut h = make_kernel(make_client(0));
        let mut submit = twap_submit(90, "3", "1");
        let init = make_factory()
            .initialized(audusd().id, OrderSide::Buy, OrderType::Market, Quantity::from_u64(10))
            .with_exec_algorithm(ExecAlgorithmId::new("VWAP"), BTreeMap::new());
        submit.order = Order::new(init);
        let client_order_id = submit.order.client_order_id().clone();

        h.kernel.execute(TradingCommand::SubmitOrder(submit));

        let status = h.kernel.cache().read().order(&client_order_id).unwrap().status();
        assert_eq!(status, OrderStatus::Denied);
    }

    #[test]
    fn canceling_primary_stops_slicing() {
        let mut h = make_kernel(make_client(1));
        let submit = twap_submit(90, "3", "1");
        let primary_id = submit.order.client_order_id().clone();
        h.kernel.execute(TradingCommand::SubmitOrder(submit));

        let primary = h.kernel.cache().read().order(&primary_id).cloned().unwrap();
        h.kernel
            .execute(TradingCommand::CancelOrder(CancelOrder::new(&primary)));
        h.clock.advance(Duration::seconds(5));
        h.kernel.on_timer();

        let cache = h.kernel.cache().read();
        assert_eq!(cache.order(&primary_id).unwrap().status(), OrderStatus::Canceled);
        assert_eq!(cache.orders_for_exec_spawn(&primary_id).len(), 2);
    }

    #[test]
    fn duplicate_algorithm_registration_fails() {
        let mut h = make_kernel(make_client(0));
        let result = h
            .kernel
            .register_exec_algorithm(Box::new(TwapAlgorithm::default()));
        assert!(matches!(result, Err(DomainError::Duplicate { .. })));
    }

    #[test]
    fn lifecycle_runs_engines() {
        let mut h = make_kernel(make_client(0));
        assert!(h.kernel.risk_engine().state().is_running());
        assert!(h.kernel.exec_engine().state().is_running());

        h.kernel.stop().unwrap();
        assert_eq!(h.kernel.state(), ComponentState::Stopped);
        assert!(h.kernel.start().is_ok());
        assert!(h.kernel.start().is_err());
    }
}
