//! Risk Engine
//!
//! Pre-trade gate in front of the execution engine. Submits pass, in order:
//! the trading-state gate, the duplicate ID check, then instrument, price,
//! quantity, notional, balance and position checks, then the submit
//! throttler. The first failure denies the order; nothing reaches a venue.
//!
//! With `bypass` set, only the trading-state gate and the duplicate check
//! run.

mod checks;

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

pub use checks::CheckFailure;

use crate::application::cache::SharedCache;
use crate::application::component::{ComponentState, ComponentTrigger};
use crate::application::execution_engine::{ExecutionGateway, is_primary_resubmission};
use crate::application::ports::{BusMessage, Clock, EventBus, topics};
use crate::domain::order_execution::{
    ModifyOrder, Order, OrderEventBuilder, SubmitOrder, SubmitOrderList, TradingCommand,
};
use crate::domain::risk_management::{RateLimit, Throttler, TradingState, TradingStateChanged};
use crate::domain::shared::{Currency, DomainError, InstrumentId, Money, PositionId, TraderId};
use crate::observability::{record_command, record_denial, record_trading_state};

use checks::{
    CheckResult, balance_impact, check_balance, check_notional, check_order_prices, check_price,
    check_position_open, check_quantity, check_reduce_only, check_reducing, check_trading_state,
};

/// Risk engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskEngineConfig {
    /// Skip every check except the trading-state gate and duplicate IDs.
    pub bypass: bool,
    /// Submit budget, `<limit>/<HH:MM:SS>`.
    pub max_order_submit_rate: RateLimit,
    /// Modify budget, `<limit>/<HH:MM:SS>`.
    pub max_order_modify_rate: RateLimit,
    /// Largest notional allowed for a single order, per instrument.
    pub max_notional_per_order: HashMap<InstrumentId, Decimal>,
    /// Forward cancels while `HALTED`.
    pub allow_cancels_when_halted: bool,
    /// Deny commands referencing a position that is not open.
    pub check_position_exists: bool,
    /// Log every command at debug level.
    pub debug: bool,
}

impl Default for RiskEngineConfig {
    fn default() -> Self {
        Self {
            bypass: false,
            max_order_submit_rate: RateLimit::default(),
            max_order_modify_rate: RateLimit::default(),
            max_notional_per_order: HashMap::new(),
            allow_cancels_when_halted: true,
            check_position_exists: true,
            debug: false,
        }
    }
}

/// Pre-trade risk gate.
pub struct RiskEngine {
    trader_id: TraderId,
    config: RiskEngineConfig,
    state: ComponentState,
    trading_state: TradingState,
    cache: SharedCache,
    bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    submit_throttler: Throttler,
    modify_throttler: Throttler,
    max_notional_per_order: HashMap<InstrumentId, Decimal>,
    command_count: u64,
    denied_count: u64,
}

impl std::fmt::Debug for RiskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskEngine")
            .field("state", &self.state)
            .field("trading_state", &self.trading_state)
            .field("bypass", &self.config.bypass)
            .field("command_count", &self.command_count)
            .field("denied_count", &self.denied_count)
            .finish_non_exhaustive()
    }
}

impl RiskEngine {
    /// Create a `READY` engine in the `ACTIVE` trading state.
    pub fn new(
        trader_id: TraderId,
        config: RiskEngineConfig,
        cache: SharedCache,
        bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if config.bypass {
            warn!("Risk engine bypassed: pre-trade checks disabled");
        }
        Self {
            trader_id,
            submit_throttler: Throttler::new(config.max_order_submit_rate),
            modify_throttler: Throttler::new(config.max_order_modify_rate),
            max_notional_per_order: config.max_notional_per_order.clone(),
            config,
            state: ComponentState::Ready,
            trading_state: TradingState::Active,
            cache,
            bus,
            clock,
            command_count: 0,
            denied_count: 0,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Engine settings.
    #[must_use]
    pub const fn config(&self) -> &RiskEngineConfig {
        &self.config
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ComponentState {
        self.state
    }

    /// Current trading state.
    #[must_use]
    pub const fn trading_state(&self) -> TradingState {
        self.trading_state
    }

    /// Returns true if pre-trade checks are disabled.
    #[must_use]
    pub const fn is_bypassed(&self) -> bool {
        self.config.bypass
    }

    /// Commands received.
    #[must_use]
    pub const fn command_count(&self) -> u64 {
        self.command_count
    }

    /// Orders denied.
    #[must_use]
    pub const fn denied_count(&self) -> u64 {
        self.denied_count
    }

    /// Per-order notional limit for an instrument.
    #[must_use]
    pub fn max_notional_per_order(&self, instrument_id: &InstrumentId) -> Option<Decimal> {
        self.max_notional_per_order.get(instrument_id).copied()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn transition(&mut self, trigger: ComponentTrigger) -> Result<(), DomainError> {
        self.state = self.state.transition(trigger)?;
        info!(component = "RiskEngine", state = %self.state, "Lifecycle");
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

    /// Clear counters and throttlers.
    ///
    /// # Errors
    ///
    /// Returns error unless the engine is `READY` or `STOPPED`.
    pub fn reset(&mut self) -> Result<(), DomainError> {
        self.transition(ComponentTrigger::Reset)?;
        self.submit_throttler.reset();
        self.modify_throttler.reset();
        self.command_count = 0;
        self.denied_count = 0;
        Ok(())
    }

    /// Release the engine for good.
    ///
    /// # Errors
    ///
    /// Returns error unless the engine is `READY` or `STOPPED`.
    pub fn dispose(&mut self) -> Result<(), DomainError> {
        self.transition(ComponentTrigger::Dispose)
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Change the trading state and publish the change on `events.risk`.
    pub fn set_trading_state(&mut self, state: TradingState) {
        if state == self.trading_state {
            warn!(%state, "Trading state already set");
            return;
        }
        info!(from = %self.trading_state, to = %state, "Trading state changed");
        self.trading_state = state;
        record_trading_state(state);
        let event = TradingStateChanged::new(self.trader_id.clone(), state, self.clock.now());
        self.bus
            .publish(topics::RISK, BusMessage::TradingStateChanged(event));
    }

    /// Set, or with `None` clear, the per-order notional limit for an
    /// instrument.
    pub fn set_max_notional_per_order(
        &mut self,
        instrument_id: InstrumentId,
        max_notional: Option<Decimal>,
    ) {
        match max_notional {
            Some(max) => {
                info!(%instrument_id, %max, "Set max notional per order");
                self.max_notional_per_order.insert(instrument_id, max);
            }
            None => {
                info!(%instrument_id, "Cleared max notional per order");
                self.max_notional_per_order.remove(&instrument_id);
            }
        }
    }

    // ========================================================================
    // Command Handling
    // ========================================================================

    /// Check `command` and forward it to `gateway` if it passes.
    pub fn execute(&mut self, command: TradingCommand, gateway: &mut dyn ExecutionGateway) {
        self.command_count += 1;
        record_command("risk_engine", command.command_type());
        if self.config.debug {
            debug!(?command, "Checking command");
        }

        match command {
            TradingCommand::SubmitOrder(c) => self.handle_submit_order(c, gateway),
            TradingCommand::SubmitOrderList(c) => self.handle_submit_order_list(c, gateway),
            TradingCommand::ModifyOrder(c) => self.handle_modify_order(c, gateway),
            TradingCommand::CancelOrder(_)
            | TradingCommand::CancelAllOrders(_)
            | TradingCommand::BatchCancelOrders(_) => {
                if self.trading_state == TradingState::Halted
                    && !self.config.allow_cancels_when_halted
                {
                    warn!(
                        command_type = command.command_type(),
                        "Cancel dropped: TradingState::HALTED"
                    );
                    return;
                }
                gateway.execute(command);
            }
            TradingCommand::QueryOrder(_) => gateway.execute(command),
        }
    }

    fn is_duplicate(&self, order: &Order) -> bool {
        self.cache
            .read()
            .order(order.client_order_id())
            .is_some_and(|cached| !is_primary_resubmission(cached, order))
    }

    fn handle_submit_order(&mut self, command: SubmitOrder, gateway: &mut dyn ExecutionGateway) {
        let order = &command.order;
        let position_id = command.position_id.as_ref();

        if self.is_duplicate(order) {
            self.deny_duplicate(order);
            return;
        }
        let state_check = check_trading_state(self.trading_state, &self.cache.read(), order);
        if let Err(failure) = state_check {
            self.deny_order(order, position_id, failure, gateway);
            return;
        }
        if self.config.bypass {
            gateway.execute(TradingCommand::SubmitOrder(command));
            return;
        }

        let result = self.check_submit(order, position_id);
        if let Err(failure) = result {
            self.deny_order(order, position_id, failure, gateway);
            return;
        }
        if !self.submit_throttler.try_send(self.clock.now()) {
            let failure = CheckFailure {
                check: "throttler",
                reason: "REJECTED BY THROTTLER".to_string(),
            };
            self.deny_order(order, position_id, failure, gateway);
            return;
        }
        gateway.execute(TradingCommand::SubmitOrder(command));
    }

    fn handle_submit_order_list(
        &mut self,
        command: SubmitOrderList,
        gateway: &mut dyn ExecutionGateway,
    ) {
        let orders = command.order_list.orders().to_vec();
        let position_id = command.position_id.as_ref();

        let (duplicates, fresh): (Vec<&Order>, Vec<&Order>) =
            orders.iter().partition(|order| self.is_duplicate(order));
        if !duplicates.is_empty() {
            for order in duplicates {
                self.deny_duplicate(order);
            }
            let failure = CheckFailure {
                check: "duplicate_client_order_id",
                reason: "Order list contains a duplicate ClientOrderId".to_string(),
            };
            for order in fresh {
                self.deny_order(order, position_id, failure.clone(), gateway);
            }
            return;
        }

        for order in &orders {
            let state_check = check_trading_state(self.trading_state, &self.cache.read(), order);
            if let Err(failure) = state_check {
                self.deny_list(&orders, position_id, &failure, gateway);
                return;
            }
        }
        if self.config.bypass {
            gateway.execute(TradingCommand::SubmitOrderList(command));
            return;
        }

        let result = self.check_submit_list(&orders, position_id);
        if let Err(failure) = result {
            self.deny_list(&orders, position_id, &failure, gateway);
            return;
        }
        if !self.submit_throttler.try_send(self.clock.now()) {
            let failure = CheckFailure {
                check: "throttler",
                reason: "REJECTED BY THROTTLER".to_string(),
            };
            self.deny_list(&orders, position_id, &failure, gateway);
            return;
        }
        gateway.execute(TradingCommand::SubmitOrderList(command));
    }

    fn handle_modify_order(&mut self, command: ModifyOrder, gateway: &mut dyn ExecutionGateway) {
        let client_order_id = command.client_order_id.clone();
        let Some(order) = self.cache.read().order(&client_order_id).cloned() else {
            warn!(%client_order_id, "Cannot modify order: not found");
            return;
        };

        let result = self.check_modify(&order, &command);
        if let Err(reason) = result {
            self.reject_modify(&order, &reason, gateway);
            return;
        }
        if !self.config.bypass && !self.modify_throttler.try_send(self.clock.now()) {
            self.reject_modify(&order, "Exceeded MAX_ORDER_MODIFY_RATE", gateway);
            return;
        }
        gateway.execute(TradingCommand::ModifyOrder(command));
    }

    // ========================================================================
    // Pre-Trade Checks
    // ========================================================================

    fn check_submit(&self, order: &Order, position_id: Option<&PositionId>) -> CheckResult {
        let cache = self.cache.read();
        let Some(instrument) = cache.instrument(order.instrument_id()) else {
            return Err(CheckFailure {
                check: "instrument",
                reason: format!("Instrument for {} not found", order.instrument_id()),
            });
        };
        check_order_prices(instrument, order, self.clock.now())?;
        check_quantity(instrument, order.quantity())?;

        let max = self.max_notional_per_order(&instrument.id);
        let notional = check_notional(&cache, instrument, order, max)?;
        if let Some(notional) = notional.filter(|_| !order.is_reduce_only()) {
            if let Some(required) = balance_impact(instrument, order, &notional) {
                check_balance(&cache, instrument, &required, false)?;
            }
        }

        if self.config.check_position_exists {
            check_position_open(&cache, position_id)?;
        }
        check_reduce_only(&cache, order, position_id)
    }

    fn check_submit_list(&self, orders: &[Order], position_id: Option<&PositionId>) -> CheckResult {
        let cache = self.cache.read();
        let mut cumulative: HashMap<Currency, Money> = HashMap::new();
        let mut last_instrument = None;

        for order in orders {
            let Some(instrument) = cache.instrument(order.instrument_id()) else {
                return Err(CheckFailure {
                    check: "instrument",
                    reason: format!("Instrument for {} not found", order.instrument_id()),
                });
            };
            check_order_prices(instrument, order, self.clock.now())?;
            check_quantity(instrument, order.quantity())?;

            let max = self.max_notional_per_order(&instrument.id);
            let notional = check_notional(&cache, instrument, order, max)?;
            let impact = notional
                .filter(|_| !order.is_reduce_only())
                .and_then(|notional| balance_impact(instrument, order, &notional));
            if let Some(impact) = impact {
                let currency = impact.currency().clone();
                let total = match cumulative.remove(&currency) {
                    Some(sum) => Money::new(sum.amount() + impact.amount(), currency.clone()),
                    None => impact,
                };
                cumulative.insert(currency, total);
            }
            last_instrument = Some(instrument);
        }

        if let Some(instrument) = last_instrument {
            for required in cumulative.values() {
                check_balance(&cache, instrument, required, true)?;
            }
        }
        if self.config.check_position_exists {
            check_position_open(&cache, position_id)?;
        }
        Ok(())
    }

    fn check_modify(&self, order: &Order, command: &ModifyOrder) -> Result<(), String> {
        if order.is_closed() {
            return Err(format!("Order already closed ({})", order.status()));
        }
        if order.is_pending_cancel() {
            return Err("Order already pending cancel".to_string());
        }
        let cache = self.cache.read();
        match self.trading_state {
            TradingState::Halted => {
                return Err("TradingState is HALTED: Cannot modify order".to_string());
            }
            TradingState::Reducing => {
                let increases = command.quantity.is_some_and(|q| q > order.quantity());
                if increases && check_reducing(&cache, order.instrument_id(), order.side()).is_err()
                {
                    return Err(
                        "TradingState is REDUCING and update will increase exposure".to_string(),
                    );
                }
            }
            TradingState::Active => {}
        }
        if self.config.bypass {
            return Ok(());
        }

        let Some(instrument) = cache.instrument(order.instrument_id()) else {
            return Err(format!("Instrument for {} not found", order.instrument_id()));
        };
        check_price(instrument, command.price, "price").map_err(|f| f.reason)?;
        check_price(instrument, command.trigger_price, "trigger price").map_err(|f| f.reason)?;
        if let Some(quantity) = command.quantity {
            check_quantity(instrument, quantity).map_err(|f| f.reason)?;
        }
        Ok(())
    }

    // ========================================================================
    // Denials
    // ========================================================================

    /// Deny `order`, caching it first if the strategy never submitted it
    /// before, and let the execution engine apply the denial.
    fn deny_order(
        &mut self,
        order: &Order,
        position_id: Option<&PositionId>,
        failure: CheckFailure,
        gateway: &mut dyn ExecutionGateway,
    ) {
        let client_order_id = order.client_order_id();
        let known = self.cache.read().order_exists(client_order_id);
        if !known {
            let added = self
                .cache
                .write()
                .add_order(order.clone(), position_id.cloned(), None);
            if let Err(e) = added {
                error!(%client_order_id, error = %e, "Cannot cache denied order");
                return;
            }
        }
        self.denied_count += 1;
        record_denial("risk_engine", failure.check);
        warn!(%client_order_id, check = failure.check, reason = %failure.reason, "Order denied");
        let event = OrderEventBuilder::new(order, self.clock.now()).denied(failure.reason);
        gateway.process(event);
    }

    fn deny_list(
        &mut self,
        orders: &[Order],
        position_id: Option<&PositionId>,
        failure: &CheckFailure,
        gateway: &mut dyn ExecutionGateway,
    ) {
        for order in orders {
            self.deny_order(order, position_id, failure.clone(), gateway);
        }
    }

    /// Publish a denial for an order whose client order ID is already taken.
    /// The cached order keeps its state.
    fn deny_duplicate(&mut self, order: &Order) {
        let client_order_id = order.client_order_id();
        self.denied_count += 1;
        record_denial("risk_engine", "duplicate_client_order_id");
        warn!(%client_order_id, "Duplicate ClientOrderId, order denied");
        let event = OrderEventBuilder::new(order, self.clock.now())
            .denied(format!("Duplicate ClientOrderId {client_order_id}"));
        self.bus.publish(
            &topics::order_events(order.strategy_id()),
            BusMessage::OrderEvent(event),
        );
    }

    fn reject_modify(&mut self, order: &Order, reason: &str, gateway: &mut dyn ExecutionGateway) {
        record_denial("risk_engine", "modify");
        warn!(client_order_id = %order.client_order_id(), reason, "Modify rejected");
        let event = OrderEventBuilder::new(order, self.clock.now()).modify_rejected(reason);
        gateway.process(event);
    }
}

#[cfg(test)]
mod tests;
