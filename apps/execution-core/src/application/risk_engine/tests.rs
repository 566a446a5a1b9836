use std::sync::Arc;

use chrono::Utc;
use rust_decimal_macros::dec;
use test_case::test_case;

use super::*;
use crate::application::cache::SharedCache;
use crate::application::execution_engine::MockExecutionGateway;
use crate::application::ports::TestClock;
use crate::application::test_kit::{RecordingBus, audusd, make_cache, make_factory};
use crate::domain::account::{Account, AccountBalance, AccountState, AccountType};
use crate::domain::order_execution::{
    CancelOrder, ContingencyType, OrderEventAny, OrderFactory, OrderSide, OrderType,
};
use crate::domain::position_management::{OmsType, Position};
use crate::domain::reference_data::PriceType;
use crate::domain::shared::{AccountId, Price, Quantity, TradeId};

struct Harness {
    engine: RiskEngine,
    cache: SharedCache,
    bus: Arc<RecordingBus>,
    clock: Arc<TestClock>,
    factory: OrderFactory,
}

fn make_harness(config: RiskEngineConfig) -> Harness {
    let cache = make_cache();
    let bus = Arc::new(RecordingBus::default());
    let clock = Arc::new(TestClock::new(Utc::now()));
    let mut engine = RiskEngine::new(
        TraderId::new("TESTER-000"),
        config,
        Arc::clone(&cache),
        bus.clone(),
        clock.clone(),
    );
    engine.start().unwrap();
    Harness {
        engine,
        cache,
        bus,
        clock,
        factory: make_factory(),
    }
}

fn default_harness() -> Harness {
    make_harness(RiskEngineConfig::default())
}

fn qty(value: u64) -> Quantity {
    Quantity::from_u64(value)
}

fn px(value: &str) -> Price {
    value.parse().unwrap()
}

/// Gateway expecting exactly one forwarded command and no events.
fn expect_forwarded() -> MockExecutionGateway {
    let mut gateway = MockExecutionGateway::new();
    gateway.expect_execute().times(1).return_const(());
    gateway.expect_process().never();
    gateway
}

/// Gateway expecting one denial with `reason` and nothing forwarded.
fn expect_denied(reason: &'static str) -> MockExecutionGateway {
    let mut gateway = MockExecutionGateway::new();
    gateway.expect_execute().never();
    gateway
        .expect_process()
        .withf(move |event| matches!(event, OrderEventAny::Denied(d) if d.reason == reason))
        .times(1)
        .return_const(());
    gateway
}

/// Gateway expecting one denial whose reason starts with `prefix`.
fn expect_denied_prefix(prefix: &'static str) -> MockExecutionGateway {
    let mut gateway = MockExecutionGateway::new();
    gateway.expect_execute().never();
    gateway
        .expect_process()
        .withf(move |event| matches!(event, OrderEventAny::Denied(d) if d.reason.starts_with(prefix)))
        .times(1)
        .return_const(());
    gateway
}

impl Harness {
    fn market(&mut self, side: OrderSide, quantity: u64) -> Order {
        self.factory
            .market(audusd().id, side, qty(quantity))
    }

    fn limit(&mut self, side: OrderSide, quantity: u64, price: &str) -> Order {
        self.factory
            .limit(audusd().id, side, qty(quantity), px(price))
    }

    fn submit(&mut self, order: Order, gateway: &mut MockExecutionGateway) {
        let command = TradingCommand::SubmitOrder(SubmitOrder::new(order, None));
        self.engine.execute(command, gateway);
    }

    /// Put an open netting position of `quantity` on `side` into the cache.
    fn open_position(&mut self, side: OrderSide, quantity: u64) -> PositionId {
        let order = self.market(side, quantity);
        let position_id = PositionId::new("AUD/USD.SIM-S-001");
        let mut fill = OrderEventBuilder::new(&order, Utc::now()).filled(
            TradeId::new("T-1"),
            qty(quantity),
            px("1.00000"),
            Currency::new("USD"),
        );
        fill.position_id = Some(position_id.clone());
        let position = Position::new(&audusd(), &fill).unwrap();
        self.cache
            .write()
            .add_position(position, OmsType::Netting)
            .unwrap();
        position_id
    }

    fn add_cash_account(&self, usd_free: Decimal) {
        let usd = Currency::new("USD");
        let balance = AccountBalance::new(
            Money::new(usd_free, usd.clone()),
            Money::new(Decimal::ZERO, usd.clone()),
            Money::new(usd_free, usd),
        )
        .unwrap();
        let state = AccountState::new(
            AccountId::new("SIM-001"),
            AccountType::Cash,
            vec![balance],
            Vec::new(),
            Utc::now(),
        );
        self.cache.write().add_account(Account::new(state)).unwrap();
    }
}

// ============================================================================
// Submit
// ============================================================================

#[test]
fn valid_order_is_forwarded() {
    let mut h = default_harness();
    let order = h.limit(OrderSide::Buy, 100_000, "1.00000");

    h.submit(order, &mut expect_forwarded());

    assert_eq!(h.engine.command_count(), 1);
    assert_eq!(h.engine.denied_count(), 0);
}

#[test]
fn denied_order_is_cached_before_denial() {
    let mut h = default_harness();
    h.engine.set_trading_state(TradingState::Halted);
    let order = h.market(OrderSide::Buy, 100);
    let id = order.client_order_id().clone();

    h.submit(order, &mut expect_denied("TradingState::HALTED"));

    assert!(h.cache.read().order_exists(&id));
    assert_eq!(h.engine.denied_count(), 1);
}

#[test]
fn unknown_instrument_is_denied() {
    let mut h = default_harness();
    let order = h
        .factory
        .market(InstrumentId::new("EUR/USD.SIM"), OrderSide::Buy, qty(100));

    h.submit(order, &mut expect_denied("Instrument for EUR/USD.SIM not found"));
}

#[test]
fn price_with_too_many_decimals_is_denied() {
    let mut h = default_harness();
    let order = h.limit(OrderSide::Buy, 100, "1.000001");

    h.submit(order, &mut expect_denied("price 1.000001 invalid (precision 6 > 5)"));
}

#[test]
fn quantity_above_instrument_maximum_is_denied() {
    let mut h = default_harness();
    h.cache
        .write()
        .add_instrument(audusd().with_quantity_limits(None, Some(qty(1_000_000))));
    let order = h.market(OrderSide::Buy, 2_000_000);

    h.submit(
        order,
        &mut expect_denied("quantity 2000000 invalid (> maximum trade size of 1000000)"),
    );
}

#[test]
fn notional_above_per_order_max_is_denied() {
    let mut h = default_harness();
    h.engine
        .set_max_notional_per_order(audusd().id, Some(dec!(50000)));
    let order = h.limit(OrderSide::Buy, 100_000, "1.00000");

    h.submit(order, &mut expect_denied_prefix("NOTIONAL_EXCEEDS_MAX_PER_ORDER"));
}

#[test]
fn market_order_without_price_skips_notional_check() {
    let mut h = default_harness();
    h.engine
        .set_max_notional_per_order(audusd().id, Some(dec!(1)));
    let order = h.market(OrderSide::Buy, 100_000);

    h.submit(order, &mut expect_forwarded());
}

#[test]
fn market_order_valued_at_ask() {
    let mut h = default_harness();
    h.engine
        .set_max_notional_per_order(audusd().id, Some(dec!(50000)));
    h.cache
        .write()
        .add_price(audusd().id, PriceType::Ask, px("1.00010"));
    let order = h.market(OrderSide::Buy, 100_000);

    h.submit(order, &mut expect_denied_prefix("NOTIONAL_EXCEEDS_MAX_PER_ORDER"));
}

#[test]
fn notional_above_free_balance_is_denied() {
    let mut h = default_harness();
    h.add_cash_account(dec!(10000));
    let order = h.limit(OrderSide::Buy, 100_000, "1.00000");

    h.submit(order, &mut expect_denied_prefix("NOTIONAL_EXCEEDS_FREE_BALANCE"));
}

#[test]
fn notional_within_free_balance_is_forwarded() {
    let mut h = default_harness();
    h.add_cash_account(dec!(1000000));
    let order = h.limit(OrderSide::Buy, 100_000, "1.00000");

    h.submit(order, &mut expect_forwarded());
}

#[test]
fn reference_to_closed_position_is_denied() {
    let mut h = default_harness();
    let order = h.market(OrderSide::Buy, 100);
    let command = SubmitOrder::new(order, Some(PositionId::new("P-404")));

    h.engine.execute(
        TradingCommand::SubmitOrder(command),
        &mut expect_denied("Position P-404 not open"),
    );
}

#[test]
fn reduce_only_that_would_increase_position_is_denied() {
    let mut h = default_harness();
    h.open_position(OrderSide::Buy, 100);
    let mut init = h
        .factory
        .initialized(audusd().id, OrderSide::Buy, OrderType::Market, qty(50));
    init.reduce_only = true;

    h.submit(
        Order::new(init),
        &mut expect_denied_prefix("Reduce only order would increase position"),
    );
}

#[test]
fn throttled_submit_is_denied() {
    let rate = RateLimit::new(1, std::time::Duration::from_secs(1)).unwrap();
    let mut h = make_harness(RiskEngineConfig {
        max_order_submit_rate: rate,
        ..RiskEngineConfig::default()
    });
    let first = h.market(OrderSide::Buy, 100);
    let second = h.market(OrderSide::Buy, 100);

    h.submit(first, &mut expect_forwarded());
    h.submit(second, &mut expect_denied("REJECTED BY THROTTLER"));

    h.clock.advance(chrono::Duration::seconds(2));
    let third = h.market(OrderSide::Buy, 100);
    h.submit(third, &mut expect_forwarded());
}

// ============================================================================
// Trading State
// ============================================================================

#[test]
fn reducing_denies_orders_adding_to_position() {
    let mut h = default_harness();
    h.open_position(OrderSide::Buy, 100_000);
    h.engine.set_trading_state(TradingState::Reducing);

    let buy = h.market(OrderSide::Buy, 100);
    h.submit(
        buy,
        &mut expect_denied("BUY when TradingState::REDUCING and LONG AUD/USD.SIM"),
    );

    let sell = h.market(OrderSide::Sell, 100);
    h.submit(sell, &mut expect_forwarded());
}

#[test]
fn set_trading_state_publishes_once() {
    let mut h = default_harness();

    h.engine.set_trading_state(TradingState::Halted);
    h.engine.set_trading_state(TradingState::Halted);

    assert_eq!(h.engine.trading_state(), TradingState::Halted);
    assert_eq!(h.bus.topics(), vec![topics::RISK.to_string()]);
}

#[test]
fn cancels_pass_when_halted_by_default() {
    let mut h = default_harness();
    let order = h.market(OrderSide::Buy, 100);
    h.engine.set_trading_state(TradingState::Halted);

    let command = TradingCommand::CancelOrder(CancelOrder::new(&order));
    h.engine.execute(command, &mut expect_forwarded());
}

#[test]
fn cancels_dropped_when_halted_and_disallowed() {
    let mut h = make_harness(RiskEngineConfig {
        allow_cancels_when_halted: false,
        ..RiskEngineConfig::default()
    });
    let order = h.market(OrderSide::Buy, 100);
    h.engine.set_trading_state(TradingState::Halted);

    let mut gateway = MockExecutionGateway::new();
    gateway.expect_execute().never();
    gateway.expect_process().never();
    let command = TradingCommand::CancelOrder(CancelOrder::new(&order));
    h.engine.execute(command, &mut gateway);
}

// ============================================================================
// Duplicates and Bypass
// ============================================================================

#[test]
fn duplicate_is_denied_without_touching_original() {
    let mut h = default_harness();
    let order = h.market(OrderSide::Buy, 100);
    let id = order.client_order_id().clone();
    h.cache.write().add_order(order.clone(), None, None).unwrap();

    let mut gateway = MockExecutionGateway::new();
    gateway.expect_execute().never();
    gateway.expect_process().never();
    h.submit(order, &mut gateway);

    let denials: Vec<_> = h
        .bus
        .order_events()
        .into_iter()
        .filter(|e| matches!(e, OrderEventAny::Denied(_)))
        .collect();
    assert_eq!(denials.len(), 1);
    let cached = h.cache.read().order(&id).cloned().unwrap();
    assert_eq!(cached.status(), crate::domain::order_execution::OrderStatus::Initialized);
    assert_eq!(h.engine.denied_count(), 1);
}

#[test_case(TradingState::Halted ; "halted")]
#[test_case(TradingState::Reducing ; "reducing")]
fn duplicate_is_denied_as_duplicate_in_any_trading_state(state: TradingState) {
    let mut h = default_harness();
    let order = h.market(OrderSide::Buy, 100);
    let id = order.client_order_id().clone();
    h.cache.write().add_order(order.clone(), None, None).unwrap();
    h.engine.set_trading_state(state);

    let mut gateway = MockExecutionGateway::new();
    gateway.expect_execute().never();
    gateway.expect_process().never();
    h.submit(order, &mut gateway);

    let denials: Vec<_> = h
        .bus
        .order_events()
        .into_iter()
        .filter_map(|e| match e {
            OrderEventAny::Denied(d) => Some(d.reason),
            _ => None,
        })
        .collect();
    assert_eq!(denials, vec![format!("Duplicate ClientOrderId {id}")]);
    let cached = h.cache.read().order(&id).cloned().unwrap();
    assert_eq!(cached.status(), crate::domain::order_execution::OrderStatus::Initialized);
}

#[test]
fn bypass_skips_pre_trade_checks() {
    let mut h = make_harness(RiskEngineConfig {
        bypass: true,
        ..RiskEngineConfig::default()
    });
    let order = h
        .factory
        .market(InstrumentId::new("EUR/USD.SIM"), OrderSide::Buy, qty(100));

    h.submit(order, &mut expect_forwarded());
}

#[test]
fn bypass_still_enforces_trading_state() {
    let mut h = make_harness(RiskEngineConfig {
        bypass: true,
        ..RiskEngineConfig::default()
    });
    h.engine.set_trading_state(TradingState::Halted);
    let order = h.market(OrderSide::Buy, 100);

    h.submit(order, &mut expect_denied("TradingState::HALTED"));
}

// ============================================================================
// Order Lists
// ============================================================================

#[test]
fn list_over_cumulative_balance_is_denied_whole() {
    let mut h = default_harness();
    h.add_cash_account(dec!(150000));
    let first = h.limit(OrderSide::Buy, 100_000, "1.00000");
    let second = h.limit(OrderSide::Buy, 100_000, "1.00000");
    let list = h.factory.create_list(vec![first, second]).unwrap();

    let mut gateway = MockExecutionGateway::new();
    gateway.expect_execute().never();
    gateway
        .expect_process()
        .withf(|event| {
            matches!(event, OrderEventAny::Denied(d) if d.reason.starts_with("CUM_NOTIONAL_EXCEEDS_FREE_BALANCE"))
        })
        .times(2)
        .return_const(());
    let command = SubmitOrderList::new(TraderId::new("TESTER-000"), list, None);
    h.engine
        .execute(TradingCommand::SubmitOrderList(command), &mut gateway);

    assert_eq!(h.engine.denied_count(), 2);
}

#[test]
fn list_with_duplicate_denies_only_new_members() {
    let mut h = default_harness();
    let list = h
        .factory
        .bracket(
            audusd().id,
            OrderSide::Buy,
            qty(100),
            px("0.90000"),
            px("1.10000"),
            ContingencyType::Oco,
        )
        .unwrap();
    let entry = list.orders()[0].clone();
    let entry_id = entry.client_order_id().clone();
    h.cache.write().add_order(entry, None, None).unwrap();

    let mut gateway = MockExecutionGateway::new();
    gateway.expect_execute().never();
    gateway
        .expect_process()
        .withf(|event| {
            matches!(event, OrderEventAny::Denied(d) if d.reason == "Order list contains a duplicate ClientOrderId")
        })
        .times(2)
        .return_const(());
    let command = SubmitOrderList::new(TraderId::new("TESTER-000"), list, None);
    h.engine
        .execute(TradingCommand::SubmitOrderList(command), &mut gateway);

    let cached = h.cache.read().order(&entry_id).cloned().unwrap();
    assert_eq!(cached.status(), crate::domain::order_execution::OrderStatus::Initialized);
}

// ============================================================================
// Modify
// ============================================================================

fn expect_modify_rejected(reason: &'static str) -> MockExecutionGateway {
    let mut gateway = MockExecutionGateway::new();
    gateway.expect_execute().never();
    gateway
        .expect_process()
        .withf(move |event| matches!(event, OrderEventAny::ModifyRejected(r) if r.reason == reason))
        .times(1)
        .return_const(());
    gateway
}

#[test]
fn modify_of_unknown_order_is_dropped() {
    let mut h = default_harness();
    let order = h.limit(OrderSide::Buy, 100, "1.00000");

    let mut gateway = MockExecutionGateway::new();
    gateway.expect_execute().never();
    gateway.expect_process().never();
    let command = ModifyOrder::new(&order, Some(qty(200)), None, None);
    h.engine
        .execute(TradingCommand::ModifyOrder(command), &mut gateway);
}

#[test]
fn valid_modify_is_forwarded() {
    let mut h = default_harness();
    let order = h.limit(OrderSide::Buy, 100, "1.00000");
    h.cache.write().add_order(order.clone(), None, None).unwrap();

    let command = ModifyOrder::new(&order, Some(qty(200)), Some(px("0.99000")), None);
    h.engine
        .execute(TradingCommand::ModifyOrder(command), &mut expect_forwarded());
}

#[test]
fn modify_when_halted_is_rejected() {
    let mut h = default_harness();
    let order = h.limit(OrderSide::Buy, 100, "1.00000");
    h.cache.write().add_order(order.clone(), None, None).unwrap();
    h.engine.set_trading_state(TradingState::Halted);

    let command = ModifyOrder::new(&order, Some(qty(200)), None, None);
    h.engine.execute(
        TradingCommand::ModifyOrder(command),
        &mut expect_modify_rejected("TradingState is HALTED: Cannot modify order"),
    );
}

#[test]
fn modify_increasing_exposure_when_reducing_is_rejected() {
    let mut h = default_harness();
    h.open_position(OrderSide::Buy, 100_000);
    let order = h.limit(OrderSide::Buy, 100, "1.00000");
    h.cache.write().add_order(order.clone(), None, None).unwrap();
    h.engine.set_trading_state(TradingState::Reducing);

    let command = ModifyOrder::new(&order, Some(qty(200)), None, None);
    h.engine.execute(
        TradingCommand::ModifyOrder(command),
        &mut expect_modify_rejected("TradingState is REDUCING and update will increase exposure"),
    );
}

#[test]
fn modify_with_invalid_price_is_rejected() {
    let mut h = default_harness();
    let order = h.limit(OrderSide::Buy, 100, "1.00000");
    h.cache.write().add_order(order.clone(), None, None).unwrap();

    let command = ModifyOrder::new(&order, None, Some(px("1.000001")), None);
    h.engine.execute(
        TradingCommand::ModifyOrder(command),
        &mut expect_modify_rejected("price 1.000001 invalid (precision 6 > 5)"),
    );
}

#[test]
fn throttled_modify_is_rejected() {
    let rate = RateLimit::new(1, std::time::Duration::from_secs(1)).unwrap();
    let mut h = make_harness(RiskEngineConfig {
        max_order_modify_rate: rate,
        ..RiskEngineConfig::default()
    });
    let order = h.limit(OrderSide::Buy, 100, "1.00000");
    h.cache.write().add_order(order.clone(), None, None).unwrap();

    let first = ModifyOrder::new(&order, Some(qty(200)), None, None);
    h.engine
        .execute(TradingCommand::ModifyOrder(first), &mut expect_forwarded());
    let second = ModifyOrder::new(&order, Some(qty(300)), None, None);
    h.engine.execute(
        TradingCommand::ModifyOrder(second),
        &mut expect_modify_rejected("Exceeded MAX_ORDER_MODIFY_RATE"),
    );
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn reset_clears_counters() {
    let mut h = default_harness();
    let order = h.market(OrderSide::Buy, 100);
    h.submit(order, &mut expect_forwarded());

    h.engine.stop().unwrap();
    h.engine.reset().unwrap();

    assert_eq!(h.engine.state(), ComponentState::Ready);
    assert_eq!(h.engine.command_count(), 0);
}

#[test]
fn config_deserializes_rate_limits() {
    let yaml = "bypass: false\nmax_order_submit_rate: \"10/00:00:01\"\nmax_notional_per_order:\n  AUD/USD.SIM: \"1000000\"\n";
    let config: RiskEngineConfig = serde_yaml_bw::from_str(yaml).unwrap();

    assert_eq!(config.max_order_submit_rate.limit(), 10);
    assert_eq!(config.max_order_modify_rate, RateLimit::default());
    assert_eq!(
        config.max_notional_per_order.get(&audusd().id),
        Some(&dec!(1000000))
    );
    assert!(config.allow_cancels_when_halted);
}
