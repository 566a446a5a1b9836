//! Integration tests for the JSON shape of commands and events.

use chrono::Utc;
use execution_core::domain::order_execution::{
    BatchCancelOrders, CancelAllOrders, CancelOrder, ContingencyType, ModifyOrder,
    OrderEventBuilder, QueryOrder, SubmitOrder, SubmitOrderList,
};
use execution_core::domain::shared::{AccountId, Currency, TradeId, VenueOrderId};
use execution_core::{
    InstrumentId, Order, OrderEventAny, OrderFactory, OrderSide, Price, Quantity, StrategyId,
    TradingCommand, TraderId,
};
use serde_json::Value;
use test_case::test_case;

fn make_factory() -> OrderFactory {
    OrderFactory::new(TraderId::new("TESTER-000"), StrategyId::new("S-001"))
}

fn px(value: &str) -> Price {
    value.parse().expect("valid price")
}

fn make_limit() -> Order {
    make_factory().limit(
        InstrumentId::new("AUD/USD.SIM"),
        OrderSide::Buy,
        Quantity::from_u64(100),
        px("0.75000"),
    )
}

fn submit_order() -> TradingCommand {
    TradingCommand::SubmitOrder(SubmitOrder::new(make_limit(), None))
}

fn submit_order_list() -> TradingCommand {
    let list = make_factory()
        .bracket(
            InstrumentId::new("AUD/USD.SIM"),
            OrderSide::Buy,
            Quantity::from_u64(100),
            px("0.70000"),
            px("0.80000"),
            ContingencyType::Ouo,
        )
        .expect("valid bracket");
    TradingCommand::SubmitOrderList(SubmitOrderList::new(
        TraderId::new("TESTER-000"),
        list,
        None,
    ))
}

fn modify_order() -> TradingCommand {
    TradingCommand::ModifyOrder(ModifyOrder::new(
        &make_limit(),
        Some(Quantity::from_u64(50)),
        Some(px("0.74000")),
        None,
    ))
}

fn cancel_order() -> TradingCommand {
    TradingCommand::CancelOrder(CancelOrder::new(&make_limit()))
}

fn cancel_all_orders() -> TradingCommand {
    TradingCommand::CancelAllOrders(CancelAllOrders::new(
        TraderId::new("TESTER-000"),
        StrategyId::new("S-001"),
        InstrumentId::new("AUD/USD.SIM"),
        Some(OrderSide::Sell),
    ))
}

fn batch_cancel_orders() -> TradingCommand {
    TradingCommand::BatchCancelOrders(BatchCancelOrders::new(
        TraderId::new("TESTER-000"),
        StrategyId::new("S-001"),
        InstrumentId::new("AUD/USD.SIM"),
        vec![CancelOrder::new(&make_limit()), CancelOrder::new(&make_limit())],
    ))
}

fn query_order() -> TradingCommand {
    TradingCommand::QueryOrder(QueryOrder::new(&make_limit()))
}

fn order_event(kind: &str) -> OrderEventAny {
    let order = make_limit();
    let builder = OrderEventBuilder::new(&order, Utc::now());
    match kind {
        "INITIALIZED" => OrderEventAny::Initialized(
            order.init_event().cloned().expect("order carries its init event"),
        ),
        "DENIED" => builder.denied("REDUCE_ONLY"),
        "EMULATED" => builder.emulated(),
        "RELEASED" => builder.released(),
        "SUBMITTED" => builder.submitted(AccountId::new("SIM-001")),
        "ACCEPTED" => builder.accepted(VenueOrderId::new("V-1")),
        "REJECTED" => builder.rejected("INSUFFICIENT_MARGIN"),
        "CANCELED" => builder.canceled(),
        "EXPIRED" => builder.expired(),
        "TRIGGERED" => builder.triggered(),
        "PENDING_UPDATE" => builder.pending_update(),
        "PENDING_CANCEL" => builder.pending_cancel(),
        "MODIFY_REJECTED" => builder.modify_rejected("ORDER_NOT_FOUND"),
        "CANCEL_REJECTED" => builder.cancel_rejected("TOO_LATE"),
        "UPDATED" => builder.updated(Quantity::from_u64(80), Some(px("0.74500")), None),
        "FILLED" => OrderEventAny::Filled(builder.filled(
            TradeId::new("T-1"),
            Quantity::from_u64(40),
            px("0.75000"),
            Currency::new("USD"),
        )),
        other => panic!("no event kind {other}"),
    }
}

#[test]
fn test_submit_command_survives_json() {
    let order = make_factory().limit(
        InstrumentId::new("AUD/USD.SIM"),
        OrderSide::Buy,
        Quantity::from_u64(100),
        "0.75000".parse::<Price>().expect("valid price"),
    );
    let command = TradingCommand::SubmitOrder(SubmitOrder::new(order, None));

    let json = serde_json::to_string(&command).expect("serializes");
    let back: TradingCommand = serde_json::from_str(&json).expect("deserializes");

    assert_eq!(back, command);
    let value: Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["type"], "SUBMIT_ORDER");
}

#[test]
fn test_fill_event_carries_screaming_snake_tags() {
    let order = make_factory().market(
        InstrumentId::new("AUD/USD.SIM"),
        OrderSide::Sell,
        Quantity::from_u64(10),
    );
    let fill = OrderEventAny::Filled(OrderEventBuilder::new(&order, Utc::now()).filled(
        TradeId::new("T-1"),
        Quantity::from_u64(10),
        "0.75000".parse::<Price>().expect("valid price"),
        Currency::new("USD"),
    ));

    let value = serde_json::to_value(&fill).expect("serializes");

    assert_eq!(value["type"], "FILLED");
    assert_eq!(value["order_side"], "SELL");
    assert_eq!(value["liquidity_side"], "TAKER");
    let back: OrderEventAny = serde_json::from_value(value).expect("deserializes");
    assert_eq!(back, fill);
}

#[test]
fn test_cancel_command_keeps_target_ids() {
    let order = make_factory().market(
        InstrumentId::new("AUD/USD.SIM"),
        OrderSide::Buy,
        Quantity::from_u64(10),
    );
    let command = TradingCommand::CancelOrder(CancelOrder::new(&order));

    let value = serde_json::to_value(&command).expect("serializes");

    assert_eq!(value["type"], "CANCEL_ORDER");
    assert_eq!(
        value["client_order_id"],
        order.client_order_id().to_string().as_str()
    );
}

#[test_case(submit_order, "SUBMIT_ORDER" ; "submit order")]
#[test_case(submit_order_list, "SUBMIT_ORDER_LIST" ; "submit order list")]
#[test_case(modify_order, "MODIFY_ORDER" ; "modify order")]
#[test_case(cancel_order, "CANCEL_ORDER" ; "cancel order")]
#[test_case(cancel_all_orders, "CANCEL_ALL_ORDERS" ; "cancel all orders")]
#[test_case(batch_cancel_orders, "BATCH_CANCEL_ORDERS" ; "batch cancel orders")]
#[test_case(query_order, "QUERY_ORDER" ; "query order")]
fn test_every_command_round_trips(make: fn() -> TradingCommand, tag: &str) {
    let command = make();

    let json = serde_json::to_string(&command).expect("serializes");
    let back: TradingCommand = serde_json::from_str(&json).expect("deserializes");

    assert_eq!(back, command);
    let value: Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["type"], tag);
}

#[test_case("INITIALIZED")]
#[test_case("DENIED")]
#[test_case("EMULATED")]
#[test_case("RELEASED")]
#[test_case("SUBMITTED")]
#[test_case("ACCEPTED")]
#[test_case("REJECTED")]
#[test_case("CANCELED")]
#[test_case("EXPIRED")]
#[test_case("TRIGGERED")]
#[test_case("PENDING_UPDATE")]
#[test_case("PENDING_CANCEL")]
#[test_case("MODIFY_REJECTED")]
#[test_case("CANCEL_REJECTED")]
#[test_case("UPDATED")]
#[test_case("FILLED")]
fn test_every_order_event_round_trips(kind: &str) {
    let event = order_event(kind);

    let json = serde_json::to_string(&event).expect("serializes");
    let back: OrderEventAny = serde_json::from_str(&json).expect("deserializes");

    assert_eq!(back, event);
    let value: Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["type"], kind);
}
