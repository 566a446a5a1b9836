//! Order Execution Bounded Context
//!
//! Manages the order lifecycle from initialization to completion. Orders
//! change state only by applying events.
//!
//! # Key Concepts
//!
//! - **Order Aggregate**: holds the event history and derives filled/leaves quantities
//! - **State Machine**: the table of valid (status, event) pairs
//! - **Commands**: what strategies ask the engines to do
//! - **Events**: what venues and engines report back

pub mod aggregate;
pub mod commands;
pub mod errors;
pub mod events;
pub mod services;
pub mod value_objects;

pub use aggregate::{Order, OrderList};
pub use commands::{
    BatchCancelOrders, CancelAllOrders, CancelOrder, ModifyOrder, QueryOrder, SubmitOrder,
    SubmitOrderList, TradingCommand,
};
pub use errors::OrderError;
pub use events::{
    OrderAccepted, OrderCancelRejected, OrderCanceled, OrderDenied, OrderEmulated, OrderEventAny,
    OrderEventHeader, OrderExpired, OrderFilled, OrderInitialized, OrderModifyRejected,
    OrderPendingCancel, OrderPendingUpdate, OrderRejected, OrderReleased, OrderSubmitted,
    OrderTriggered, OrderUpdated,
};
pub use services::{OrderEventBuilder, OrderFactory, OrderStateMachine};
pub use value_objects::{
    ContingencyType, LiquiditySide, OrderSide, OrderStatus, OrderType, TimeInForce,
};
