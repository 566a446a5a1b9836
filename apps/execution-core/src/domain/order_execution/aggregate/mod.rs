//! Order Aggregate
//!
//! The Order aggregate is the root entity for order lifecycle management.

mod order;
mod order_list;

pub use order::Order;
pub use order_list::OrderList;
