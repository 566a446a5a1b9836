//! Builders for events about an existing order.
//!
//! Used by the engines to synthesize local events (denials, local updates and
//! cancels) and by venue adapters and tests to produce venue events.

use crate::domain::order_execution::aggregate::Order;
use crate::domain::order_execution::events::{
    OrderAccepted, OrderCancelRejected, OrderCanceled, OrderDenied, OrderEmulated, OrderEventAny,
    OrderEventHeader, OrderExpired, OrderFilled, OrderModifyRejected, OrderPendingCancel,
    OrderPendingUpdate, OrderRejected, OrderReleased, OrderSubmitted, OrderTriggered,
    OrderUpdated,
};
use crate::domain::order_execution::value_objects::LiquiditySide;
use crate::domain::shared::{
    AccountId, Currency, Price, Quantity, Timestamp, TradeId, VenueOrderId,
};

/// Builds events for one order at one timestamp.
#[derive(Debug, Clone, Copy)]
pub struct OrderEventBuilder<'a> {
    order: &'a Order,
    ts_event: Timestamp,
}

impl<'a> OrderEventBuilder<'a> {
    /// Create a builder for `order`.
    #[must_use]
    pub const fn new(order: &'a Order, ts_event: Timestamp) -> Self {
        Self { order, ts_event }
    }

    fn header(&self) -> OrderEventHeader {
        self.order.event_header(self.ts_event)
    }

    /// `OrderDenied`.
    #[must_use]
    pub fn denied(&self, reason: impl Into<String>) -> OrderEventAny {
        OrderEventAny::Denied(OrderDenied {
            header: self.header(),
            reason: reason.into(),
        })
    }

    /// `OrderEmulated`.
    #[must_use]
    pub fn emulated(&self) -> OrderEventAny {
        OrderEventAny::Emulated(OrderEmulated {
            header: self.header(),
        })
    }

    /// `OrderReleased`.
    #[must_use]
    pub fn released(&self) -> OrderEventAny {
        OrderEventAny::Released(OrderReleased {
            header: self.header(),
        })
    }

    /// `OrderSubmitted` on `account_id`.
    #[must_use]
    pub fn submitted(&self, account_id: AccountId) -> OrderEventAny {
        OrderEventAny::Submitted(OrderSubmitted {
            header: self.header().with_account_id(account_id),
        })
    }

    /// `OrderAccepted` with the venue's order ID.
    #[must_use]
    pub fn accepted(&self, venue_order_id: VenueOrderId) -> OrderEventAny {
        OrderEventAny::Accepted(OrderAccepted {
            header: self.header().with_venue_order_id(venue_order_id),
        })
    }

    /// `OrderRejected`.
    #[must_use]
    pub fn rejected(&self, reason: impl Into<String>) -> OrderEventAny {
        OrderEventAny::Rejected(OrderRejected {
            header: self.header(),
            reason: reason.into(),
        })
    }

    /// `OrderCanceled`.
    #[must_use]
    pub fn canceled(&self) -> OrderEventAny {
        OrderEventAny::Canceled(OrderCanceled {
            header: self.header(),
        })
    }

    /// `OrderExpired`.
    #[must_use]
    pub fn expired(&self) -> OrderEventAny {
        OrderEventAny::Expired(OrderExpired {
            header: self.header(),
        })
    }

    /// `OrderTriggered`.
    #[must_use]
    pub fn triggered(&self) -> OrderEventAny {
        OrderEventAny::Triggered(OrderTriggered {
            header: self.header(),
        })
    }

    /// `OrderPendingUpdate`.
    #[must_use]
    pub fn pending_update(&self) -> OrderEventAny {
        OrderEventAny::PendingUpdate(OrderPendingUpdate {
            header: self.header(),
        })
    }

    /// `OrderPendingCancel`.
    #[must_use]
    pub fn pending_cancel(&self) -> OrderEventAny {
        OrderEventAny::PendingCancel(OrderPendingCancel {
            header: self.header(),
        })
    }

    /// `OrderModifyRejected`.
    #[must_use]
    pub fn modify_rejected(&self, reason: impl Into<String>) -> OrderEventAny {
        OrderEventAny::ModifyRejected(OrderModifyRejected {
            header: self.header(),
            reason: reason.into(),
        })
    }

    /// `OrderCancelRejected`.
    #[must_use]
    pub fn cancel_rejected(&self, reason: impl Into<String>) -> OrderEventAny {
        OrderEventAny::CancelRejected(OrderCancelRejected {
            header: self.header(),
            reason: reason.into(),
        })
    }

    /// `OrderUpdated`; absent prices keep the order's current ones.
    #[must_use]
    pub fn updated(
        &self,
        quantity: Quantity,
        price: Option<Price>,
        trigger_price: Option<Price>,
    ) -> OrderEventAny {
        OrderEventAny::Updated(OrderUpdated {
            header: self.header(),
            quantity,
            price,
            trigger_price,
        })
    }

    /// `OrderFilled` for `last_qty` at `last_px`, as a taker without commission.
    #[must_use]
    pub fn filled(
        &self,
        trade_id: TradeId,
        last_qty: Quantity,
        last_px: Price,
        currency: Currency,
    ) -> OrderFilled {
        let mut header = self.header();
        if header.venue_order_id.is_none() {
            header.venue_order_id = Some(VenueOrderId::new(format!(
                "V-{}",
                self.order.client_order_id()
            )));
        }
        OrderFilled {
            header,
            trade_id,
            position_id: None,
            order_side: self.order.side(),
            order_type: self.order.order_type(),
            last_qty,
            last_px,
            currency,
            commission: None,
            liquidity_side: LiquiditySide::Taker,
        }
    }
}
