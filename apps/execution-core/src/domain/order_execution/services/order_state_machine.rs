//! Order State Machine Service
//!
//! Validates status transitions driven by order events.

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::events::OrderEventAny;
use crate::domain::order_execution::value_objects::OrderStatus;

/// Order State Machine for validating transitions.
///
/// Fills resolve to `Filled` here; the order aggregate downgrades that to
/// `PartiallyFilled` when leaves remain. `Updated`, `ModifyRejected` and
/// `CancelRejected` keep the current status; the aggregate restores the
/// pre-pending status where needed.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Status the order moves to when `event` is applied in status `from`.
    ///
    /// # Errors
    ///
    /// Returns error if the event is not valid for the current status.
    #[rustfmt::skip]
    pub fn transition(from: OrderStatus, event: &OrderEventAny) -> Result<OrderStatus, OrderError> {
        use OrderEventAny as E;
        use OrderStatus as S;

        let next = match (from, event) {
            // From Initialized (external orders may skip straight to venue states)
            (S::Initialized, E::Denied(_)) => S::Denied,
            (S::Initialized, E::Emulated(_)) => S::Emulated,
            (S::Initialized, E::Released(_)) => S::Released,
            (S::Initialized, E::Submitted(_)) => S::Submitted,
            (S::Initialized, E::Rejected(_)) => S::Rejected,
            (S::Initialized, E::Accepted(_)) => S::Accepted,
            (S::Initialized, E::Canceled(_)) => S::Canceled,
            (S::Initialized, E::Expired(_)) => S::Expired,
            (S::Initialized, E::Triggered(_)) => S::Triggered,
            // Held locally
            (S::Emulated, E::Canceled(_)) => S::Canceled,
            (S::Emulated, E::Expired(_)) => S::Expired,
            (S::Emulated, E::Released(_)) => S::Released,
            (S::Released, E::Submitted(_)) => S::Submitted,
            (S::Released, E::Denied(_)) => S::Denied,
            (S::Released, E::Canceled(_)) => S::Canceled,
            // From Submitted
            (S::Submitted, E::PendingUpdate(_)) => S::PendingUpdate,
            (S::Submitted, E::PendingCancel(_)) => S::PendingCancel,
            (S::Submitted, E::Rejected(_)) => S::Rejected,
            (S::Submitted, E::Canceled(_)) => S::Canceled,
            (S::Submitted, E::Accepted(_)) => S::Accepted,
            (S::Submitted, E::Filled(_)) => S::Filled,
            // From Accepted
            (S::Accepted, E::Rejected(_)) => S::Rejected,
            (S::Accepted, E::PendingUpdate(_)) => S::PendingUpdate,
            (S::Accepted, E::PendingCancel(_)) => S::PendingCancel,
            (S::Accepted, E::Canceled(_)) => S::Canceled,
            (S::Accepted, E::Triggered(_)) => S::Triggered,
            (S::Accepted, E::Expired(_)) => S::Expired,
            (S::Accepted, E::Filled(_)) => S::Filled,
            // Late fill racing a cancel or expiry reopens the order
            (S::Canceled | S::Expired, E::Filled(_)) => S::Filled,
            // From PendingUpdate
            (S::PendingUpdate, E::Rejected(_)) => S::Rejected,
            (S::PendingUpdate, E::Accepted(_)) => S::Accepted,
            (S::PendingUpdate, E::Canceled(_)) => S::Canceled,
            (S::PendingUpdate, E::Expired(_)) => S::Expired,
            (S::PendingUpdate, E::Triggered(_)) => S::Triggered,
            (S::PendingUpdate, E::PendingUpdate(_)) => S::PendingUpdate,
            (S::PendingUpdate, E::PendingCancel(_)) => S::PendingCancel,
            (S::PendingUpdate, E::Filled(_)) => S::Filled,
            // From PendingCancel
            (S::PendingCancel, E::Rejected(_)) => S::Rejected,
            (S::PendingCancel, E::PendingCancel(_)) => S::PendingCancel,
            (S::PendingCancel, E::Canceled(_)) => S::Canceled,
            (S::PendingCancel, E::Expired(_)) => S::Expired,
            (S::PendingCancel, E::Accepted(_)) => S::Accepted,
            (S::PendingCancel, E::Filled(_)) => S::Filled,
            // From Triggered
            (S::Triggered, E::Rejected(_)) => S::Rejected,
            (S::Triggered, E::PendingUpdate(_)) => S::PendingUpdate,
            (S::Triggered, E::PendingCancel(_)) => S::PendingCancel,
            (S::Triggered, E::Canceled(_)) => S::Canceled,
            (S::Triggered, E::Expired(_)) => S::Expired,
            (S::Triggered, E::Filled(_)) => S::Filled,
            // From PartiallyFilled
            (S::PartiallyFilled, E::PendingUpdate(_)) => S::PendingUpdate,
            (S::PartiallyFilled, E::PendingCancel(_)) => S::PendingCancel,
            (S::PartiallyFilled, E::Canceled(_)) => S::Canceled,
            (S::PartiallyFilled, E::Expired(_)) => S::Expired,
            (S::PartiallyFilled, E::Filled(_)) => S::Filled,
            (S::PartiallyFilled, E::Accepted(_)) => S::Accepted,
            // Amend and cancel outcomes keep any non-terminal status
            (status, E::Updated(_) | E::ModifyRejected(_) | E::CancelRejected(_))
                if !status.is_closed() => status,
            _ => {
                return Err(OrderError::InvalidStateTransition {
                    from,
                    event: event.event_type().to_string(),
                    reason: Self::transition_error_reason(from, event),
                });
            }
        };
        Ok(next)
    }

    /// Check if an event can be applied in a given status.
    #[must_use]
    pub fn is_valid_transition(from: OrderStatus, event: &OrderEventAny) -> bool {
        Self::transition(from, event).is_ok()
    }

    /// Get a human-readable reason for an invalid transition.
    #[must_use]
    pub fn transition_error_reason(from: OrderStatus, event: &OrderEventAny) -> String {
        let event = event.event_type();
        match from {
            OrderStatus::Filled => format!("Order is already filled, cannot apply {event}"),
            OrderStatus::Canceled => format!("Order is canceled, cannot apply {event}"),
            OrderStatus::Rejected => format!("Order was rejected, cannot apply {event}"),
            OrderStatus::Denied => format!("Order was denied, cannot apply {event}"),
            OrderStatus::Expired => format!("Order has expired, cannot apply {event}"),
            OrderStatus::Initialized => format!("Order was never submitted, cannot apply {event}"),
            _ => format!("Invalid event {event} for status {from}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::events::{
        OrderAccepted, OrderCanceled, OrderDenied, OrderEventHeader, OrderFilled,
        OrderModifyRejected, OrderReleased, OrderSubmitted,
    };
    use crate::domain::order_execution::value_objects::{LiquiditySide, OrderSide, OrderType};
    use crate::domain::shared::{
        ClientOrderId, Currency, InstrumentId, Quantity, StrategyId, TradeId, TraderId,
    };
    use chrono::Utc;
    use test_case::test_case;

    fn make_header() -> OrderEventHeader {
        OrderEventHeader::new(
            TraderId::new("TESTER-000"),
            StrategyId::new("S-001"),
            InstrumentId::new("AUD/USD.SIM"),
            ClientOrderId::new("O-1"),
            Utc::now(),
        )
    }

    fn submitted() -> OrderEventAny {
        OrderEventAny::Submitted(OrderSubmitted {
            header: make_header(),
        })
    }

    fn accepted() -> OrderEventAny {
        OrderEventAny::Accepted(OrderAccepted {
            header: make_header(),
        })
    }

    fn canceled() -> OrderEventAny {
        OrderEventAny::Canceled(OrderCanceled {
            header: make_header(),
        })
    }

    fn denied() -> OrderEventAny {
        OrderEventAny::Denied(OrderDenied {
            header: make_header(),
            reason: "test".to_string(),
        })
    }

    fn released() -> OrderEventAny {
        OrderEventAny::Released(OrderReleased {
            header: make_header(),
        })
    }

    fn modify_rejected() -> OrderEventAny {
        OrderEventAny::ModifyRejected(OrderModifyRejected {
            header: make_header(),
            reason: "test".to_string(),
        })
    }

    fn filled() -> OrderEventAny {
        OrderEventAny::Filled(OrderFilled {
            header: make_header(),
            trade_id: TradeId::new("T-1"),
            position_id: None,
            order_side: OrderSide::Buy,
            order_type: OrderType::Market,
            last_qty: Quantity::from_u64(1),
            last_px: "1.0".parse().unwrap(),
            currency: Currency::new("USD"),
            commission: None,
            liquidity_side: LiquiditySide::Taker,
        })
    }

    #[test_case(OrderStatus::Initialized, submitted(), OrderStatus::Submitted ; "initialized submitted")]
    #[test_case(OrderStatus::Initialized, denied(), OrderStatus::Denied ; "initialized denied")]
    #[test_case(OrderStatus::Emulated, released(), OrderStatus::Released ; "emulated released")]
    #[test_case(OrderStatus::Released, submitted(), OrderStatus::Submitted ; "released submitted")]
    #[test_case(OrderStatus::Submitted, accepted(), OrderStatus::Accepted ; "submitted accepted")]
    #[test_case(OrderStatus::Accepted, filled(), OrderStatus::Filled ; "accepted filled")]
    #[test_case(OrderStatus::PendingCancel, filled(), OrderStatus::Filled ; "pending cancel filled")]
    #[test_case(OrderStatus::Canceled, filled(), OrderStatus::Filled ; "canceled reopened")]
    #[test_case(OrderStatus::Expired, filled(), OrderStatus::Filled ; "expired reopened")]
    #[test_case(OrderStatus::PendingUpdate, modify_rejected(), OrderStatus::PendingUpdate ; "modify rejected keeps status")]
    fn valid_transitions(from: OrderStatus, event: OrderEventAny, expected: OrderStatus) {
        assert_eq!(OrderStateMachine::transition(from, &event).unwrap(), expected);
    }

    #[test_case(OrderStatus::Initialized, filled() ; "fill before submit")]
    #[test_case(OrderStatus::Filled, canceled() ; "cancel after fill")]
    #[test_case(OrderStatus::Denied, submitted() ; "submit after deny")]
    #[test_case(OrderStatus::Emulated, submitted() ; "submit while held")]
    #[test_case(OrderStatus::Filled, modify_rejected() ; "modify rejected after fill")]
    fn invalid_transitions(from: OrderStatus, event: OrderEventAny) {
        assert!(!OrderStateMachine::is_valid_transition(from, &event));
    }

    #[test]
    fn transition_error_names_status_and_event() {
        let err = OrderStateMachine::transition(OrderStatus::Initialized, &filled()).unwrap_err();
        match err {
            OrderError::InvalidStateTransition { from, event, reason } => {
                assert_eq!(from, OrderStatus::Initialized);
                assert_eq!(event, "ORDER_FILLED");
                assert!(reason.contains("never submitted"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn transition_error_reason_terminal_states() {
        let reason = OrderStateMachine::transition_error_reason(OrderStatus::Filled, &canceled());
        assert!(reason.contains("already filled"));
    }
}
