//! Order execution errors.

use std::fmt;

use super::value_objects::OrderStatus;

/// Errors that can occur when applying events to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// The event is not valid for the order's current status.
    InvalidStateTransition {
        /// Current order status.
        from: OrderStatus,
        /// Event type that was rejected.
        event: String,
        /// Reason for failure.
        reason: String,
    },

    /// A second `OrderInitialized` was applied.
    AlreadyInitialized {
        /// Client order ID.
        order_id: String,
    },

    /// The event (or its trade id) has already been applied.
    DuplicateEvent {
        /// Client order ID.
        order_id: String,
        /// Event or trade identifier that was seen before.
        key: String,
    },

    /// The event belongs to a different order.
    MismatchedEvent {
        /// Order the event was applied to.
        expected: String,
        /// Order the event names.
        received: String,
    },

    /// Invalid order parameters.
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },

    /// Order not found.
    NotFound {
        /// Order ID.
        order_id: String,
    },

    /// Duplicate order ID.
    DuplicateOrderId {
        /// Order ID.
        order_id: String,
    },
}

impl OrderError {
    /// Returns true for replays that should be dropped quietly.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateEvent { .. })
    }
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStateTransition {
                from,
                event,
                reason,
            } => {
                write!(f, "Invalid order state transition: {from} on {event}: {reason}")
            }
            Self::AlreadyInitialized { order_id } => {
                write!(f, "Order already initialized: {order_id}")
            }
            Self::DuplicateEvent { order_id, key } => {
                write!(f, "Duplicate event {key} for order {order_id}")
            }
            Self::MismatchedEvent { expected, received } => {
                write!(f, "Event for order {received} applied to order {expected}")
            }
            Self::InvalidParameters { field, message } => {
                write!(f, "Invalid order parameter '{field}': {message}")
            }
            Self::NotFound { order_id } => {
                write!(f, "Order not found: {order_id}")
            }
            Self::DuplicateOrderId { order_id } => {
                write!(f, "Duplicate order ID: {order_id}")
            }
        }
    }
}

impl std::error::Error for OrderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_error_invalid_state_transition_display() {
        let err = OrderError::InvalidStateTransition {
            from: OrderStatus::Initialized,
            event: "ORDER_FILLED".to_string(),
            reason: "Order must be submitted first".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("INITIALIZED"));
        assert!(msg.contains("ORDER_FILLED"));
    }

    #[test]
    fn order_error_duplicate_event_display() {
        let err = OrderError::DuplicateEvent {
            order_id: "O-1".to_string(),
            key: "E-1".to_string(),
        };
        assert!(err.is_duplicate());
        assert_eq!(format!("{err}"), "Duplicate event E-1 for order O-1");
    }

    #[test]
    fn order_error_mismatched_event_display() {
        let err = OrderError::MismatchedEvent {
            expected: "O-1".to_string(),
            received: "O-2".to_string(),
        };
        assert!(!err.is_duplicate());
        assert!(format!("{err}").contains("O-2"));
    }

    #[test]
    fn order_error_not_found_display() {
        let err = OrderError::NotFound {
            order_id: "O-404".to_string(),
        };
        assert!(format!("{err}").contains("O-404"));
    }

    #[test]
    fn order_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(OrderError::DuplicateOrderId {
            order_id: "O-1".to_string(),
        });
        assert!(err.to_string().contains("Duplicate order ID"));
    }
}
