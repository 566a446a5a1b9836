//! Order status in the lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status driven only by applied order events.
///
/// ```text
/// INITIALIZED → DENIED
///             → EMULATED → RELEASED → SUBMITTED
///             → SUBMITTED → REJECTED | ACCEPTED
/// ACCEPTED → TRIGGERED | PENDING_UPDATE | PENDING_CANCEL
///          → PARTIALLY_FILLED ⇄ … → FILLED | CANCELED | EXPIRED
/// CANCELED | EXPIRED → (PARTIALLY_)FILLED on a late fill
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created by a factory, not yet submitted anywhere.
    #[default]
    Initialized,
    /// Denied before submission (risk or engine validation).
    Denied,
    /// Held locally by the engine until a contingency releases it.
    Emulated,
    /// Released from local holding, about to be submitted.
    Released,
    /// Handed to the venue, awaiting acknowledgement.
    Submitted,
    /// Acknowledged by the venue and working.
    Accepted,
    /// Declined by the venue.
    Rejected,
    /// Canceled.
    Canceled,
    /// Expired (e.g. GTD or DAY order past its validity).
    Expired,
    /// Stop or touch condition reached at the venue.
    Triggered,
    /// Amend request in flight.
    PendingUpdate,
    /// Cancel request in flight.
    PendingCancel,
    /// Some quantity filled, remainder working.
    PartiallyFilled,
    /// Completely filled.
    Filled,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::Denied | Self::Rejected | Self::Canceled | Self::Expired | Self::Filled
        )
    }

    /// Returns true if the order is working (locally held or at the venue).
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(
            self,
            Self::Emulated
                | Self::Released
                | Self::Accepted
                | Self::Triggered
                | Self::PendingUpdate
                | Self::PendingCancel
                | Self::PartiallyFilled
        )
    }

    /// Returns true while a request to the venue awaits its acknowledgement.
    #[must_use]
    pub const fn is_inflight(&self) -> bool {
        matches!(
            self,
            Self::Submitted | Self::PendingUpdate | Self::PendingCancel
        )
    }

    /// Returns true if the order is held by the engine and unknown to any venue.
    #[must_use]
    pub const fn is_active_local(&self) -> bool {
        matches!(self, Self::Emulated | Self::Released)
    }

    /// Returns true if the order can still be canceled.
    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        !self.is_closed() && !matches!(self, Self::PendingCancel)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initialized => "INITIALIZED",
            Self::Denied => "DENIED",
            Self::Emulated => "EMULATED",
            Self::Released => "RELEASED",
            Self::Submitted => "SUBMITTED",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Canceled => "CANCELED",
            Self::Expired => "EXPIRED",
            Self::Triggered => "TRIGGERED",
            Self::PendingUpdate => "PENDING_UPDATE",
            Self::PendingCancel => "PENDING_CANCEL",
            Self::PartiallyFilled => "PARTIALLY_FILLED",
            Self::Filled => "FILLED",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_is_closed() {
        assert!(!OrderStatus::Initialized.is_closed());
        assert!(!OrderStatus::Accepted.is_closed());
        assert!(!OrderStatus::PartiallyFilled.is_closed());
        assert!(OrderStatus::Denied.is_closed());
        assert!(OrderStatus::Filled.is_closed());
        assert!(OrderStatus::Canceled.is_closed());
        assert!(OrderStatus::Rejected.is_closed());
        assert!(OrderStatus::Expired.is_closed());
    }

    #[test]
    fn open_and_closed_are_disjoint() {
        for status in [
            OrderStatus::Initialized,
            OrderStatus::Denied,
            OrderStatus::Emulated,
            OrderStatus::Released,
            OrderStatus::Submitted,
            OrderStatus::Accepted,
            OrderStatus::Rejected,
            OrderStatus::Canceled,
            OrderStatus::Expired,
            OrderStatus::Triggered,
            OrderStatus::PendingUpdate,
            OrderStatus::PendingCancel,
            OrderStatus::PartiallyFilled,
            OrderStatus::Filled,
        ] {
            assert!(!(status.is_open() && status.is_closed()), "{status}");
        }
    }

    #[test]
    fn order_status_inflight() {
        assert!(OrderStatus::Submitted.is_inflight());
        assert!(OrderStatus::PendingCancel.is_inflight());
        assert!(!OrderStatus::Accepted.is_inflight());
    }

    #[test]
    fn order_status_display_matches_serde() {
        let status = OrderStatus::PartiallyFilled;
        assert_eq!(format!("{status}"), "PARTIALLY_FILLED");
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            "\"PARTIALLY_FILLED\""
        );
    }
}
