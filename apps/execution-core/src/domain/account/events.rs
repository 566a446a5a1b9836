//! Account Events

use serde::{Deserialize, Serialize};

use super::value_objects::{AccountBalance, AccountType, MarginBalance};
use crate::domain::shared::{AccountId, Currency, Timestamp, UUID4};

/// Balances and margins of an account as reported by its venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Account ID.
    pub account_id: AccountId,
    /// Account type.
    pub account_type: AccountType,
    /// Base currency for single-currency accounts.
    pub base_currency: Option<Currency>,
    /// Balance per currency.
    pub balances: Vec<AccountBalance>,
    /// Margin per instrument.
    pub margins: Vec<MarginBalance>,
    /// Whether the venue reported this state (as opposed to local calculation).
    pub is_reported: bool,
    /// Unique event identifier.
    pub event_id: UUID4,
    /// When the state was valid.
    pub ts_event: Timestamp,
    /// When the event object was created.
    pub ts_init: Timestamp,
}

impl AccountState {
    /// Create a reported account state with a fresh event ID.
    #[must_use]
    pub fn new(
        account_id: AccountId,
        account_type: AccountType,
        balances: Vec<AccountBalance>,
        margins: Vec<MarginBalance>,
        ts_event: Timestamp,
    ) -> Self {
        Self {
            account_id,
            account_type,
            base_currency: None,
            balances,
            margins,
            is_reported: true,
            event_id: UUID4::new_v4(),
            ts_event,
            ts_init: ts_event,
        }
    }

    /// Set the base currency.
    #[must_use]
    pub fn with_base_currency(mut self, currency: Currency) -> Self {
        self.base_currency = Some(currency);
        self
    }
}
