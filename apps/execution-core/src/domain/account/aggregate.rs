//! Account Aggregate

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::events::AccountState;
use super::value_objects::{AccountBalance, AccountType, MarginBalance};
use crate::domain::shared::{AccountId, Currency, DomainError, InstrumentId, Money};

/// Account holding the latest reported balances and margins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    account_type: AccountType,
    base_currency: Option<Currency>,
    balances: HashMap<Currency, AccountBalance>,
    margins: HashMap<InstrumentId, MarginBalance>,
    events: Vec<AccountState>,
}

impl Account {
    /// Create an account from its first state.
    #[must_use]
    pub fn new(state: AccountState) -> Self {
        let mut account = Self {
            id: state.account_id.clone(),
            account_type: state.account_type,
            base_currency: state.base_currency.clone(),
            balances: HashMap::new(),
            margins: HashMap::new(),
            events: Vec::new(),
        };
        account.set_state(state);
        account
    }

    /// Account ID.
    #[must_use]
    pub const fn id(&self) -> &AccountId {
        &self.id
    }

    /// Account type.
    #[must_use]
    pub const fn account_type(&self) -> AccountType {
        self.account_type
    }

    /// Base currency, if single-currency.
    #[must_use]
    pub const fn base_currency(&self) -> Option<&Currency> {
        self.base_currency.as_ref()
    }

    /// Balance for `currency`.
    #[must_use]
    pub fn balance(&self, currency: &Currency) -> Option<&AccountBalance> {
        self.balances.get(currency)
    }

    /// Free balance for `currency`.
    #[must_use]
    pub fn balance_free(&self, currency: &Currency) -> Option<&Money> {
        self.balances.get(currency).map(AccountBalance::free)
    }

    /// Margin for `instrument_id`.
    #[must_use]
    pub fn margin(&self, instrument_id: &InstrumentId) -> Option<&MarginBalance> {
        self.margins.get(instrument_id)
    }

    /// All applied states, oldest first.
    #[must_use]
    pub fn events(&self) -> &[AccountState] {
        &self.events
    }

    /// Latest applied state.
    #[must_use]
    pub fn last_event(&self) -> Option<&AccountState> {
        self.events.last()
    }

    /// Apply a newer state. Balances and margins are replaced per currency
    /// and instrument.
    ///
    /// # Errors
    ///
    /// Returns error if the state belongs to another account.
    pub fn apply(&mut self, state: AccountState) -> Result<(), DomainError> {
        if state.account_id != self.id {
            return Err(DomainError::InvalidValue {
                field: "account_id".to_string(),
                message: format!("state for {} applied to {}", state.account_id, self.id),
            });
        }
        self.set_state(state);
        Ok(())
    }

    fn set_state(&mut self, state: AccountState) {
        for balance in &state.balances {
            self.balances.insert(balance.currency().clone(), balance.clone());
        }
        for margin in &state.margins {
            self.margins.insert(margin.instrument_id.clone(), margin.clone());
        }
        self.events.push(state);
    }
}
