//! Account Value Objects

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{Currency, DomainError, InstrumentId, Money};

/// Account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Fully funded account.
    #[default]
    Cash,
    /// Leveraged account with margin requirements.
    Margin,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cash => write!(f, "CASH"),
            Self::Margin => write!(f, "MARGIN"),
        }
    }
}

/// Balance of one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    total: Money,
    locked: Money,
    free: Money,
}

impl AccountBalance {
    /// Create a balance.
    ///
    /// # Errors
    ///
    /// Returns error if currencies differ or `total != locked + free`.
    pub fn new(total: Money, locked: Money, free: Money) -> Result<Self, DomainError> {
        let sum = locked.checked_add(&free)?;
        if total.currency() != sum.currency() {
            return Err(DomainError::InvalidValue {
                field: "currency".to_string(),
                message: format!("currency mismatch: {} vs {}", total.currency(), sum.currency()),
            });
        }
        if total.amount() != sum.amount() {
            return Err(DomainError::InvariantViolation {
                aggregate: "AccountBalance".to_string(),
                invariant: "total == locked + free".to_string(),
                state: format!("total={total}, locked={locked}, free={free}"),
            });
        }
        Ok(Self { total, locked, free })
    }

    /// Balance with nothing locked.
    ///
    /// # Errors
    ///
    /// Never fails for a single currency; kept fallible to share validation.
    pub fn unlocked(total: Money) -> Result<Self, DomainError> {
        let locked = Money::zero(total.currency().clone());
        Self::new(total.clone(), locked, total)
    }

    /// Total balance.
    #[must_use]
    pub const fn total(&self) -> &Money {
        &self.total
    }

    /// Balance locked by open orders or margin.
    #[must_use]
    pub const fn locked(&self) -> &Money {
        &self.locked
    }

    /// Balance available for new orders.
    #[must_use]
    pub const fn free(&self) -> &Money {
        &self.free
    }

    /// Balance currency.
    #[must_use]
    pub const fn currency(&self) -> &Currency {
        self.total.currency()
    }
}

/// Margin held for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginBalance {
    /// Instrument the margin is held for.
    pub instrument_id: InstrumentId,
    /// Initial margin.
    pub initial: Money,
    /// Maintenance margin.
    pub maintenance: Money,
}

impl MarginBalance {
    /// Create a margin balance.
    #[must_use]
    pub const fn new(instrument_id: InstrumentId, initial: Money, maintenance: Money) -> Self {
        Self {
            instrument_id,
            initial,
            maintenance,
        }
    }

    /// Sum of initial and maintenance amounts.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.initial.amount() + self.maintenance.amount()
    }
}
