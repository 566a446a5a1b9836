//! Price value object.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use super::quantity::MAX_PRECISION;
use crate::domain::shared::DomainError;

/// A price with an explicit decimal precision.
///
/// Prices may be negative (spread instruments); positivity is a pre-trade risk
/// check, not a type invariant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Price {
    value: Decimal,
    precision: u8,
}

impl Price {
    /// Create a price rounded to `precision` decimal places (midpoint to even).
    ///
    /// # Errors
    ///
    /// Returns error if the precision is out of range.
    pub fn new(value: Decimal, precision: u8) -> Result<Self, DomainError> {
        if precision > MAX_PRECISION {
            return Err(DomainError::InvalidValue {
                field: "price".to_string(),
                message: format!("precision {precision} exceeds maximum {MAX_PRECISION}"),
            });
        }
        let mut value = value.round_dp_with_strategy(
            u32::from(precision),
            RoundingStrategy::MidpointNearestEven,
        );
        value.rescale(u32::from(precision));
        Ok(Self { value, precision })
    }

    /// Create a price whose precision is the scale of `value`.
    ///
    /// # Errors
    ///
    /// Returns error if the value carries too many decimals.
    pub fn from_decimal(value: Decimal) -> Result<Self, DomainError> {
        let precision = u8::try_from(value.scale()).unwrap_or(u8::MAX);
        Self::new(value, precision)
    }

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.value
    }

    /// Number of decimal places.
    #[must_use]
    pub const fn precision(&self) -> u8 {
        self.precision
    }

    /// Returns true if this price is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl FromStr for Price {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| DomainError::InvalidValue {
            field: "price".to_string(),
            message: format!("cannot parse '{s}': {e}"),
        })?;
        Self::from_decimal(value)
    }
}

impl TryFrom<String> for Price {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Price> for String {
    fn from(value: Price) -> Self {
        value.to_string()
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Price {}

impl Hash for Price {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.normalize().hash(state);
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_keeps_precision() {
        let price: Price = "1.00000".parse().unwrap();
        assert_eq!(price.precision(), 5);
        assert_eq!(price.to_string(), "1.00000");
    }

    #[test]
    fn price_rounds_to_precision() {
        let price = Price::new(dec!(1.000015), 5).unwrap();
        assert_eq!(price.to_string(), "1.00002");
        let price = Price::new(dec!(1.000025), 5).unwrap();
        assert_eq!(price.to_string(), "1.00002");
    }

    #[test]
    fn price_allows_negative_values() {
        let price: Price = "-0.5".parse().unwrap();
        assert!(!price.is_positive());
    }

    #[test]
    fn price_rejects_garbage() {
        assert!("abc".parse::<Price>().is_err());
    }

    #[test]
    fn price_ordering_by_value() {
        let a: Price = "1.1".parse().unwrap();
        let b: Price = "1.10".parse().unwrap();
        let c: Price = "1.2".parse().unwrap();
        assert_eq!(a, b);
        assert!(a < c);
    }
}
