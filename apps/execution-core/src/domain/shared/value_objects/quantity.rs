//! Quantity value object for order and position sizes.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use crate::domain::shared::DomainError;

/// Largest supported decimal precision for prices and quantities.
pub const MAX_PRECISION: u8 = 16;

/// A non-negative quantity with an explicit decimal precision.
///
/// Values are rounded to `precision` decimal places with banker's rounding
/// (midpoint to even). Equality and ordering compare the numeric value only,
/// so `1.0` and `1.00` are equal while still remembering their precision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity {
    value: Decimal,
    precision: u8,
}

impl Quantity {
    /// Zero quantity with precision 0.
    pub const ZERO: Self = Self {
        value: Decimal::ZERO,
        precision: 0,
    };

    /// Create a quantity rounded to `precision` decimal places.
    ///
    /// # Errors
    ///
    /// Returns error if the value is negative or the precision is out of range.
    pub fn new(value: Decimal, precision: u8) -> Result<Self, DomainError> {
        if precision > MAX_PRECISION {
            return Err(DomainError::InvalidValue {
                field: "quantity".to_string(),
                message: format!("precision {precision} exceeds maximum {MAX_PRECISION}"),
            });
        }
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::InvalidValue {
                field: "quantity".to_string(),
                message: format!("quantity must not be negative, was {value}"),
            });
        }
        let mut value = value.round_dp_with_strategy(
            u32::from(precision),
            RoundingStrategy::MidpointNearestEven,
        );
        value.rescale(u32::from(precision));
        Ok(Self { value, precision })
    }

    /// Create a quantity whose precision is the scale of `value`.
    ///
    /// # Errors
    ///
    /// Returns error if the value is negative or carries too many decimals.
    pub fn from_decimal(value: Decimal) -> Result<Self, DomainError> {
        let precision = u8::try_from(value.scale()).unwrap_or(u8::MAX);
        Self::new(value, precision)
    }

    /// Create a whole-unit quantity.
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self {
            value: Decimal::from(value),
            precision: 0,
        }
    }

    /// Zero quantity with the given precision.
    #[must_use]
    pub fn zero(precision: u8) -> Self {
        let mut value = Decimal::ZERO;
        value.rescale(u32::from(precision.min(MAX_PRECISION)));
        Self {
            value,
            precision: precision.min(MAX_PRECISION),
        }
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

    /// Returns true if this quantity is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Returns true if this quantity is positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }

    /// Subtract, clamping the result at zero.
    #[must_use]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        let precision = self.precision.max(rhs.precision);
        let value = (self.value - rhs.value).max(Decimal::ZERO);
        Self::with_precision(value, precision)
    }

    /// Subtract, returning `None` when the result would be negative.
    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        let value = self.value - rhs.value;
        (value >= Decimal::ZERO)
            .then(|| Self::with_precision(value, self.precision.max(rhs.precision)))
    }

    /// The smaller of two quantities.
    #[must_use]
    pub fn min_of(self, other: Self) -> Self {
        if other < self { other } else { self }
    }

    /// Validate quantity for order submission.
    ///
    /// # Errors
    ///
    /// Returns error if the quantity is zero.
    pub fn validate_for_order(&self) -> Result<(), DomainError> {
        if !self.is_positive() {
            return Err(DomainError::InvalidValue {
                field: "quantity".to_string(),
                message: "Order quantity must be positive".to_string(),
            });
        }
        Ok(())
    }

    fn with_precision(value: Decimal, precision: u8) -> Self {
        let mut value = value;
        value.rescale(u32::from(precision));
        Self { value, precision }
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl FromStr for Quantity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| DomainError::InvalidValue {
            field: "quantity".to_string(),
            message: format!("cannot parse '{s}': {e}"),
        })?;
        Self::from_decimal(value)
    }
}

impl TryFrom<String> for Quantity {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quantity> for String {
    fn from(value: Quantity) -> Self {
        value.to_string()
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Quantity {}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.normalize().hash(state);
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::with_precision(self.value + rhs.value, self.precision.max(rhs.precision))
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}
