//! Position side.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::order_execution::value_objects::OrderSide;

/// Direction of a position's exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSide {
    /// No exposure.
    #[default]
    Flat,
    /// Positive signed quantity.
    Long,
    /// Negative signed quantity.
    Short,
}

impl PositionSide {
    /// Order side that reduces this position, if any.
    #[must_use]
    pub const fn closing_side(&self) -> Option<OrderSide> {
        match self {
            Self::Long => Some(OrderSide::Sell),
            Self::Short => Some(OrderSide::Buy),
            Self::Flat => None,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "FLAT"),
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closing_side() {
        assert_eq!(PositionSide::Long.closing_side(), Some(OrderSide::Sell));
        assert_eq!(PositionSide::Short.closing_side(), Some(OrderSide::Buy));
        assert_eq!(PositionSide::Flat.closing_side(), None);
    }

    #[test]
    fn display() {
        assert_eq!(PositionSide::Short.to_string(), "SHORT");
    }
}
