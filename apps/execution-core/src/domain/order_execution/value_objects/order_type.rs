//! Order type (market, limit, etc.).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order type specifying execution behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Execute at best available price.
    Market,
    /// Execute at the limit price or better.
    Limit,
    /// Becomes a market order when the trigger price is reached.
    StopMarket,
    /// Becomes a limit order when the trigger price is reached.
    StopLimit,
    /// Market order that rests as a limit for any unfilled remainder.
    MarketToLimit,
    /// Becomes a market order when the price touches the trigger.
    MarketIfTouched,
    /// Becomes a limit order when the price touches the trigger.
    LimitIfTouched,
}

impl OrderType {
    /// Returns true if this order type requires a limit price.
    #[must_use]
    pub const fn requires_limit_price(&self) -> bool {
        matches!(self, Self::Limit | Self::StopLimit | Self::LimitIfTouched)
    }

    /// Returns true if this order type requires a trigger price.
    #[must_use]
    pub const fn requires_trigger_price(&self) -> bool {
        matches!(
            self,
            Self::StopMarket | Self::StopLimit | Self::MarketIfTouched | Self::LimitIfTouched
        )
    }

    /// Returns true if this order executes at market on arrival.
    #[must_use]
    pub const fn is_market(&self) -> bool {
        matches!(self, Self::Market | Self::MarketToLimit)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Market => "MARKET",
            Self::Limit => "LIMIT",
            Self::StopMarket => "STOP_MARKET",
            Self::StopLimit => "STOP_LIMIT",
            Self::MarketToLimit => "MARKET_TO_LIMIT",
            Self::MarketIfTouched => "MARKET_IF_TOUCHED",
            Self::LimitIfTouched => "LIMIT_IF_TOUCHED",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_requirements() {
        assert!(OrderType::Limit.requires_limit_price());
        assert!(!OrderType::Limit.requires_trigger_price());
        assert!(OrderType::StopLimit.requires_limit_price());
        assert!(OrderType::StopLimit.requires_trigger_price());
        assert!(OrderType::StopMarket.requires_trigger_price());
        assert!(!OrderType::Market.requires_limit_price());
    }

    #[test]
    fn display_matches_serde() {
        for order_type in [OrderType::StopMarket, OrderType::MarketIfTouched] {
            let json = serde_json::to_string(&order_type).unwrap();
            assert_eq!(json, format!("\"{order_type}\""));
        }
    }
}
