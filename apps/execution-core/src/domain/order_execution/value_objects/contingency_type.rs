//! Contingency relationship between linked orders.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an event on one order propagates to its linked orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContingencyType {
    /// Not linked.
    #[default]
    NoContingency,
    /// One-Cancels-Other.
    Oco,
    /// One-Triggers-Other.
    Oto,
    /// One-Updates-Other.
    Ouo,
}

impl fmt::Display for ContingencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoContingency => "NO_CONTINGENCY",
            Self::Oco => "OCO",
            Self::Oto => "OTO",
            Self::Ouo => "OUO",
        };
        write!(f, "{s}")
    }
}

/// Whether a fill added or removed liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiquiditySide {
    /// Unknown or not reported.
    #[default]
    NoLiquiditySide,
    /// Resting order was hit.
    Maker,
    /// Order crossed the spread.
    Taker,
}
