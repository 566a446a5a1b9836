//! Trading state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Engine-wide gate on outbound trading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradingState {
    /// All commands pass to the checks.
    #[default]
    Active,
    /// Trading halted: every submit is denied.
    Halted,
    /// Only orders that reduce exposure pass.
    Reducing,
}

impl TradingState {
    /// Returns true if new orders may still be submitted in some form.
    #[must_use]
    pub const fn allows_submits(&self) -> bool {
        !matches!(self, Self::Halted)
    }
}

impl fmt::Display for TradingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Halted => write!(f, "HALTED"),
            Self::Reducing => write!(f, "REDUCING"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_active() {
        assert_eq!(TradingState::default(), TradingState::Active);
    }

    #[test]
    fn serde_uses_screaming_case() {
        let json = serde_json::to_string(&TradingState::Reducing).unwrap();
        assert_eq!(json, "\"REDUCING\"");
        assert_eq!(TradingState::Halted.to_string(), "HALTED");
        assert!(!TradingState::Halted.allows_submits());
    }
}
