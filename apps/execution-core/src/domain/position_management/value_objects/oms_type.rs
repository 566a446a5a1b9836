//! Order management system type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How fills are grouped into positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OmsType {
    /// One position per instrument and strategy.
    #[default]
    Netting,
    /// Any number of positions per instrument, identified per fill or order.
    Hedging,
}

impl fmt::Display for OmsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Netting => write!(f, "NETTING"),
            Self::Hedging => write!(f, "HEDGING"),
        }
    }
}
