//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up IDs from different contexts (a client order id is
//! never accepted where a venue order id is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new unique identifier using UUID v4.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(TraderId, "Identifier of the trader instance (e.g. `TRADER-001`).");
define_id!(StrategyId, "Identifier of a strategy (e.g. `S-001`).");
define_id!(
    InstrumentId,
    "Identifier for a tradeable instrument in `SYMBOL.VENUE` form."
);
define_id!(Venue, "Trading venue identifier (e.g. `SIM`, `BINANCE`).");
define_id!(ClientOrderId, "Caller-assigned order identifier, unique per cache.");
define_id!(VenueOrderId, "Identifier assigned by the venue once it accepts an order.");
define_id!(PositionId, "Identifier of a position.");
define_id!(AccountId, "Account identifier in `ISSUER-NUMBER` form.");
define_id!(ClientId, "Identifier of a venue execution client.");
define_id!(ExecAlgorithmId, "Identifier of an execution algorithm (e.g. `TWAP`).");
define_id!(OrderListId, "Identifier of a submitted order list.");
define_id!(TradeId, "Venue trade (match) identifier carried on fills.");
define_id!(Currency, "ISO-style currency code (e.g. `USD`, `BTC`).");

/// Returns the part of `value` after its last `-`, or the whole value.
fn tag_of(value: &str) -> &str {
    value.rsplit_once('-').map_or(value, |(_, tag)| tag)
}

impl TraderId {
    /// The numeric tag used in generated position ids (`TRADER-001` → `001`).
    #[must_use]
    pub fn tag(&self) -> &str {
        tag_of(&self.0)
    }
}

impl StrategyId {
    /// The tag used in generated position ids (`S-001` → `001`).
    #[must_use]
    pub fn tag(&self) -> &str {
        tag_of(&self.0)
    }

    /// Placeholder strategy for orders that originated outside this system.
    #[must_use]
    pub fn external() -> Self {
        Self::new("EXTERNAL")
    }
}

impl InstrumentId {
    /// Builds `SYMBOL.VENUE`.
    #[must_use]
    pub fn from_parts(symbol: &str, venue: &Venue) -> Self {
        Self(format!("{symbol}.{venue}"))
    }

    /// Symbol part (everything before the last `.`).
    #[must_use]
    pub fn symbol(&self) -> &str {
        self.0.rsplit_once('.').map_or(&self.0, |(symbol, _)| symbol)
    }

    /// Venue part (everything after the last `.`).
    #[must_use]
    pub fn venue(&self) -> Venue {
        Venue::new(self.0.rsplit_once('.').map_or("", |(_, venue)| venue))
    }
}

impl AccountId {
    /// Issuer part of the account id, which names the venue (`SIM-001` → `SIM`).
    #[must_use]
    pub fn issuer(&self) -> &str {
        self.0.split_once('-').map_or(&self.0, |(issuer, _)| issuer)
    }
}

impl PositionId {
    /// Id of the position opened by a flip of this one.
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self(format!("{}F", self.0))
    }
}

impl ClientOrderId {
    /// Id of the `sequence`-th order spawned from this one by an execution algorithm.
    #[must_use]
    pub fn spawned(&self, sequence: usize) -> Self {
        Self(format!("{}-E{sequence}", self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_order_id_new_and_display() {
        let id = ClientOrderId::new("O-123");
        assert_eq!(id.as_str(), "O-123");
        assert_eq!(format!("{id}"), "O-123");
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(ClientOrderId::generate(), ClientOrderId::generate());
    }

    #[test]
    fn id_from_string() {
        let id: VenueOrderId = "V-1".into();
        assert_eq!(id.as_str(), "V-1");

        let id: VenueOrderId = String::from("V-2").into();
        assert_eq!(id.into_inner(), "V-2");
    }

    #[test]
    fn instrument_id_parts() {
        let id = InstrumentId::new("AUD/USD.SIM");
        assert_eq!(id.symbol(), "AUD/USD");
        assert_eq!(id.venue(), Venue::new("SIM"));
        assert_eq!(InstrumentId::from_parts("AUD/USD", &Venue::new("SIM")), id);
    }

    #[test]
    fn tags_for_position_id_generation() {
        assert_eq!(TraderId::new("TESTER-000").tag(), "000");
        assert_eq!(StrategyId::new("S-001").tag(), "001");
        assert_eq!(StrategyId::new("NOTAG").tag(), "NOTAG");
    }

    #[test]
    fn account_issuer() {
        assert_eq!(AccountId::new("SIM-001").issuer(), "SIM");
    }

    #[test]
    fn derived_ids() {
        let position = PositionId::new("P-19700101-000000-000-001-1");
        assert_eq!(position.flipped().as_str(), "P-19700101-000000-000-001-1F");

        let primary = ClientOrderId::new("O-19700101-000000-000-001-1");
        assert_eq!(primary.spawned(3).as_str(), "O-19700101-000000-000-001-1-E3");
    }

    #[test]
    fn serde_is_transparent() {
        let id = StrategyId::new("S-001");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"S-001\"");
        let back: StrategyId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
