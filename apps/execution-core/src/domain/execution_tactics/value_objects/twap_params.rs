//! TWAP Parameters
//!
//! Read from an order's `exec_algorithm_params`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::execution_tactics::errors::TacticError;

/// Horizon and slice interval of a TWAP execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwapParams {
    /// Total execution window.
    pub horizon: Duration,
    /// Time between slices.
    pub interval: Duration,
}

impl TwapParams {
    /// Parameter key for the horizon in seconds.
    pub const HORIZON_SECS: &'static str = "horizon_secs";
    /// Parameter key for the interval in seconds.
    pub const INTERVAL_SECS: &'static str = "interval_secs";

    /// Create validated parameters.
    ///
    /// # Errors
    ///
    /// Returns error if the interval is zero or longer than the horizon.
    pub fn new(horizon: Duration, interval: Duration) -> Result<Self, TacticError> {
        if interval.is_zero() {
            return Err(TacticError::InvalidConfiguration {
                message: "interval must be positive".to_string(),
            });
        }
        if interval > horizon {
            return Err(TacticError::InvalidConfiguration {
                message: format!(
                    "interval {}s exceeds horizon {}s",
                    interval.as_secs_f64(),
                    horizon.as_secs_f64()
                ),
            });
        }
        Ok(Self { horizon, interval })
    }

    /// Parse `horizon_secs` and `interval_secs` (fractional seconds allowed).
    ///
    /// # Errors
    ///
    /// Returns error if a key is missing, not a number, or the values are invalid.
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<Self, TacticError> {
        let horizon = Self::seconds(params, Self::HORIZON_SECS)?;
        let interval = Self::seconds(params, Self::INTERVAL_SECS)?;
        Self::new(horizon, interval)
    }

    /// Number of whole intervals in the horizon.
    #[must_use]
    pub fn num_intervals(&self) -> u32 {
        let count = self.horizon.as_nanos() / self.interval.as_nanos();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn seconds(params: &BTreeMap<String, String>, name: &str) -> Result<Duration, TacticError> {
        let raw = params.get(name).ok_or_else(|| TacticError::MissingParameter {
            name: name.to_string(),
        })?;
        let secs: f64 = raw
            .trim()
            .parse()
            .map_err(|_| TacticError::InvalidConfiguration {
                message: format!("{name} is not a number: '{raw}'"),
            })?;
        Duration::try_from_secs_f64(secs).map_err(|e| TacticError::InvalidConfiguration {
            message: format!("{name}: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_params(horizon: &str, interval: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (TwapParams::HORIZON_SECS.to_string(), horizon.to_string()),
            (TwapParams::INTERVAL_SECS.to_string(), interval.to_string()),
        ])
    }

    #[test]
    fn parses_fractional_seconds() {
        let params = TwapParams::from_params(&make_params("3", "0.5")).unwrap();
        assert_eq!(params.horizon, Duration::from_secs(3));
        assert_eq!(params.interval, Duration::from_millis(500));
        assert_eq!(params.num_intervals(), 6);
    }

    #[test]
    fn missing_key_is_reported() {
        let mut params = make_params("2", "1");
        params.remove(TwapParams::INTERVAL_SECS);
        assert_eq!(
            TwapParams::from_params(&params).unwrap_err(),
            TacticError::MissingParameter {
                name: "interval_secs".to_string()
            }
        );
    }

    #[test]
    fn interval_longer_than_horizon_is_invalid() {
        assert!(TwapParams::from_params(&make_params("1", "2")).is_err());
        assert!(TwapParams::from_params(&make_params("1", "0")).is_err());
        assert!(TwapParams::from_params(&make_params("abc", "1")).is_err());
    }
}
