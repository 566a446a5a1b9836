//! Order rate limit.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::risk_management::errors::RiskError;

/// At most `limit` messages per `interval`, written `<limit>/<HH:MM:SS>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RateLimit {
    limit: usize,
    interval: Duration,
}

impl RateLimit {
    /// Create a rate limit.
    ///
    /// # Errors
    ///
    /// Returns error if `limit` or `interval` is zero.
    pub fn new(limit: usize, interval: Duration) -> Result<Self, RiskError> {
        if limit == 0 || interval.is_zero() {
            return Err(RiskError::InvalidRateLimit {
                value: format!("{limit}/{}s", interval.as_secs()),
                message: "limit and interval must be positive".to_string(),
            });
        }
        Ok(Self { limit, interval })
    }

    /// Messages allowed per interval.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Window length.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RateLimit {
    /// 100 messages per second.
    fn default() -> Self {
        Self {
            limit: 100,
            interval: Duration::from_secs(1),
        }
    }
}

impl FromStr for RateLimit {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| RiskError::InvalidRateLimit {
            value: s.to_string(),
            message: message.to_string(),
        };

        let (limit, interval) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("expected <limit>/<HH:MM:SS>"))?;
        let limit: usize = limit
            .trim()
            .parse()
            .map_err(|_| invalid("limit is not an integer"))?;

        let parts: Vec<&str> = interval.trim().split(':').collect();
        let [hours, minutes, seconds] = parts.as_slice() else {
            return Err(invalid("interval must be HH:MM:SS"));
        };
        let mut total: u64 = 0;
        for (part, scale) in [(hours, 3600), (minutes, 60), (seconds, 1)] {
            let value: u64 = part
                .parse()
                .map_err(|_| invalid("interval component is not an integer"))?;
            total += value * scale;
        }

        Self::new(limit, Duration::from_secs(total))
            .map_err(|_| invalid("limit and interval must be positive"))
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.interval.as_secs();
        write!(
            f,
            "{}/{:02}:{:02}:{:02}",
            self.limit,
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        )
    }
}

impl TryFrom<String> for RateLimit {
    type Error = RiskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RateLimit> for String {
    fn from(value: RateLimit) -> Self {
        value.to_string()
    }
}
