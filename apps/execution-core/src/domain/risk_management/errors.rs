//! Risk management errors.

use std::fmt;

/// Errors raised while configuring risk limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskError {
    /// Rate limit string could not be parsed.
    InvalidRateLimit {
        /// Offending value.
        value: String,
        /// Error message.
        message: String,
    },

    /// Invalid risk configuration.
    InvalidConfiguration {
        /// Configuration field.
        field: String,
        /// Error message.
        message: String,
    },
}

impl fmt::Display for RiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRateLimit { value, message } => {
                write!(f, "Invalid rate limit '{value}': {message}")
            }
            Self::InvalidConfiguration { field, message } => {
                write!(f, "Invalid risk configuration [{field}]: {message}")
            }
        }
    }
}

impl std::error::Error for RiskError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_error_invalid_rate_limit_display() {
        let err = RiskError::InvalidRateLimit {
            value: "10/1s".to_string(),
            message: "expected HH:MM:SS".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("10/1s"));
        assert!(msg.contains("HH:MM:SS"));
    }

    #[test]
    fn risk_error_invalid_configuration_display() {
        let err = RiskError::InvalidConfiguration {
            field: "max_notional_per_order".to_string(),
            message: "must be positive".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("max_notional_per_order"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn risk_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(RiskError::InvalidConfiguration {
            field: "bypass".to_string(),
            message: "test".to_string(),
        });
        assert!(!err.to_string().is_empty());
    }
}
