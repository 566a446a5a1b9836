//! Execution Tactics Errors

use thiserror::Error;

/// Errors raised while building a slice schedule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TacticError {
    /// Invalid configuration provided.
    #[error("Invalid tactic configuration: {message}")]
    InvalidConfiguration {
        /// Error details.
        message: String,
    },

    /// Required algorithm parameter missing.
    #[error("Missing algorithm parameter '{name}'")]
    MissingParameter {
        /// Parameter name.
        name: String,
    },

    /// Invalid quantity for slice.
    #[error("Invalid slice quantity: {quantity}")]
    InvalidSliceQuantity {
        /// The invalid quantity value.
        quantity: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TacticError::InvalidConfiguration {
            message: "interval exceeds horizon".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid tactic configuration: interval exceeds horizon"
        );

        let err = TacticError::MissingParameter {
            name: "horizon_secs".to_string(),
        };
        assert_eq!(err.to_string(), "Missing algorithm parameter 'horizon_secs'");
    }
}
