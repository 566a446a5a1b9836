//! Tracing Setup
//!
//! Installs the global `tracing` subscriber from [`LoggingConfig`].
//!
//! # Configuration
//!
//! - `RUST_LOG`: overrides the configured level when set
//! - `format`: `json` for structured output, `pretty` for development
//!
//! # Usage
//!
//! ```rust,ignore
//! use execution_core::infrastructure::telemetry::init_telemetry;
//!
//! let config = load_config(None)?;
//! init_telemetry(&config.observability.logging)?;
//! ```

use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::LoggingConfig;

/// Tracing setup error.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured level is not a valid filter directive.
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// Offending directive.
        filter: String,
        /// Parser message.
        message: String,
    },

    /// A global subscriber is already installed.
    #[error("Tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Build the filter: `RUST_LOG` when set, the configured level otherwise.
///
/// # Errors
///
/// Returns `InvalidFilter` if the configured level does not parse.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| TelemetryError::InvalidFilter {
        filter: config.level.clone(),
        message: e.to_string(),
    })
}

/// Install the global subscriber.
///
/// A second call leaves the first subscriber in place and returns
/// `AlreadyInstalled`.
///
/// # Errors
///
/// Returns error if the filter is invalid or a subscriber is already installed.
pub fn init_telemetry(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.format == "pretty" {
        builder.pretty().with_ansi(true).try_init()
    } else {
        builder
            .json()
            .with_current_span(config.include_spans)
            .with_span_list(config.include_spans)
            .try_init()
    };
    result.map_err(|e| TelemetryError::AlreadyInstalled(e.to_string()))?;

    tracing::info!(level = %config.level, format = %config.format, "Tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_is_reported() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "execution_core=loud".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            env_filter(&config),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn second_init_does_not_panic() {
        let config = LoggingConfig::default();
        let _ = init_telemetry(&config);
        assert!(init_telemetry(&config).is_err());
    }
}
