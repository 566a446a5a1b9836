//! Configuration for the execution core.
//!
//! Loads the YAML configuration, interpolates environment variables and
//! validates the result. Each engine converts its section with `From`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use execution_core::infrastructure::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Build the kernel settings
//! let kernel_config = config.kernel_config();
//! ```

mod engines;
mod observability;

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use engines::{CacheSection, ExecEngineSection, RiskEngineSection, RuntimeSection};
pub use observability::{LoggingConfig, MetricsSection, ObservabilityConfig};

use crate::application::cache::CacheConfig;
use crate::application::kernel::KernelConfig;
use crate::domain::shared::TraderId;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Trader instance, `<NAME>-<TAG>`.
    pub trader_id: TraderId,
    /// Cache settings.
    #[serde(default)]
    pub cache: CacheSection,
    /// Risk engine settings.
    #[serde(default)]
    pub risk_engine: RiskEngineSection,
    /// Execution engine settings.
    #[serde(default)]
    pub exec_engine: ExecEngineSection,
    /// Engine loop settings.
    #[serde(default)]
    pub runtime: RuntimeSection,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Settings for the trading kernel.
    #[must_use]
    pub fn kernel_config(&self) -> KernelConfig {
        KernelConfig {
            trader_id: self.trader_id.clone(),
            risk_engine: (&self.risk_engine).into(),
            exec_engine: (&self.exec_engine).into(),
        }
    }

    /// Settings for the cache.
    #[must_use]
    pub fn cache_config(&self) -> CacheConfig {
        (&self.cache).into()
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. Unset variables
/// without a default become empty.
fn interpolate_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

    let Some(re) = ENV_VAR_REGEX
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").ok())
    else {
        return input.to_string();
    };

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map(|m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

/// Validate configuration values.
///
/// # Errors
///
/// Returns `ValidationError` naming the first offending field.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let trader_id = config.trader_id.as_str();
    match trader_id.split_once('-') {
        Some((name, tag)) if !name.is_empty() && !tag.is_empty() => {}
        _ => {
            return Err(ConfigError::ValidationError(format!(
                "trader_id must be <NAME>-<TAG>, was '{trader_id}'"
            )));
        }
    }

    for (instrument_id, notional) in &config.risk_engine.max_notional_per_order {
        if *notional <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "risk_engine.max_notional_per_order for {instrument_id} must be positive"
            )));
        }
    }

    if config.exec_engine.ack_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "exec_engine.ack_timeout_ms must be positive".to_string(),
        ));
    }

    let valid_formats = ["json", "pretty"];
    if !valid_formats.contains(&config.observability.logging.format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position_management::OmsType;
    use crate::domain::shared::InstrumentId;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    #[test]
    fn test_load_minimal_config() {
        let yaml = "trader_id: TRADER-001\n";

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load minimal config: {e}"),
        };
        assert_eq!(config.trader_id.as_str(), "TRADER-001");
        assert!(!config.risk_engine.bypass);
        assert!(config.risk_engine.allow_cancels_when_halted);
        assert!(config.exec_engine.manage_contingent_orders);
        assert_eq!(config.exec_engine.ack_timeout_ms, 5_000);
        assert_eq!(config.observability.logging.format, "json");
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "trader_id: ${EXECUTION_CORE_TEST_NONEXISTENT_VAR:-TRADER-009}";
        assert_eq!(interpolate_env_vars(input), "trader_id: TRADER-009");
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "level: ${EXECUTION_CORE_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "level: ");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)]
    fn test_env_var_with_default_uses_existing() {
        let result = interpolate_env_vars("path: ${PATH:-default}");
        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_validation_bad_trader_id() {
        let Err(err) = load_config_from_string("trader_id: TRADER\n") else {
            panic!("expected error for trader id without tag");
        };
        assert!(err.to_string().contains("trader_id"));
    }

    #[test]
    fn test_validation_bad_log_format() {
        let yaml = r"
trader_id: TRADER-001
observability:
  logging:
    format: xml
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for log format");
        };
        assert!(err.to_string().contains("format"));
    }

    #[test]
    fn test_validation_non_positive_notional() {
        let yaml = r"
trader_id: TRADER-001
risk_engine:
  max_notional_per_order:
    AUD/USD.SIM: '0'
";
        assert!(load_config_from_string(yaml).is_err());
    }

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
trader_id: TRADER-001

cache:
  drop_instruments_on_reset: true

risk_engine:
  bypass: false
  max_order_submit_rate: "10/00:00:01"
  max_order_modify_rate: "5/00:01:00"
  max_notional_per_order:
    AUD/USD.SIM: "1000000"
  allow_cancels_when_halted: false

exec_engine:
  default_oms_type: HEDGING
  manage_contingent_orders: false
  ack_timeout_ms: 250

runtime:
  timer_interval_ms: 50

observability:
  logging:
    level: "debug"
    format: "pretty"
"#;

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load full config: {e}"),
        };

        assert!(config.cache_config().drop_instruments_on_reset);
        let kernel = config.kernel_config();
        assert_eq!(kernel.risk_engine.max_order_submit_rate.limit(), 10);
        assert_eq!(
            kernel.risk_engine.max_order_modify_rate.interval(),
            Duration::from_secs(60)
        );
        assert_eq!(
            kernel
                .risk_engine
                .max_notional_per_order
                .get(&InstrumentId::new("AUD/USD.SIM")),
            Some(&dec!(1000000))
        );
        assert!(!kernel.risk_engine.allow_cancels_when_halted);
        assert_eq!(kernel.exec_engine.default_oms_type, OmsType::Hedging);
        assert!(!kernel.exec_engine.manage_contingent_orders);
        assert_eq!(config.exec_engine.ack_timeout_ms, 250);
        assert_eq!(config.runtime.timer_interval_ms, 50);
        assert_eq!(config.observability.logging.level, "debug");
    }

    #[test]
    fn test_bad_rate_limit_is_parse_error() {
        let yaml = r#"
trader_id: TRADER-001
risk_engine:
  max_order_submit_rate: "10 per second"
"#;
        assert!(matches!(
            load_config_from_string(yaml),
            Err(ConfigError::ParseError(_))
        ));
    }
}
