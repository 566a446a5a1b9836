//! Prometheus metrics for the execution core.
//!
//! Engines record command, event, denial and trading-state metrics through the
//! helpers below. Without an installed recorder the macros are no-ops, so
//! engines and tests never depend on [`init_metrics`] having run.
//!
//! # Example
//!
//! ```ignore
//! use execution_core::observability::{init_metrics, MetricsConfig};
//!
//! let config = MetricsConfig::default();
//! init_metrics(&config)?;
//!
//! record_command("risk_engine", "SUBMIT_ORDER");
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::domain::risk_management::TradingState;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 9090),
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self { listen_addr: addr }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the exporter fails to start (e.g., port already in use
/// or a recorder is already installed).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Engine Metrics
// ============================================================================

/// Record a command received by an engine.
///
/// # Arguments
///
/// * `component` - Engine name (e.g., `"risk_engine"`, `"exec_engine"`)
/// * `command_type` - Command type (e.g., `"SUBMIT_ORDER"`)
pub fn record_command(component: &str, command_type: &str) {
    counter!(
        "engine_commands_total",
        "component" => component.to_string(),
        "command_type" => command_type.to_string()
    )
    .increment(1);
}

/// Record an order event processed by the execution engine.
pub fn record_order_event(event_type: &str) {
    counter!(
        "order_events_total",
        "event_type" => event_type.to_string()
    )
    .increment(1);
}

/// Record an event dropped before it reached an order.
///
/// # Arguments
///
/// * `reason` - Why it was dropped (e.g., `"duplicate"`, `"unknown_order"`)
pub fn record_dropped_event(reason: &str) {
    counter!(
        "order_events_dropped_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record an order denied before reaching a venue.
///
/// # Arguments
///
/// * `component` - Engine that denied the order
/// * `check` - Failed check (e.g., `"trading_state"`, `"notional"`)
pub fn record_denial(component: &str, check: &str) {
    counter!(
        "order_denials_total",
        "component" => component.to_string(),
        "check" => check.to_string()
    )
    .increment(1);
}

/// Record the risk engine's current trading state.
pub fn record_trading_state(state: TradingState) {
    let value = match state {
        TradingState::Active => 0.0,
        TradingState::Reducing => 1.0,
        TradingState::Halted => 2.0,
    };
    gauge!("trading_state").set(value);
}

/// Update the open orders gauge.
pub fn update_open_orders(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("open_orders").set(count as f64);
}

/// Update the open positions gauge.
pub fn update_open_positions(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("open_positions").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_listens_on_9090() {
        let config = MetricsConfig::default();
        assert_eq!(config.listen_addr.port(), 9090);
    }

    #[test]
    fn with_addr_overrides_listen_addr() {
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        assert_eq!(MetricsConfig::with_addr(addr).listen_addr, addr);
    }

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        record_command("exec_engine", "SUBMIT_ORDER");
        record_order_event("ORDER_FILLED");
        record_dropped_event("duplicate");
        record_denial("risk_engine", "trading_state");
        record_trading_state(TradingState::Halted);
        update_open_orders(3);
        update_open_positions(1);
    }

    #[test]
    fn metrics_error_display() {
        let err = MetricsError::Installation("port in use".to_string());
        assert_eq!(err.to_string(), "metrics installation error: port in use");
    }
}
