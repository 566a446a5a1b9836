//! Observability module for metrics.
//!
//! Engines record counters and gauges through these helpers; deployments that
//! want scraping install the Prometheus exporter with [`init_metrics`].

mod metrics;

pub use metrics::{
    MetricsConfig, MetricsError, init_metrics, record_command, record_denial,
    record_dropped_event, record_order_event, record_trading_state, update_open_orders,
    update_open_positions,
};
