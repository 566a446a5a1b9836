//! Integration tests for loading configuration from disk and building a
//! kernel from it.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use execution_core::application::ports::LiveClock;
use execution_core::domain::order_execution::SubmitOrder;
use execution_core::infrastructure::ConfigError;
use execution_core::{
    Cache, InstrumentId, MessageBus, OmsType, OrderFactory, OrderSide, Quantity, StrategyId,
    TradingCommand, TradingKernel, TraderId, load_config,
};
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
trader_id: TRADER-042
cache:
  drop_instruments_on_reset: false
risk_engine:
  bypass: false
  max_order_submit_rate: "50/00:00:01"
  max_order_modify_rate: "50/00:00:01"
exec_engine:
  default_oms_type: HEDGING
  manage_contingent_orders: true
runtime:
  timer_interval_ms: 250
observability:
  logging:
    level: info
    format: json
"#;

fn write_config(contents: &str) -> anyhow::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    Ok(file)
}

#[test]
fn test_load_config_from_file() -> anyhow::Result<()> {
    let file = write_config(CONFIG)?;
    let path = file.path().to_str().ok_or_else(|| anyhow::anyhow!("non-utf8 path"))?;

    let config = load_config(Some(path))?;

    assert_eq!(config.trader_id, TraderId::new("TRADER-042"));
    assert_eq!(
        config.runtime.timer_interval(),
        Some(Duration::from_millis(250))
    );
    assert_eq!(config.exec_engine.ack_timeout(), Duration::from_secs(5));
    let kernel_config = config.kernel_config();
    assert_eq!(kernel_config.exec_engine.default_oms_type, OmsType::Hedging);
    assert!(!kernel_config.risk_engine.bypass);
    Ok(())
}

#[test]
fn test_missing_file_is_read_error() {
    let result = load_config(Some("/nonexistent/execution-core.yaml"));

    let Err(err) = result else {
        panic!("expected read error");
    };
    assert!(matches!(err, ConfigError::ReadError { .. }));
}

#[test]
fn test_invalid_trader_id_rejected_from_file() -> anyhow::Result<()> {
    let file = write_config(&CONFIG.replace("TRADER-042", "TRADER042"))?;
    let path = file.path().to_str().ok_or_else(|| anyhow::anyhow!("non-utf8 path"))?;

    let Err(err) = load_config(Some(path)) else {
        panic!("expected validation error");
    };
    assert!(matches!(err, ConfigError::ValidationError(_)));
    Ok(())
}

#[test]
fn test_kernel_built_from_loaded_config() -> anyhow::Result<()> {
    let file = write_config(CONFIG)?;
    let path = file.path().to_str().ok_or_else(|| anyhow::anyhow!("non-utf8 path"))?;
    let config = load_config(Some(path))?;

    let cache = Cache::new(config.cache_config(), None).into_shared();
    let mut kernel = TradingKernel::new(
        config.kernel_config(),
        cache,
        Arc::new(MessageBus::new()),
        Arc::new(LiveClock),
    );
    kernel.start()?;

    // Unknown instrument: the order is denied rather than sent anywhere.
    let order = OrderFactory::new(config.trader_id.clone(), StrategyId::new("S-001")).market(
        InstrumentId::new("AUD/USD.SIM"),
        OrderSide::Buy,
        Quantity::from_u64(10),
    );
    let id = order.client_order_id().clone();
    kernel.execute(TradingCommand::SubmitOrder(SubmitOrder::new(order, None)));

    assert_eq!(kernel.trader_id(), &TraderId::new("TRADER-042"));
    assert_eq!(kernel.risk_engine().denied_count(), 1);
    assert!(kernel.cache().read().is_order_closed(&id));
    Ok(())
}
