//! Cache, engine and runtime sections.

use std::collections::HashMap;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::cache::CacheConfig;
use crate::application::execution_engine::ExecEngineConfig;
use crate::application::risk_engine::RiskEngineConfig;
use crate::domain::position_management::OmsType;
use crate::domain::risk_management::RateLimit;
use crate::domain::shared::InstrumentId;

/// Cache settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSection {
    /// Clear instruments and prices on reset.
    #[serde(default)]
    pub drop_instruments_on_reset: bool,
}

impl From<&CacheSection> for CacheConfig {
    fn from(section: &CacheSection) -> Self {
        Self {
            drop_instruments_on_reset: section.drop_instruments_on_reset,
        }
    }
}

/// Risk engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskEngineSection {
    /// Disable pre-trade checks (historical replay).
    #[serde(default)]
    pub bypass: bool,
    /// Submit budget, `<limit>/<HH:MM:SS>`.
    #[serde(default)]
    pub max_order_submit_rate: RateLimit,
    /// Modify budget, `<limit>/<HH:MM:SS>`.
    #[serde(default)]
    pub max_order_modify_rate: RateLimit,
    /// Largest notional allowed for a single order, per instrument.
    #[serde(default)]
    pub max_notional_per_order: HashMap<InstrumentId, Decimal>,
    /// Forward cancels while `HALTED`.
    #[serde(default = "default_true")]
    pub allow_cancels_when_halted: bool,
    /// Deny commands referencing a position that is not open.
    #[serde(default = "default_true")]
    pub check_position_exists: bool,
    /// Log every command at debug level.
    #[serde(default)]
    pub debug: bool,
}

impl Default for RiskEngineSection {
    fn default() -> Self {
        Self {
            bypass: false,
            max_order_submit_rate: RateLimit::default(),
            max_order_modify_rate: RateLimit::default(),
            max_notional_per_order: HashMap::new(),
            allow_cancels_when_halted: true,
            check_position_exists: true,
            debug: false,
        }
    }
}

impl From<&RiskEngineSection> for RiskEngineConfig {
    fn from(section: &RiskEngineSection) -> Self {
        Self {
            bypass: section.bypass,
            max_order_submit_rate: section.max_order_submit_rate,
            max_order_modify_rate: section.max_order_modify_rate,
            max_notional_per_order: section.max_notional_per_order.clone(),
            allow_cancels_when_halted: section.allow_cancels_when_halted,
            check_position_exists: section.check_position_exists,
            debug: section.debug,
        }
    }
}

/// Execution engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecEngineSection {
    /// OMS type for strategies without an override.
    #[serde(default)]
    pub default_oms_type: OmsType,
    /// Propagate events across OTO/OCO/OUO links.
    #[serde(default = "default_true")]
    pub manage_contingent_orders: bool,
    /// Log every command and event at debug level.
    #[serde(default)]
    pub debug: bool,
    /// Bound on venue acknowledgement waits.
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
}

impl Default for ExecEngineSection {
    fn default() -> Self {
        Self {
            default_oms_type: OmsType::default(),
            manage_contingent_orders: true,
            debug: false,
            ack_timeout_ms: default_ack_timeout_ms(),
        }
    }
}

impl ExecEngineSection {
    /// Bound to pass to `await_order_event`.
    #[must_use]
    pub const fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

impl From<&ExecEngineSection> for ExecEngineConfig {
    fn from(section: &ExecEngineSection) -> Self {
        Self {
            default_oms_type: section.default_oms_type,
            manage_contingent_orders: section.manage_contingent_orders,
            debug: section.debug,
        }
    }
}

/// Engine loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSection {
    /// Period of algorithm timer ticks; `0` disables the ticker.
    #[serde(default = "default_timer_interval_ms")]
    pub timer_interval_ms: u64,
}

impl RuntimeSection {
    /// Timer period for the engine loop, `None` when disabled.
    #[must_use]
    pub const fn timer_interval(&self) -> Option<Duration> {
        if self.timer_interval_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timer_interval_ms))
        }
    }
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            timer_interval_ms: default_timer_interval_ms(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_ack_timeout_ms() -> u64 {
    5_000
}

const fn default_timer_interval_ms() -> u64 {
    100
}
