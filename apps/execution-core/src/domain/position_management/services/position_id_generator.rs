//! Position ID Generator
//!
//! Hedging position IDs follow
//! `P-YYYYMMDD-HHMMSS-<trader tag>-<strategy tag>-<count>`, with one count
//! per strategy.

use std::collections::HashMap;

use crate::domain::shared::{PositionId, StrategyId, Timestamp, TraderId};

/// Generates position IDs for one trader.
#[derive(Debug, Clone)]
pub struct PositionIdGenerator {
    trader_id: TraderId,
    counts: HashMap<StrategyId, usize>,
}

impl PositionIdGenerator {
    /// Create a generator with all counts at zero.
    #[must_use]
    pub fn new(trader_id: TraderId) -> Self {
        Self {
            trader_id,
            counts: HashMap::new(),
        }
    }

    /// Next position ID for `strategy_id`.
    pub fn generate(&mut self, strategy_id: &StrategyId, ts: Timestamp) -> PositionId {
        let count = self.counts.entry(strategy_id.clone()).or_insert(0);
        *count += 1;
        PositionId::new(format!(
            "P-{}-{}-{}-{count}",
            ts.format("%Y%m%d-%H%M%S"),
            self.trader_id.tag(),
            strategy_id.tag()
        ))
    }

    /// Set the count for a strategy (used when reloading state).
    pub fn set_count(&mut self, strategy_id: StrategyId, count: usize) {
        self.counts.insert(strategy_id, count);
    }

    /// Current count for a strategy.
    #[must_use]
    pub fn count(&self, strategy_id: &StrategyId) -> usize {
        self.counts.get(strategy_id).copied().unwrap_or(0)
    }

    /// Reset all counts.
    pub fn reset(&mut self) {
        self.counts.clear();
    }
}
