//! TWAP Algorithm
//!
//! Splits a primary order into equal market slices spaced `interval_secs`
//! apart over `horizon_secs`. The first slice goes out when the primary
//! arrives; the final slice is the primary itself, submitted with whatever
//! quantity it has left.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::{AlgorithmAction, AlgorithmError, ExecAlgorithm, SpawnRequest};
use crate::domain::execution_tactics::{TacticError, TwapParams, TwapSchedule};
use crate::domain::order_execution::{Order, OrderEventAny};
use crate::domain::shared::{ClientOrderId, ExecAlgorithmId, Timestamp};

#[derive(Debug, Clone)]
struct ActiveSchedule {
    schedule: TwapSchedule,
    interval: chrono::Duration,
    next_at: Timestamp,
}

/// Time-weighted average price execution.
#[derive(Debug, Clone)]
pub struct TwapAlgorithm {
    id: ExecAlgorithmId,
    active: BTreeMap<ClientOrderId, ActiveSchedule>,
}

impl TwapAlgorithm {
    /// Create the algorithm under `id`.
    #[must_use]
    pub fn new(id: ExecAlgorithmId) -> Self {
        Self {
            id,
            active: BTreeMap::new(),
        }
    }

    /// Primaries still being sliced.
    #[must_use]
    pub fn active_primaries(&self) -> Vec<ClientOrderId> {
        self.active.keys().cloned().collect()
    }

    fn take_slice(primary_id: &ClientOrderId, active: &mut ActiveSchedule) -> Option<AlgorithmAction> {
        let (quantity, is_final) = active.schedule.next_slice()?;
        if is_final {
            debug!(primary = %primary_id, "Submitting primary as final slice");
            Some(AlgorithmAction::SubmitPrimary(primary_id.clone()))
        } else {
            debug!(primary = %primary_id, %quantity, "Spawning slice");
            Some(AlgorithmAction::Spawn(SpawnRequest::market(
                primary_id.clone(),
                quantity,
            )))
        }
    }
}

impl Default for TwapAlgorithm {
    fn default() -> Self {
        Self::new(ExecAlgorithmId::new("TWAP"))
    }
}

impl ExecAlgorithm for TwapAlgorithm {
    fn id(&self) -> &ExecAlgorithmId {
        &self.id
    }

    fn on_order(
        &mut self,
        primary: &Order,
        now: Timestamp,
    ) -> Result<Vec<AlgorithmAction>, AlgorithmError> {
        let primary_id = primary.client_order_id().clone();
        let params = TwapParams::from_params(primary.exec_algorithm_params())?;
        let quantity = primary.quantity();
        let schedule = TwapSchedule::new(quantity, quantity.precision(), params)?;
        let interval = chrono::Duration::from_std(params.interval).map_err(|e| {
            TacticError::InvalidConfiguration {
                message: format!("interval: {e}"),
            }
        })?;

        info!(
            primary = %primary_id,
            slices = schedule.remaining(),
            horizon_secs = params.horizon.as_secs_f64(),
            interval_secs = params.interval.as_secs_f64(),
            "TWAP started"
        );

        let mut active = ActiveSchedule {
            schedule,
            interval,
            next_at: now + interval,
        };
        let first = Self::take_slice(&primary_id, &mut active);
        if !active.schedule.is_complete() {
            self.active.insert(primary_id, active);
        }
        Ok(first.into_iter().collect())
    }

    fn on_time(&mut self, now: Timestamp) -> Vec<AlgorithmAction> {
        let mut actions = Vec::new();
        let mut finished = Vec::new();
        for (primary_id, active) in &mut self.active {
            while active.next_at <= now {
                match Self::take_slice(primary_id, active) {
                    Some(action) => actions.push(action),
                    None => break,
                }
                active.next_at += active.interval;
            }
            if active.schedule.is_complete() {
                finished.push(primary_id.clone());
            }
        }
        for primary_id in finished {
            self.active.remove(&primary_id);
        }
        actions
    }

    fn on_order_event(&mut self, event: &OrderEventAny) -> Vec<AlgorithmAction> {
        let stops = matches!(
            event,
            OrderEventAny::Denied(_)
                | OrderEventAny::Rejected(_)
                | OrderEventAny::Canceled(_)
                | OrderEventAny::Expired(_)
        );
        if stops && self.active.remove(event.client_order_id()).is_some() {
            info!(primary = %event.client_order_id(), "TWAP stopped, primary closed");
        }
        Vec::new()
    }

    fn on_stop(&mut self) -> Vec<AlgorithmAction> {
        if !self.active.is_empty() {
            info!(pending = self.active.len(), "TWAP stopped with primaries still working");
        }
        self.active.clear();
        Vec::new()
    }
}
