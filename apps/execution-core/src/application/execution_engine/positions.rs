//! Fill handling: position ID assignment, position open/update/close and
//! flips through flat.

use tracing::{debug, error, warn};

use super::ExecutionEngine;
use crate::application::cache::QueryFilter;
use crate::application::ports::{BusMessage, topics};
use crate::domain::order_execution::{Order, OrderFilled};
use crate::domain::position_management::{OmsType, Position, PositionEvent};
use crate::domain::reference_data::Instrument;
use crate::domain::shared::{PositionId, UUID4};
use crate::observability::update_open_positions;

impl ExecutionEngine {
    // ========================================================================
    // Position IDs
    // ========================================================================

    /// Position a fill belongs to.
    ///
    /// NETTING uses the open position for the instrument and strategy (which
    /// may be flip-born), else `<instrument_id>-<strategy_id>`. HEDGING uses
    /// the fill's ID, then the order's, then its exec-spawn family's, then
    /// its OTO parent's, and otherwise generates a new one. The cache links
    /// the order to it once the fill is applied.
    pub(super) fn determine_position_id(
        &mut self,
        order: &Order,
        fill: &OrderFilled,
        oms_type: OmsType,
    ) -> PositionId {
        match oms_type {
            OmsType::Netting => self.netting_position_id(order),
            OmsType::Hedging => match self.hedging_position_id(order, fill) {
                Some(position_id) => position_id,
                None => self
                    .position_ids
                    .generate(order.strategy_id(), fill.header.ts_event),
            },
        }
    }

    fn netting_position_id(&self, order: &Order) -> PositionId {
        let filter = QueryFilter::all()
            .instrument(order.instrument_id().clone())
            .strategy(order.strategy_id().clone());
        let cache = self.cache.read();
        cache.positions_open(&filter).first().map_or_else(
            || PositionId::new(format!("{}-{}", order.instrument_id(), order.strategy_id())),
            |position| position.id().clone(),
        )
    }

    fn hedging_position_id(&self, order: &Order, fill: &OrderFilled) -> Option<PositionId> {
        if let Some(position_id) = &fill.position_id {
            return Some(position_id.clone());
        }
        let cache = self.cache.read();
        if let Some(position_id) = order
            .position_id()
            .or_else(|| cache.position_id(order.client_order_id()))
        {
            return Some(position_id.clone());
        }
        if let Some(spawn_id) = order.exec_spawn_id() {
            let sibling = cache
                .orders_for_exec_spawn(spawn_id)
                .into_iter()
                .find_map(|member| cache.position_id(member.client_order_id()));
            if let Some(position_id) = sibling {
                return Some(position_id.clone());
            }
        }
        order
            .parent_order_id()
            .and_then(|parent| cache.position_id(parent))
            .cloned()
    }

    // ========================================================================
    // Position Updates
    // ========================================================================

    pub(super) fn handle_order_fill(&mut self, order: &Order, fill: &OrderFilled, oms_type: OmsType) {
        let Some(instrument) = self.cache.read().instrument(&fill.header.instrument_id).cloned()
        else {
            error!(
                client_order_id = %order.client_order_id(),
                instrument_id = %fill.header.instrument_id,
                "Cannot handle fill: instrument not found"
            );
            return;
        };
        let Some(position_id) = fill.position_id.clone() else {
            error!(client_order_id = %order.client_order_id(), "Cannot handle fill: no position ID");
            return;
        };

        let existing = self.cache.read().position(&position_id).cloned();
        match existing {
            None => self.open_position(&instrument, fill, oms_type),
            Some(position) if position.is_closed() => self.reopen_position(position, fill),
            Some(position) if will_flip(&position, fill) => {
                self.flip_position(&instrument, position, fill, oms_type);
            }
            Some(position) => self.update_position(position, fill),
        }

        update_open_positions(self.cache.read().positions_open_count(&QueryFilter::all()));
    }

    fn open_position(&mut self, instrument: &Instrument, fill: &OrderFilled, oms_type: OmsType) {
        let position = match Position::new(instrument, fill) {
            Ok(position) => position,
            Err(e) => {
                error!(trade_id = %fill.trade_id, error = %e, "Cannot open position");
                return;
            }
        };
        if let Err(e) = self.cache.write().add_position(position.clone(), oms_type) {
            error!(position_id = %position.id(), error = %e, "Cannot cache position");
            return;
        }
        debug!(position_id = %position.id(), side = %position.side(), "Position opened");
        self.publish_position_event(PositionEvent::opened(&position, self.clock.now()));
    }

    fn reopen_position(&mut self, mut position: Position, fill: &OrderFilled) {
        if let Err(e) = position.apply(fill) {
            warn!(position_id = %position.id(), error = %e, "Cannot reopen position");
            return;
        }
        if let Err(e) = self.cache.write().update_position(position.clone()) {
            error!(position_id = %position.id(), error = %e, "Cannot update position");
            return;
        }
        debug!(position_id = %position.id(), side = %position.side(), "Position reopened");
        self.publish_position_event(PositionEvent::opened(&position, self.clock.now()));
    }

    fn update_position(&mut self, mut position: Position, fill: &OrderFilled) {
        if let Err(e) = position.apply(fill) {
            warn!(position_id = %position.id(), error = %e, "Fill not applied to position");
            return;
        }
        if let Err(e) = self.cache.write().update_position(position.clone()) {
            error!(position_id = %position.id(), error = %e, "Cannot update position");
            return;
        }
        self.publish_position_event(PositionEvent::after_fill(&position, self.clock.now()));
    }

    /// Close `position` with the part of `fill` that takes it to flat, then
    /// open (or reopen) `<position_id>F` with the rest.
    fn flip_position(
        &mut self,
        instrument: &Instrument,
        position: Position,
        fill: &OrderFilled,
        oms_type: OmsType,
    ) {
        let closing_qty = position.quantity();
        let difference = fill.last_qty.saturating_sub(closing_qty);
        let fill_percent = closing_qty.as_decimal() / fill.last_qty.as_decimal();
        let (closing_commission, opening_commission) = match &fill.commission {
            Some(commission) => {
                let closing = commission.scaled(fill_percent);
                let opening = commission.checked_sub(&closing).ok();
                (Some(closing), opening)
            }
            None => (None, None),
        };

        let mut closing = fill.clone();
        closing.header.event_id = UUID4::new_v4();
        closing.last_qty = closing_qty;
        closing.commission = closing_commission;
        let position_id = position.id().clone();
        self.update_position(position, &closing);

        if difference.is_zero() {
            warn!(%position_id, trade_id = %fill.trade_id, "Zero quantity left after flip, not opening");
            return;
        }

        let flipped_id = position_id.flipped();
        let mut opening = fill.clone();
        opening.header.event_id = UUID4::new_v4();
        opening.position_id = Some(flipped_id.clone());
        opening.last_qty = difference;
        opening.commission = opening_commission;

        self.cache.write().add_position_id(
            &flipped_id,
            &fill.header.client_order_id,
            &fill.header.strategy_id,
        );
        let existing = self.cache.read().position(&flipped_id).cloned();
        match existing {
            None => self.open_position(instrument, &opening, oms_type),
            Some(flipped) if flipped.is_closed() => self.reopen_position(flipped, &opening),
            Some(_) => error!(%flipped_id, "Cannot flip into a position that is already open"),
        }
    }

    fn publish_position_event(&self, event: PositionEvent) {
        let topic = topics::position_events(event.strategy_id());
        self.bus.publish(&topic, BusMessage::PositionEvent(event));
    }
}

/// The fill reduces the position by more than its quantity.
fn will_flip(position: &Position, fill: &OrderFilled) -> bool {
    position.is_opposite_side(fill.order_side) && fill.last_qty > position.quantity()
}
