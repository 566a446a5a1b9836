//! Cache queries.
//!
//! Results come back in insertion order. Counts filtered by at most one of
//! venue, instrument or strategy read a maintained tally; other filters scan
//! the narrowest matching index group.

use std::collections::HashSet;
use std::hash::Hash;

use rust_decimal::Decimal;

use super::Cache;
use super::index::TalliedSet;
use crate::domain::account::Account;
use crate::domain::order_execution::{Order, OrderList, OrderSide};
use crate::domain::position_management::{Position, PositionSide};
use crate::domain::reference_data::{Instrument, PriceType};
use crate::domain::shared::{
    AccountId, ClientId, ClientOrderId, ExecAlgorithmId, InstrumentId, OrderListId, PositionId,
    Price, Quantity, StrategyId, Venue, VenueOrderId,
};

/// Optional filters for order and position queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    /// Only this venue.
    pub venue: Option<Venue>,
    /// Only this instrument.
    pub instrument_id: Option<InstrumentId>,
    /// Only this strategy.
    pub strategy_id: Option<StrategyId>,
    /// Only orders on this side.
    pub order_side: Option<OrderSide>,
    /// Only positions on this side.
    pub position_side: Option<PositionSide>,
}

impl QueryFilter {
    /// Filter that matches everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to a venue.
    #[must_use]
    pub fn venue(mut self, venue: Venue) -> Self {
        self.venue = Some(venue);
        self
    }

    /// Restrict to an instrument.
    #[must_use]
    pub fn instrument(mut self, instrument_id: InstrumentId) -> Self {
        self.instrument_id = Some(instrument_id);
        self
    }

    /// Restrict to a strategy.
    #[must_use]
    pub fn strategy(mut self, strategy_id: StrategyId) -> Self {
        self.strategy_id = Some(strategy_id);
        self
    }

    /// Restrict orders to a side.
    #[must_use]
    pub const fn order_side(mut self, side: OrderSide) -> Self {
        self.order_side = Some(side);
        self
    }

    /// Restrict positions to a side.
    #[must_use]
    pub const fn position_side(mut self, side: PositionSide) -> Self {
        self.position_side = Some(side);
        self
    }

    /// Returns true if no restriction is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.venue.is_none()
            && self.instrument_id.is_none()
            && self.strategy_id.is_none()
            && self.order_side.is_none()
            && self.position_side.is_none()
    }

    fn matches_order(&self, order: &Order) -> bool {
        self.venue.as_ref().is_none_or(|v| &order.venue() == v)
            && self
                .instrument_id
                .as_ref()
                .is_none_or(|i| order.instrument_id() == i)
            && self
                .strategy_id
                .as_ref()
                .is_none_or(|s| order.strategy_id() == s)
            && self.order_side.is_none_or(|side| order.side() == side)
    }

    fn matches_position(&self, position: &Position) -> bool {
        self.venue
            .as_ref()
            .is_none_or(|v| &position.instrument_id().venue() == v)
            && self
                .instrument_id
                .as_ref()
                .is_none_or(|i| position.instrument_id() == i)
            && self
                .strategy_id
                .as_ref()
                .is_none_or(|s| position.strategy_id() == s)
            && self
                .position_side
                .is_none_or(|side| position.side() == side)
    }
}

fn in_insertion_order<'a, K, V>(
    ids: impl Iterator<Item = &'a K>,
    store: &'a std::collections::HashMap<K, V>,
    sequence: &std::collections::HashMap<K, u64>,
    keep: impl Fn(&V) -> bool,
) -> Vec<&'a V>
where
    K: Eq + Hash + 'a,
{
    let mut found: Vec<(u64, &V)> = ids
        .filter_map(|id| {
            let value = store.get(id)?;
            keep(value).then(|| (sequence.get(id).copied().unwrap_or(u64::MAX), value))
        })
        .collect();
    found.sort_by_key(|(seq, _)| *seq);
    found.into_iter().map(|(_, value)| value).collect()
}

/// Smallest of `set` and the filtered groups; `None` when a filtered group
/// does not exist, so nothing can match.
fn narrowest<'a, K>(
    set: &'a HashSet<K>,
    groups: [Option<Option<&'a HashSet<K>>>; 3],
) -> Option<&'a HashSet<K>> {
    let mut candidates = set;
    for group in groups.into_iter().flatten() {
        let group = group?;
        if group.len() < candidates.len() {
            candidates = group;
        }
    }
    Some(candidates)
}

impl Cache {
    // ========================================================================
    // Order Queries
    // ========================================================================

    fn query_orders<'a>(
        &'a self,
        set: &'a HashSet<ClientOrderId>,
        filter: &QueryFilter,
    ) -> Vec<&'a Order> {
        in_insertion_order(set.iter(), &self.orders, &self.order_sequence, |o| {
            filter.matches_order(o)
        })
    }

    fn count_orders(&self, set: &TalliedSet<ClientOrderId>, filter: &QueryFilter) -> usize {
        let (venue, instrument_id, strategy_id) = (
            filter.venue.as_ref(),
            filter.instrument_id.as_ref(),
            filter.strategy_id.as_ref(),
        );
        let tallied = filter
            .order_side
            .is_none()
            .then(|| set.tallied_len(venue, instrument_id, strategy_id))
            .flatten();
        if let Some(count) = tallied {
            return count;
        }
        let groups = [
            venue.map(|v| self.index.venue_orders.get(v)),
            instrument_id.map(|i| self.index.instrument_orders.get(i)),
            strategy_id.map(|s| self.index.strategy_orders.get(s)),
        ];
        let Some(candidates) = narrowest(set.as_set(), groups) else {
            return 0;
        };
        candidates
            .iter()
            .filter(|id| set.contains(*id))
            .filter_map(|id| self.orders.get(id))
            .filter(|o| filter.matches_order(o))
            .count()
    }

    /// Order by client order ID.
    #[must_use]
    pub fn order(&self, client_order_id: &ClientOrderId) -> Option<&Order> {
        self.orders.get(client_order_id)
    }

    /// Returns true if the order is cached.
    #[must_use]
    pub fn order_exists(&self, client_order_id: &ClientOrderId) -> bool {
        self.orders.contains_key(client_order_id)
    }

    /// Client order ID mapped to a venue order ID.
    #[must_use]
    pub fn client_order_id(&self, venue_order_id: &VenueOrderId) -> Option<&ClientOrderId> {
        self.index.venue_order_ids.get(venue_order_id)
    }

    /// Venue order ID mapped to a client order ID.
    #[must_use]
    pub fn venue_order_id(&self, client_order_id: &ClientOrderId) -> Option<&VenueOrderId> {
        self.index.client_order_ids.get(client_order_id)
    }

    /// Venue client the order was routed through.
    #[must_use]
    pub fn client_id(&self, client_order_id: &ClientOrderId) -> Option<&ClientId> {
        self.index.order_client.get(client_order_id)
    }

    /// Strategy owning an order.
    #[must_use]
    pub fn strategy_id_for_order(&self, client_order_id: &ClientOrderId) -> Option<&StrategyId> {
        self.index.order_strategy.get(client_order_id)
    }

    /// All orders.
    #[must_use]
    pub fn orders(&self, filter: &QueryFilter) -> Vec<&Order> {
        self.query_orders(&self.index.orders, filter)
    }

    /// Working orders.
    #[must_use]
    pub fn orders_open(&self, filter: &QueryFilter) -> Vec<&Order> {
        self.query_orders(&self.index.orders_open, filter)
    }

    /// Orders in a terminal status.
    #[must_use]
    pub fn orders_closed(&self, filter: &QueryFilter) -> Vec<&Order> {
        self.query_orders(&self.index.orders_closed, filter)
    }

    /// Orders held locally.
    #[must_use]
    pub fn orders_emulated(&self, filter: &QueryFilter) -> Vec<&Order> {
        self.query_orders(&self.index.orders_emulated, filter)
    }

    /// Orders awaiting a venue acknowledgement.
    #[must_use]
    pub fn orders_inflight(&self, filter: &QueryFilter) -> Vec<&Order> {
        self.query_orders(&self.index.orders_inflight, filter)
    }

    /// Orders managed by an execution algorithm.
    #[must_use]
    pub fn orders_for_exec_algorithm(
        &self,
        exec_algorithm_id: &ExecAlgorithmId,
        filter: &QueryFilter,
    ) -> Vec<&Order> {
        self.index
            .exec_algorithm_orders
            .get(exec_algorithm_id)
            .map_or_else(Vec::new, |set| self.query_orders(set, filter))
    }

    /// Every member of an exec-spawn family, primary first.
    #[must_use]
    pub fn orders_for_exec_spawn(&self, exec_spawn_id: &ClientOrderId) -> Vec<&Order> {
        self.index
            .exec_spawn_orders
            .get(exec_spawn_id)
            .map_or_else(Vec::new, |set| self.query_orders(set, &QueryFilter::all()))
    }

    /// Orders whose fills went to a position.
    #[must_use]
    pub fn orders_for_position(&self, position_id: &PositionId) -> Vec<&Order> {
        self.index
            .position_orders
            .get(position_id)
            .map_or_else(Vec::new, |set| self.query_orders(set, &QueryFilter::all()))
    }

    /// Number of cached orders.
    #[must_use]
    pub fn orders_total_count(&self, filter: &QueryFilter) -> usize {
        self.count_orders(&self.index.orders, filter)
    }

    /// Number of working orders.
    #[must_use]
    pub fn orders_open_count(&self, filter: &QueryFilter) -> usize {
        self.count_orders(&self.index.orders_open, filter)
    }

    /// Number of closed orders.
    #[must_use]
    pub fn orders_closed_count(&self, filter: &QueryFilter) -> usize {
        self.count_orders(&self.index.orders_closed, filter)
    }

    /// Number of locally held orders.
    #[must_use]
    pub fn orders_emulated_count(&self, filter: &QueryFilter) -> usize {
        self.count_orders(&self.index.orders_emulated, filter)
    }

    /// Number of in-flight orders.
    #[must_use]
    pub fn orders_inflight_count(&self, filter: &QueryFilter) -> usize {
        self.count_orders(&self.index.orders_inflight, filter)
    }

    /// Returns true if the order is working.
    #[must_use]
    pub fn is_order_open(&self, client_order_id: &ClientOrderId) -> bool {
        self.index.orders_open.contains(client_order_id)
    }

    /// Returns true if the order is closed.
    #[must_use]
    pub fn is_order_closed(&self, client_order_id: &ClientOrderId) -> bool {
        self.index.orders_closed.contains(client_order_id)
    }

    /// Returns true if the order is held locally.
    #[must_use]
    pub fn is_order_emulated(&self, client_order_id: &ClientOrderId) -> bool {
        self.index.orders_emulated.contains(client_order_id)
    }

    /// Returns true if the order awaits a venue acknowledgement.
    #[must_use]
    pub fn is_order_inflight(&self, client_order_id: &ClientOrderId) -> bool {
        self.index.orders_inflight.contains(client_order_id)
    }

    /// Returns true if a cancel was requested for the order.
    #[must_use]
    pub fn is_order_pending_cancel(&self, client_order_id: &ClientOrderId) -> bool {
        self.index.orders_pending_cancel.contains(client_order_id)
    }

    /// Order list by ID.
    #[must_use]
    pub fn order_list(&self, order_list_id: &OrderListId) -> Option<&OrderList> {
        self.order_lists.get(order_list_id)
    }

    /// All order lists.
    #[must_use]
    pub fn order_lists(&self) -> Vec<&OrderList> {
        self.order_lists.values().collect()
    }

    /// IDs of every strategy seen.
    #[must_use]
    pub const fn strategy_ids(&self) -> &HashSet<StrategyId> {
        &self.index.strategies
    }

    /// IDs of every execution algorithm seen.
    #[must_use]
    pub const fn exec_algorithm_ids(&self) -> &HashSet<ExecAlgorithmId> {
        &self.index.exec_algorithms
    }

    // ========================================================================
    // Exec-Spawn Totals
    // ========================================================================

    fn exec_spawn_sum(
        &self,
        exec_spawn_id: &ClientOrderId,
        active_only: bool,
        value: impl Fn(&Order) -> Quantity,
    ) -> Option<Quantity> {
        let family = self.orders_for_exec_spawn(exec_spawn_id);
        if family.is_empty() {
            return None;
        }
        Some(
            family
                .into_iter()
                .filter(|o| !active_only || !o.is_closed())
                .map(value)
                .sum(),
        )
    }

    /// Sum of member quantities, or `None` for an unknown family.
    #[must_use]
    pub fn exec_spawn_total_quantity(
        &self,
        exec_spawn_id: &ClientOrderId,
        active_only: bool,
    ) -> Option<Quantity> {
        self.exec_spawn_sum(exec_spawn_id, active_only, Order::quantity)
    }

    /// Sum of member filled quantities.
    #[must_use]
    pub fn exec_spawn_total_filled_qty(
        &self,
        exec_spawn_id: &ClientOrderId,
        active_only: bool,
    ) -> Option<Quantity> {
        self.exec_spawn_sum(exec_spawn_id, active_only, Order::filled_qty)
    }

    /// Sum of member leaves quantities.
    #[must_use]
    pub fn exec_spawn_total_leaves_qty(
        &self,
        exec_spawn_id: &ClientOrderId,
        active_only: bool,
    ) -> Option<Quantity> {
        self.exec_spawn_sum(exec_spawn_id, active_only, Order::leaves_qty)
    }

    // ========================================================================
    // Position Queries
    // ========================================================================

    fn query_positions<'a>(
        &'a self,
        set: &'a HashSet<PositionId>,
        filter: &QueryFilter,
    ) -> Vec<&'a Position> {
        in_insertion_order(set.iter(), &self.positions, &self.position_sequence, |p| {
            filter.matches_position(p)
        })
    }

    fn count_positions(&self, set: &TalliedSet<PositionId>, filter: &QueryFilter) -> usize {
        let (venue, instrument_id, strategy_id) = (
            filter.venue.as_ref(),
            filter.instrument_id.as_ref(),
            filter.strategy_id.as_ref(),
        );
        let tallied = filter
            .position_side
            .is_none()
            .then(|| set.tallied_len(venue, instrument_id, strategy_id))
            .flatten();
        if let Some(count) = tallied {
            return count;
        }
        let groups = [
            venue.map(|v| self.index.venue_positions.get(v)),
            instrument_id.map(|i| self.index.instrument_positions.get(i)),
            strategy_id.map(|s| self.index.strategy_positions.get(s)),
        ];
        let Some(candidates) = narrowest(set.as_set(), groups) else {
            return 0;
        };
        candidates
            .iter()
            .filter(|id| set.contains(*id))
            .filter_map(|id| self.positions.get(id))
            .filter(|p| filter.matches_position(p))
            .count()
    }

    /// Position by ID.
    #[must_use]
    pub fn position(&self, position_id: &PositionId) -> Option<&Position> {
        self.positions.get(position_id)
    }

    /// Returns true if the position is cached.
    #[must_use]
    pub fn position_exists(&self, position_id: &PositionId) -> bool {
        self.positions.contains_key(position_id)
    }

    /// Position ID an order's fills went to.
    #[must_use]
    pub fn position_id(&self, client_order_id: &ClientOrderId) -> Option<&PositionId> {
        self.index.order_position.get(client_order_id)
    }

    /// Position an order's fills went to.
    #[must_use]
    pub fn position_for_order(&self, client_order_id: &ClientOrderId) -> Option<&Position> {
        self.position_id(client_order_id)
            .and_then(|id| self.positions.get(id))
    }

    /// Strategy owning a position.
    #[must_use]
    pub fn strategy_id_for_position(&self, position_id: &PositionId) -> Option<&StrategyId> {
        self.index.position_strategy.get(position_id)
    }

    /// All positions.
    #[must_use]
    pub fn positions(&self, filter: &QueryFilter) -> Vec<&Position> {
        self.query_positions(&self.index.positions, filter)
    }

    /// Open positions.
    #[must_use]
    pub fn positions_open(&self, filter: &QueryFilter) -> Vec<&Position> {
        self.query_positions(&self.index.positions_open, filter)
    }

    /// Closed positions.
    #[must_use]
    pub fn positions_closed(&self, filter: &QueryFilter) -> Vec<&Position> {
        self.query_positions(&self.index.positions_closed, filter)
    }

    /// Number of cached positions.
    #[must_use]
    pub fn positions_total_count(&self, filter: &QueryFilter) -> usize {
        self.count_positions(&self.index.positions, filter)
    }

    /// Number of open positions.
    #[must_use]
    pub fn positions_open_count(&self, filter: &QueryFilter) -> usize {
        self.count_positions(&self.index.positions_open, filter)
    }

    /// Number of closed positions.
    #[must_use]
    pub fn positions_closed_count(&self, filter: &QueryFilter) -> usize {
        self.count_positions(&self.index.positions_closed, filter)
    }

    /// Returns true if the position is open.
    #[must_use]
    pub fn is_position_open(&self, position_id: &PositionId) -> bool {
        self.index.positions_open.contains(position_id)
    }

    /// Returns true if the position is closed.
    #[must_use]
    pub fn is_position_closed(&self, position_id: &PositionId) -> bool {
        self.index.positions_closed.contains(position_id)
    }

    /// Net signed quantity over the open positions of an instrument,
    /// optionally for one strategy only.
    #[must_use]
    pub fn net_position_quantity(
        &self,
        instrument_id: &InstrumentId,
        strategy_id: Option<&StrategyId>,
    ) -> Decimal {
        let mut filter = QueryFilter::all().instrument(instrument_id.clone());
        filter.strategy_id = strategy_id.cloned();
        self.positions_open(&filter)
            .into_iter()
            .map(Position::signed_qty)
            .sum()
    }

    // ========================================================================
    // Accounts and Reference Data
    // ========================================================================

    /// Account by ID.
    #[must_use]
    pub fn account(&self, account_id: &AccountId) -> Option<&Account> {
        self.accounts.get(account_id)
    }

    /// All accounts.
    #[must_use]
    pub fn accounts(&self) -> Vec<&Account> {
        self.accounts.values().collect()
    }

    /// Account whose issuer is `venue`.
    #[must_use]
    pub fn account_for_venue(&self, venue: &Venue) -> Option<&Account> {
        self.index
            .venue_account
            .get(venue)
            .and_then(|id| self.accounts.get(id))
    }

    /// Instrument by ID.
    #[must_use]
    pub fn instrument(&self, instrument_id: &InstrumentId) -> Option<&Instrument> {
        self.instruments.get(instrument_id)
    }

    /// All instruments, optionally for one venue.
    #[must_use]
    pub fn instruments(&self, venue: Option<&Venue>) -> Vec<&Instrument> {
        self.instruments
            .values()
            .filter(|i| venue.is_none_or(|v| &i.id.venue() == v))
            .collect()
    }

    /// Latest price of a type for an instrument.
    #[must_use]
    pub fn price(&self, instrument_id: &InstrumentId, price_type: PriceType) -> Option<Price> {
        self.prices
            .get(&(instrument_id.clone(), price_type))
            .copied()
    }
}
