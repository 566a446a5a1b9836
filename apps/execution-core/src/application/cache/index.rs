//! Cache Index
//!
//! Secondary indices over the cache's primary stores. Every set holds IDs
//! only; records are resolved through the primary maps. Status sets also
//! keep their size per venue, instrument and strategy.

use std::collections::{HashMap, HashSet, hash_set};
use std::hash::Hash;
use std::ops::Deref;

use crate::domain::order_execution::{Order, OrderStatus};
use crate::domain::position_management::Position;
use crate::domain::shared::{
    AccountId, ClientId, ClientOrderId, ExecAlgorithmId, InstrumentId, PositionId, StrategyId,
    Venue, VenueOrderId,
};

// ============================================================================
// Tallied Sets
// ============================================================================

/// Grouping keys of one indexed order or position.
#[derive(Debug)]
pub(super) struct TallyKey<'a> {
    venue: Venue,
    instrument_id: &'a InstrumentId,
    strategy_id: &'a StrategyId,
}

impl<'a> TallyKey<'a> {
    pub(super) fn for_order(order: &'a Order) -> Self {
        Self {
            venue: order.venue(),
            instrument_id: order.instrument_id(),
            strategy_id: order.strategy_id(),
        }
    }

    pub(super) fn for_position(position: &'a Position) -> Self {
        Self {
            venue: position.instrument_id().venue(),
            instrument_id: position.instrument_id(),
            strategy_id: position.strategy_id(),
        }
    }
}

/// ID set that keeps its size per venue, instrument and strategy.
///
/// Reads go through `Deref` to the underlying `HashSet`; writes must go
/// through [`insert`](Self::insert) and [`remove`](Self::remove) so the
/// tallies follow membership.
#[derive(Debug, Clone)]
pub struct TalliedSet<K> {
    ids: HashSet<K>,
    by_venue: HashMap<Venue, usize>,
    by_instrument: HashMap<InstrumentId, usize>,
    by_strategy: HashMap<StrategyId, usize>,
}

impl<K> Default for TalliedSet<K> {
    fn default() -> Self {
        Self {
            ids: HashSet::new(),
            by_venue: HashMap::new(),
            by_instrument: HashMap::new(),
            by_strategy: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> TalliedSet<K> {
    /// Add `id`; tallies move only if it was absent.
    pub(super) fn insert(&mut self, id: &K, key: &TallyKey<'_>) {
        if self.ids.insert(id.clone()) {
            *self.by_venue.entry(key.venue.clone()).or_default() += 1;
            *self.by_instrument.entry(key.instrument_id.clone()).or_default() += 1;
            *self.by_strategy.entry(key.strategy_id.clone()).or_default() += 1;
        }
    }

    /// Remove `id`; tallies move only if it was present.
    pub(super) fn remove(&mut self, id: &K, key: &TallyKey<'_>) {
        if self.ids.remove(id) {
            decrement(&mut self.by_venue, &key.venue);
            decrement(&mut self.by_instrument, key.instrument_id);
            decrement(&mut self.by_strategy, key.strategy_id);
        }
    }

    /// The plain ID set.
    #[must_use]
    pub const fn as_set(&self) -> &HashSet<K> {
        &self.ids
    }

    /// Size restricted to at most one of venue, instrument or strategy.
    /// `None` when more than one is given.
    #[must_use]
    pub fn tallied_len(
        &self,
        venue: Option<&Venue>,
        instrument_id: Option<&InstrumentId>,
        strategy_id: Option<&StrategyId>,
    ) -> Option<usize> {
        match (venue, instrument_id, strategy_id) {
            (None, None, None) => Some(self.ids.len()),
            (Some(venue), None, None) => Some(self.by_venue.get(venue).copied().unwrap_or(0)),
            (None, Some(id), None) => Some(self.by_instrument.get(id).copied().unwrap_or(0)),
            (None, None, Some(id)) => Some(self.by_strategy.get(id).copied().unwrap_or(0)),
            _ => None,
        }
    }

    /// Returns true if every tally sums to the set size.
    #[must_use]
    pub fn tallies_match(&self) -> bool {
        let len = self.ids.len();
        self.by_venue.values().sum::<usize>() == len
            && self.by_instrument.values().sum::<usize>() == len
            && self.by_strategy.values().sum::<usize>() == len
    }
}

fn decrement<G: Eq + Hash>(counts: &mut HashMap<G, usize>, group: &G) {
    if let Some(count) = counts.get_mut(group) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            counts.remove(group);
        }
    }
}

impl<K> Deref for TalliedSet<K> {
    type Target = HashSet<K>;

    fn deref(&self) -> &Self::Target {
        &self.ids
    }
}

impl<'a, K> IntoIterator for &'a TalliedSet<K> {
    type Item = &'a K;
    type IntoIter = hash_set::Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

// ============================================================================
// Cache Index
// ============================================================================

/// Secondary indices maintained by the [`Cache`](super::Cache).
#[derive(Debug, Clone, Default)]
pub struct CacheIndex {
    pub(super) venue_account: HashMap<Venue, AccountId>,
    pub(super) venue_orders: HashMap<Venue, HashSet<ClientOrderId>>,
    pub(super) venue_positions: HashMap<Venue, HashSet<PositionId>>,
    pub(super) venue_order_ids: HashMap<VenueOrderId, ClientOrderId>,
    pub(super) client_order_ids: HashMap<ClientOrderId, VenueOrderId>,
    pub(super) order_position: HashMap<ClientOrderId, PositionId>,
    pub(super) order_strategy: HashMap<ClientOrderId, StrategyId>,
    pub(super) order_client: HashMap<ClientOrderId, ClientId>,
    pub(super) position_strategy: HashMap<PositionId, StrategyId>,
    pub(super) position_orders: HashMap<PositionId, HashSet<ClientOrderId>>,
    pub(super) instrument_orders: HashMap<InstrumentId, HashSet<ClientOrderId>>,
    pub(super) instrument_positions: HashMap<InstrumentId, HashSet<PositionId>>,
    pub(super) strategy_orders: HashMap<StrategyId, HashSet<ClientOrderId>>,
    pub(super) strategy_positions: HashMap<StrategyId, HashSet<PositionId>>,
    pub(super) exec_algorithm_orders: HashMap<ExecAlgorithmId, HashSet<ClientOrderId>>,
    pub(super) exec_spawn_orders: HashMap<ClientOrderId, HashSet<ClientOrderId>>,
    pub(super) orders: TalliedSet<ClientOrderId>,
    pub(super) orders_open: TalliedSet<ClientOrderId>,
    pub(super) orders_closed: TalliedSet<ClientOrderId>,
    pub(super) orders_emulated: TalliedSet<ClientOrderId>,
    pub(super) orders_inflight: TalliedSet<ClientOrderId>,
    pub(super) orders_pending_cancel: TalliedSet<ClientOrderId>,
    pub(super) positions: TalliedSet<PositionId>,
    pub(super) positions_open: TalliedSet<PositionId>,
    pub(super) positions_closed: TalliedSet<PositionId>,
    pub(super) strategies: HashSet<StrategyId>,
    pub(super) exec_algorithms: HashSet<ExecAlgorithmId>,
}

impl CacheIndex {
    /// Drop every index entry.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Index the identity of a newly added order.
    pub(super) fn insert_order(&mut self, order: &Order) {
        let id = order.client_order_id().clone();
        let strategy_id = order.strategy_id().clone();

        self.venue_orders
            .entry(order.venue())
            .or_default()
            .insert(id.clone());
        self.instrument_orders
            .entry(order.instrument_id().clone())
            .or_default()
            .insert(id.clone());
        self.strategy_orders
            .entry(strategy_id.clone())
            .or_default()
            .insert(id.clone());
        self.order_strategy.insert(id.clone(), strategy_id.clone());
        self.strategies.insert(strategy_id);

        if let Some(algorithm_id) = order.exec_algorithm_id() {
            self.exec_algorithms.insert(algorithm_id.clone());
            self.exec_algorithm_orders
                .entry(algorithm_id.clone())
                .or_default()
                .insert(id.clone());
        }
        if let Some(spawn_id) = order.exec_spawn_id() {
            self.exec_spawn_orders
                .entry(spawn_id.clone())
                .or_default()
                .insert(id.clone());
        }
        if let Some(venue_order_id) = order.venue_order_id() {
            self.venue_order_ids
                .insert(venue_order_id.clone(), id.clone());
            self.client_order_ids
                .insert(id.clone(), venue_order_id.clone());
        }

        self.orders.insert(&id, &TallyKey::for_order(order));
        self.index_order_status(order);
    }

    /// Move an order between the status sets to match its current status.
    pub(super) fn index_order_status(&mut self, order: &Order) {
        let id = order.client_order_id();
        let key = TallyKey::for_order(order);

        if order.is_open() {
            self.orders_closed.remove(id, &key);
            self.orders_open.insert(id, &key);
        } else if order.is_closed() {
            self.orders_open.remove(id, &key);
            self.orders_closed.insert(id, &key);
        } else {
            self.orders_open.remove(id, &key);
            self.orders_closed.remove(id, &key);
        }

        if order.is_emulated() {
            self.orders_emulated.insert(id, &key);
        } else {
            self.orders_emulated.remove(id, &key);
        }

        if order.is_inflight() {
            self.orders_inflight.insert(id, &key);
        } else {
            self.orders_inflight.remove(id, &key);
        }

        if order.status() == OrderStatus::PendingCancel {
            self.orders_pending_cancel.insert(id, &key);
        } else if order.is_closed() {
            self.orders_pending_cancel.remove(id, &key);
        }
    }

    /// Index a position and the orders that contributed to it.
    pub(super) fn insert_position(&mut self, position: &Position) {
        let id = position.id().clone();
        let strategy_id = position.strategy_id().clone();

        self.positions.insert(&id, &TallyKey::for_position(position));
        self.position_strategy.insert(id.clone(), strategy_id.clone());
        self.instrument_positions
            .entry(position.instrument_id().clone())
            .or_default()
            .insert(id.clone());
        self.strategy_positions
            .entry(strategy_id.clone())
            .or_default()
            .insert(id.clone());
        self.venue_positions
            .entry(position.instrument_id().venue())
            .or_default()
            .insert(id.clone());
        self.strategies.insert(strategy_id);

        self.index_position_orders(position);
        self.index_position_status(position);
    }

    /// Link every contributing order to the position.
    pub(super) fn index_position_orders(&mut self, position: &Position) {
        let id = position.id();
        for client_order_id in position.client_order_ids() {
            self.order_position
                .insert(client_order_id.clone(), id.clone());
            self.position_orders
                .entry(id.clone())
                .or_default()
                .insert(client_order_id);
        }
    }

    /// Move a position between the open and closed sets.
    pub(super) fn index_position_status(&mut self, position: &Position) {
        let id = position.id();
        let key = TallyKey::for_position(position);
        if position.is_open() {
            self.positions_closed.remove(id, &key);
            self.positions_open.insert(id, &key);
        } else {
            self.positions_open.remove(id, &key);
            self.positions_closed.insert(id, &key);
        }
    }

    /// Map an order to a position before the position exists.
    pub(super) fn link_order_position(
        &mut self,
        client_order_id: &ClientOrderId,
        position_id: &PositionId,
        strategy_id: &StrategyId,
    ) {
        self.order_position
            .insert(client_order_id.clone(), position_id.clone());
        self.position_strategy
            .insert(position_id.clone(), strategy_id.clone());
        self.position_orders
            .entry(position_id.clone())
            .or_default()
            .insert(client_order_id.clone());
    }
}
