//! Cache
//!
//! The authoritative in-memory store of orders, positions, accounts,
//! instruments and latest prices, with secondary indices for fast queries.
//! An optional [`CacheDatabase`] receives every mutation (write-through) and
//! seeds the cache on [`Cache::load`].
//!
//! The cache is shared by the risk engine, execution engine and algorithm
//! runtime as [`SharedCache`]; all mutation happens on the engine loop.

mod index;
mod queries;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

pub use index::CacheIndex;
pub use queries::QueryFilter;

use crate::application::ports::{CacheDatabase, CacheError};
use crate::domain::account::Account;
use crate::domain::order_execution::{Order, OrderList};
use crate::domain::position_management::{OmsType, Position};
use crate::domain::reference_data::{Instrument, PriceType};
use crate::domain::shared::{
    AccountId, ClientId, ClientOrderId, InstrumentId, OrderListId, PositionId, Price, StrategyId,
    VenueOrderId,
};

/// Cache shared between engines.
pub type SharedCache = Arc<RwLock<Cache>>;

/// Cache settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Clear instruments (and prices) on [`Cache::reset`].
    pub drop_instruments_on_reset: bool,
}

/// Store of orders, positions, accounts and reference data.
pub struct Cache {
    config: CacheConfig,
    index: CacheIndex,
    database: Option<Box<dyn CacheDatabase>>,
    orders: HashMap<ClientOrderId, Order>,
    order_sequence: HashMap<ClientOrderId, u64>,
    positions: HashMap<PositionId, Position>,
    position_sequence: HashMap<PositionId, u64>,
    next_sequence: u64,
    order_lists: HashMap<OrderListId, OrderList>,
    accounts: HashMap<AccountId, Account>,
    instruments: HashMap<InstrumentId, Instrument>,
    prices: HashMap<(InstrumentId, PriceType), Price>,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("orders", &self.orders.len())
            .field("positions", &self.positions.len())
            .field("accounts", &self.accounts.len())
            .field("instruments", &self.instruments.len())
            .field("has_database", &self.database.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(CacheConfig::default(), None)
    }
}

impl Cache {
    /// Create an empty cache, optionally backed by a durable store.
    #[must_use]
    pub fn new(config: CacheConfig, database: Option<Box<dyn CacheDatabase>>) -> Self {
        Self {
            config,
            index: CacheIndex::default(),
            database,
            orders: HashMap::new(),
            order_sequence: HashMap::new(),
            positions: HashMap::new(),
            position_sequence: HashMap::new(),
            next_sequence: 0,
            order_lists: HashMap::new(),
            accounts: HashMap::new(),
            instruments: HashMap::new(),
            prices: HashMap::new(),
        }
    }

    /// Wrap in the shared handle used by the engines.
    #[must_use]
    pub fn into_shared(self) -> SharedCache {
        Arc::new(RwLock::new(self))
    }

    /// Settings the cache was built with.
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Current indices.
    #[must_use]
    pub const fn index(&self) -> &CacheIndex {
        &self.index
    }

    fn next_sequence(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Load everything from the durable store and rebuild the indices.
    ///
    /// Does nothing without a store.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails to load.
    pub fn load(&mut self) -> Result<(), CacheError> {
        let Some(database) = &self.database else {
            debug!("No cache database attached, nothing to load");
            return Ok(());
        };

        let instruments = database.load_instruments()?;
        let accounts = database.load_accounts()?;
        let orders = database.load_orders()?;
        let positions = database.load_positions()?;
        let order_position = database.load_index_order_position()?;
        let order_client = database.load_index_order_client()?;

        for instrument in instruments {
            self.instruments.insert(instrument.id.clone(), instrument);
        }
        for account in accounts {
            self.accounts.insert(account.id().clone(), account);
        }
        for order in orders {
            let id = order.client_order_id().clone();
            let sequence = self.next_sequence();
            self.order_sequence.insert(id.clone(), sequence);
            self.orders.insert(id, order);
        }
        for position in positions {
            let id = position.id().clone();
            let sequence = self.next_sequence();
            self.position_sequence.insert(id.clone(), sequence);
            self.positions.insert(id, position);
        }

        self.build_index();
        for (client_order_id, position_id) in order_position {
            if let Some(strategy_id) = self.index.order_strategy.get(&client_order_id).cloned() {
                self.index
                    .link_order_position(&client_order_id, &position_id, &strategy_id);
            }
        }
        self.index.order_client.extend(order_client);

        info!(
            orders = self.orders.len(),
            positions = self.positions.len(),
            accounts = self.accounts.len(),
            instruments = self.instruments.len(),
            "Cache loaded"
        );
        Ok(())
    }

    /// Rebuild every index from the primary stores.
    pub fn build_index(&mut self) {
        self.index.clear();

        for account in self.accounts.values() {
            self.index
                .venue_account
                .insert(account.id().issuer().into(), account.id().clone());
        }
        for order in self.orders.values() {
            self.index.insert_order(order);
        }
        for position in self.positions.values() {
            self.index.insert_position(position);
        }
        for order in self.orders.values() {
            if let Some(position_id) = order.position_id() {
                self.index.link_order_position(
                    order.client_order_id(),
                    position_id,
                    order.strategy_id(),
                );
            }
        }
    }

    /// Drop every index entry, leaving the primary stores untouched.
    pub fn clear_index(&mut self) {
        self.index.clear();
        debug!("Cache index cleared");
    }

    /// Clear all trading state for a fresh session.
    ///
    /// Instruments and prices survive unless `drop_instruments_on_reset` is set.
    pub fn reset(&mut self) {
        self.orders.clear();
        self.order_sequence.clear();
        self.positions.clear();
        self.position_sequence.clear();
        self.next_sequence = 0;
        self.order_lists.clear();
        self.accounts.clear();
        self.index.clear();
        if self.config.drop_instruments_on_reset {
            self.instruments.clear();
            self.prices.clear();
        }
        info!("Cache reset");
    }

    /// Reset and close the durable store.
    pub fn dispose(&mut self) {
        self.reset();
        if let Some(database) = &self.database {
            if let Err(e) = database.close() {
                error!(error = %e, "Failed to close cache database");
            }
        }
    }

    /// Delete everything in the durable store.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails to flush.
    pub fn flush_db(&self) -> Result<(), CacheError> {
        match &self.database {
            Some(database) => {
                database.flush()?;
                info!("Cache database flushed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Verify that every index entry resolves to a primary record and every
    /// primary record is indexed. Failures are logged.
    #[must_use]
    pub fn check_integrity(&self) -> bool {
        let mut failures = 0usize;
        let mut fail = |message: String| {
            error!(%message, "Cache integrity failure");
            failures += 1;
        };

        for id in self.orders.keys() {
            if !self.index.orders.contains(id) {
                fail(format!("order {id} missing from orders index"));
            }
            if !self.index.order_strategy.contains_key(id) {
                fail(format!("order {id} missing from order_strategy index"));
            }
        }
        for id in self.positions.keys() {
            if !self.index.positions.contains(id) {
                fail(format!("position {id} missing from positions index"));
            }
            if !self.index.position_strategy.contains_key(id) {
                fail(format!("position {id} missing from position_strategy index"));
            }
        }

        let order_sets = [
            ("orders", &self.index.orders),
            ("orders_open", &self.index.orders_open),
            ("orders_closed", &self.index.orders_closed),
            ("orders_emulated", &self.index.orders_emulated),
            ("orders_inflight", &self.index.orders_inflight),
            ("orders_pending_cancel", &self.index.orders_pending_cancel),
        ];
        for (name, set) in order_sets {
            if !set.tallies_match() {
                fail(format!("{name} tallies disagree with its size"));
            }
            for id in set {
                if !self.orders.contains_key(id) {
                    fail(format!("{name} index entry {id} has no order"));
                }
            }
        }
        let order_groups = self
            .index
            .venue_orders
            .values()
            .chain(self.index.instrument_orders.values())
            .chain(self.index.strategy_orders.values())
            .chain(self.index.exec_algorithm_orders.values())
            .chain(self.index.exec_spawn_orders.values());
        for set in order_groups {
            for id in set {
                if !self.orders.contains_key(id) {
                    fail(format!("grouped order index entry {id} has no order"));
                }
            }
        }
        for (id, venue_order_id) in &self.index.client_order_ids {
            if !self.orders.contains_key(id) {
                fail(format!("venue order id {venue_order_id} maps to missing order {id}"));
            }
        }
        for id in self.index.order_position.keys() {
            if !self.orders.contains_key(id) {
                fail(format!("order_position index entry {id} has no order"));
            }
        }

        let position_sets = [
            ("positions", &self.index.positions),
            ("positions_open", &self.index.positions_open),
            ("positions_closed", &self.index.positions_closed),
        ];
        for (name, set) in position_sets {
            if !set.tallies_match() {
                fail(format!("{name} tallies disagree with its size"));
            }
            for id in set {
                if !self.positions.contains_key(id) {
                    fail(format!("{name} index entry {id} has no position"));
                }
            }
        }
        let position_groups = self
            .index
            .venue_positions
            .values()
            .chain(self.index.instrument_positions.values())
            .chain(self.index.strategy_positions.values());
        for set in position_groups {
            for id in set {
                if !self.positions.contains_key(id) {
                    fail(format!("grouped position index entry {id} has no position"));
                }
            }
        }

        if failures == 0 {
            debug!("Cache integrity check passed");
            true
        } else {
            error!(failures, "Cache integrity check failed");
            false
        }
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Add a new order, optionally linking it to a position and venue client.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateId` if the client order ID is already cached.
    pub fn add_order(
        &mut self,
        order: Order,
        position_id: Option<PositionId>,
        client_id: Option<ClientId>,
    ) -> Result<(), CacheError> {
        let id = order.client_order_id().clone();
        if self.orders.contains_key(&id) {
            return Err(CacheError::DuplicateId {
                kind: "ClientOrderId",
                id: id.to_string(),
            });
        }

        self.index.insert_order(&order);
        if let Some(position_id) = &position_id {
            self.index
                .link_order_position(&id, position_id, order.strategy_id());
        }
        if let Some(client_id) = &client_id {
            self.index.order_client.insert(id.clone(), client_id.clone());
        }

        if let Some(database) = &self.database {
            if let Err(e) = database.add_order(&order, position_id.as_ref(), client_id.as_ref()) {
                error!(client_order_id = %id, error = %e, "Failed to persist order");
            }
        }

        debug!(client_order_id = %id, status = %order.status(), "Added order");
        let sequence = self.next_sequence();
        self.order_sequence.insert(id.clone(), sequence);
        self.orders.insert(id, order);
        Ok(())
    }

    /// Replace a cached order with its updated state and re-index it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order was never added, or `Consistency` if
    /// its venue order ID conflicts with another order's.
    pub fn update_order(&mut self, order: Order) -> Result<(), CacheError> {
        let id = order.client_order_id().clone();
        if !self.orders.contains_key(&id) {
            return Err(CacheError::NotFound {
                kind: "Order",
                id: id.to_string(),
            });
        }

        if let Some(venue_order_id) = order.venue_order_id() {
            self.add_venue_order_id(&id, venue_order_id, true)?;
        }
        if let Some(position_id) = order.position_id() {
            self.index
                .link_order_position(&id, position_id, order.strategy_id());
        }
        self.index.index_order_status(&order);

        if let Some(database) = &self.database {
            if let Err(e) = database.update_order(&order) {
                error!(client_order_id = %id, error = %e, "Failed to persist order update");
            }
        }

        self.orders.insert(id, order);
        Ok(())
    }

    /// Map a client order ID to its venue order ID.
    ///
    /// # Errors
    ///
    /// Returns `Consistency` if a different mapping exists and `overwrite` is false.
    pub fn add_venue_order_id(
        &mut self,
        client_order_id: &ClientOrderId,
        venue_order_id: &VenueOrderId,
        overwrite: bool,
    ) -> Result<(), CacheError> {
        if let Some(existing) = self.index.client_order_ids.get(client_order_id) {
            if existing != venue_order_id && !overwrite {
                return Err(CacheError::Consistency {
                    message: format!(
                        "{client_order_id} already mapped to {existing}, received {venue_order_id}"
                    ),
                });
            }
            if existing != venue_order_id {
                let stale = existing.clone();
                self.index.venue_order_ids.remove(&stale);
            }
        }
        self.index
            .client_order_ids
            .insert(client_order_id.clone(), venue_order_id.clone());
        self.index
            .venue_order_ids
            .insert(venue_order_id.clone(), client_order_id.clone());
        Ok(())
    }

    /// Record that an order's fills belong to `position_id`.
    pub fn add_position_id(
        &mut self,
        position_id: &PositionId,
        client_order_id: &ClientOrderId,
        strategy_id: &StrategyId,
    ) {
        self.index
            .link_order_position(client_order_id, position_id, strategy_id);
        if let Some(database) = &self.database {
            if let Err(e) = database.index_order_position(client_order_id, position_id) {
                error!(%client_order_id, error = %e, "Failed to persist order position");
            }
        }
        debug!(%client_order_id, %position_id, "Indexed order position");
    }

    /// Add an order list. Its orders are added separately.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateId` if the list ID is already cached.
    pub fn add_order_list(&mut self, order_list: OrderList) -> Result<(), CacheError> {
        let id = order_list.id().clone();
        if self.order_lists.contains_key(&id) {
            return Err(CacheError::DuplicateId {
                kind: "OrderListId",
                id: id.to_string(),
            });
        }
        self.order_lists.insert(id, order_list);
        Ok(())
    }

    // ========================================================================
    // Positions
    // ========================================================================

    /// Add a position.
    ///
    /// Re-adding a closed position's ID replaces it (netting reopen); re-adding
    /// an open one is an error.
    ///
    /// # Errors
    ///
    /// Returns `Consistency` if an open position with the same ID exists.
    pub fn add_position(&mut self, position: Position, oms_type: OmsType) -> Result<(), CacheError> {
        let id = position.id().clone();
        if let Some(existing) = self.positions.get(&id) {
            if existing.is_open() {
                return Err(CacheError::Consistency {
                    message: format!("position {id} already exists and is open"),
                });
            }
            warn!(position_id = %id, %oms_type, "Replacing closed position");
        }

        self.index.insert_position(&position);
        if let Some(database) = &self.database {
            if let Err(e) = database.add_position(&position) {
                error!(position_id = %id, error = %e, "Failed to persist position");
            }
        }

        debug!(position_id = %id, side = %position.side(), "Added position");
        if !self.position_sequence.contains_key(&id) {
            let sequence = self.next_sequence();
            self.position_sequence.insert(id.clone(), sequence);
        }
        self.positions.insert(id, position);
        Ok(())
    }

    /// Replace a cached position with its updated state and re-index it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the position was never added.
    pub fn update_position(&mut self, position: Position) -> Result<(), CacheError> {
        let id = position.id().clone();
        if !self.positions.contains_key(&id) {
            return Err(CacheError::NotFound {
                kind: "Position",
                id: id.to_string(),
            });
        }

        self.index.index_position_orders(&position);
        self.index.index_position_status(&position);
        if let Some(database) = &self.database {
            if let Err(e) = database.update_position(&position) {
                error!(position_id = %id, error = %e, "Failed to persist position update");
            }
        }

        self.positions.insert(id, position);
        Ok(())
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Add an account and index it by its issuer venue.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateId` if the account is already cached.
    pub fn add_account(&mut self, account: Account) -> Result<(), CacheError> {
        let id = account.id().clone();
        if self.accounts.contains_key(&id) {
            return Err(CacheError::DuplicateId {
                kind: "AccountId",
                id: id.to_string(),
            });
        }

        self.index
            .venue_account
            .insert(id.issuer().into(), id.clone());
        if let Some(database) = &self.database {
            if let Err(e) = database.add_account(&account) {
                error!(account_id = %id, error = %e, "Failed to persist account");
            }
        }

        debug!(account_id = %id, "Added account");
        self.accounts.insert(id, account);
        Ok(())
    }

    /// Replace a cached account with its updated state.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account was never added.
    pub fn update_account(&mut self, account: Account) -> Result<(), CacheError> {
        let id = account.id().clone();
        if !self.accounts.contains_key(&id) {
            return Err(CacheError::NotFound {
                kind: "Account",
                id: id.to_string(),
            });
        }
        if let Some(database) = &self.database {
            if let Err(e) = database.update_account(&account) {
                error!(account_id = %id, error = %e, "Failed to persist account update");
            }
        }
        self.accounts.insert(id, account);
        Ok(())
    }

    // ========================================================================
    // Reference Data
    // ========================================================================

    /// Add or replace an instrument.
    pub fn add_instrument(&mut self, instrument: Instrument) {
        if let Some(database) = &self.database {
            if let Err(e) = database.add_instrument(&instrument) {
                error!(instrument_id = %instrument.id, error = %e, "Failed to persist instrument");
            }
        }
        debug!(instrument_id = %instrument.id, "Added instrument");
        self.instruments.insert(instrument.id.clone(), instrument);
    }

    /// Record the latest price of a type for an instrument.
    pub fn add_price(&mut self, instrument_id: InstrumentId, price_type: PriceType, price: Price) {
        self.prices.insert((instrument_id, price_type), price);
    }
}
