//! In-memory cache database for testing and single-process sessions.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::application::ports::{CacheDatabase, CacheError};
use crate::domain::account::Account;
use crate::domain::order_execution::aggregate::Order;
use crate::domain::position_management::Position;
use crate::domain::reference_data::Instrument;
use crate::domain::shared::{AccountId, ClientId, ClientOrderId, InstrumentId, PositionId};

/// Rows keyed by ID, loaded back in the order they were first written.
#[derive(Debug)]
struct Table<K, V> {
    rows: HashMap<K, (u64, V)>,
    next: u64,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            next: 0,
        }
    }
}

impl<K: std::hash::Hash + Eq, V: Clone> Table<K, V> {
    fn insert(&mut self, key: K, value: V) {
        match self.rows.get_mut(&key) {
            Some(row) => row.1 = value,
            None => {
                self.rows.insert(key, (self.next, value));
                self.next += 1;
            }
        }
    }

    fn contains(&self, key: &K) -> bool {
        self.rows.contains_key(key)
    }

    fn values(&self) -> Vec<V> {
        let mut rows: Vec<&(u64, V)> = self.rows.values().collect();
        rows.sort_by_key(|(seq, _)| *seq);
        rows.into_iter().map(|(_, value)| value.clone()).collect()
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.next = 0;
    }
}

#[derive(Debug, Default)]
struct Store {
    orders: Table<ClientOrderId, Order>,
    positions: Table<PositionId, Position>,
    accounts: Table<AccountId, Account>,
    instruments: Table<InstrumentId, Instrument>,
    order_position: HashMap<ClientOrderId, PositionId>,
    order_client: HashMap<ClientOrderId, ClientId>,
}

/// Cache database holding everything in process memory.
///
/// Suitable for testing and development. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryCacheDatabase {
    store: RwLock<Store>,
    closed: RwLock<bool>,
}

impl InMemoryCacheDatabase {
    /// Create an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.store.read().orders.rows.len()
    }

    /// Number of stored positions.
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.store.read().positions.rows.len()
    }

    /// Returns true after [`CacheDatabase::close`].
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.read()
    }

    fn ensure_open(&self) -> Result<(), CacheError> {
        if self.is_closed() {
            return Err(CacheError::Database {
                message: "database closed".to_string(),
            });
        }
        Ok(())
    }
}

impl CacheDatabase for InMemoryCacheDatabase {
    fn add_order(
        &self,
        order: &Order,
        position_id: Option<&PositionId>,
        client_id: Option<&ClientId>,
    ) -> Result<(), CacheError> {
        self.ensure_open()?;
        let mut store = self.store.write();
        let id = order.client_order_id().clone();
        if store.orders.contains(&id) {
            return Err(CacheError::DuplicateId {
                kind: "order",
                id: id.to_string(),
            });
        }
        if let Some(position_id) = position_id {
            store.order_position.insert(id.clone(), position_id.clone());
        }
        if let Some(client_id) = client_id {
            store.order_client.insert(id.clone(), client_id.clone());
        }
        store.orders.insert(id, order.clone());
        Ok(())
    }

    fn update_order(&self, order: &Order) -> Result<(), CacheError> {
        self.ensure_open()?;
        let mut store = self.store.write();
        let id = order.client_order_id().clone();
        if !store.orders.contains(&id) {
            return Err(CacheError::NotFound {
                kind: "order",
                id: id.to_string(),
            });
        }
        store.orders.insert(id, order.clone());
        Ok(())
    }

    fn add_position(&self, position: &Position) -> Result<(), CacheError> {
        self.ensure_open()?;
        self.store
            .write()
            .positions
            .insert(position.id().clone(), position.clone());
        Ok(())
    }

    fn update_position(&self, position: &Position) -> Result<(), CacheError> {
        self.ensure_open()?;
        let mut store = self.store.write();
        if !store.positions.contains(position.id()) {
            return Err(CacheError::NotFound {
                kind: "position",
                id: position.id().to_string(),
            });
        }
        store.positions.insert(position.id().clone(), position.clone());
        Ok(())
    }

    fn add_account(&self, account: &Account) -> Result<(), CacheError> {
        self.ensure_open()?;
        self.store
            .write()
            .accounts
            .insert(account.id().clone(), account.clone());
        Ok(())
    }

    fn update_account(&self, account: &Account) -> Result<(), CacheError> {
        self.add_account(account)
    }

    fn add_instrument(&self, instrument: &Instrument) -> Result<(), CacheError> {
        self.ensure_open()?;
        self.store
            .write()
            .instruments
            .insert(instrument.id.clone(), instrument.clone());
        Ok(())
    }

    fn index_order_position(
        &self,
        client_order_id: &ClientOrderId,
        position_id: &PositionId,
    ) -> Result<(), CacheError> {
        self.ensure_open()?;
        self.store
            .write()
            .order_position
            .insert(client_order_id.clone(), position_id.clone());
        Ok(())
    }

    fn load_orders(&self) -> Result<Vec<Order>, CacheError> {
        self.ensure_open()?;
        Ok(self.store.read().orders.values())
    }

    fn load_positions(&self) -> Result<Vec<Position>, CacheError> {
        self.ensure_open()?;
        Ok(self.store.read().positions.values())
    }

    fn load_accounts(&self) -> Result<Vec<Account>, CacheError> {
        self.ensure_open()?;
        Ok(self.store.read().accounts.values())
    }

    fn load_instruments(&self) -> Result<Vec<Instrument>, CacheError> {
        self.ensure_open()?;
        Ok(self.store.read().instruments.values())
    }

    fn load_index_order_position(&self) -> Result<HashMap<ClientOrderId, PositionId>, CacheError> {
        self.ensure_open()?;
        Ok(self.store.read().order_position.clone())
    }

    fn load_index_order_client(&self) -> Result<HashMap<ClientOrderId, ClientId>, CacheError> {
        self.ensure_open()?;
        Ok(self.store.read().order_client.clone())
    }

    fn flush(&self) -> Result<(), CacheError> {
        self.ensure_open()?;
        let mut store = self.store.write();
        store.orders.clear();
        store.positions.clear();
        store.accounts.clear();
        store.instruments.clear();
        store.order_position.clear();
        store.order_client.clear();
        Ok(())
    }

    fn close(&self) -> Result<(), CacheError> {
        *self.closed.write() = true;
        Ok(())
    }
}
