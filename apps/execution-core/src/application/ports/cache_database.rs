//! Cache Database Port (Driven Port)
//!
//! Durable store behind the cache. The cache loads from it on start and
//! writes through on every mutation; the storage format belongs to the
//! adapter.

use std::collections::HashMap;

use crate::domain::account::Account;
use crate::domain::order_execution::aggregate::Order;
use crate::domain::position_management::Position;
use crate::domain::reference_data::Instrument;
use crate::domain::shared::{ClientId, ClientOrderId, PositionId};

/// Cache and cache database error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Entity with this ID already cached.
    #[error("Duplicate {kind}: {id}")]
    DuplicateId {
        /// Entity kind.
        kind: &'static str,
        /// Offending ID.
        id: String,
    },

    /// Entity not cached.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind.
        kind: &'static str,
        /// Missing ID.
        id: String,
    },

    /// Operation would break cache consistency.
    #[error("Cache consistency error: {message}")]
    Consistency {
        /// Error details.
        message: String,
    },

    /// Durable store failure.
    #[error("Cache database error: {message}")]
    Database {
        /// Error details.
        message: String,
    },
}

/// Port for the durable store behind the cache.
pub trait CacheDatabase: Send + Sync {
    /// Persist a new order with its optional position and client mappings.
    fn add_order(
        &self,
        order: &Order,
        position_id: Option<&PositionId>,
        client_id: Option<&ClientId>,
    ) -> Result<(), CacheError>;

    /// Persist an updated order.
    fn update_order(&self, order: &Order) -> Result<(), CacheError>;

    /// Persist a new position.
    fn add_position(&self, position: &Position) -> Result<(), CacheError>;

    /// Persist an updated position.
    fn update_position(&self, position: &Position) -> Result<(), CacheError>;

    /// Persist a new account.
    fn add_account(&self, account: &Account) -> Result<(), CacheError>;

    /// Persist an updated account.
    fn update_account(&self, account: &Account) -> Result<(), CacheError>;

    /// Persist an instrument.
    fn add_instrument(&self, instrument: &Instrument) -> Result<(), CacheError>;

    /// Persist an order → position mapping.
    fn index_order_position(
        &self,
        client_order_id: &ClientOrderId,
        position_id: &PositionId,
    ) -> Result<(), CacheError>;

    /// Load every stored order.
    fn load_orders(&self) -> Result<Vec<Order>, CacheError>;

    /// Load every stored position.
    fn load_positions(&self) -> Result<Vec<Position>, CacheError>;

    /// Load every stored account.
    fn load_accounts(&self) -> Result<Vec<Account>, CacheError>;

    /// Load every stored instrument.
    fn load_instruments(&self) -> Result<Vec<Instrument>, CacheError>;

    /// Load the order → position mappings.
    fn load_index_order_position(&self) -> Result<HashMap<ClientOrderId, PositionId>, CacheError>;

    /// Load the order → client mappings.
    fn load_index_order_client(&self) -> Result<HashMap<ClientOrderId, ClientId>, CacheError>;

    /// Delete everything stored.
    fn flush(&self) -> Result<(), CacheError>;

    /// Release resources.
    fn close(&self) -> Result<(), CacheError>;
}
