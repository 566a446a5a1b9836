//! Execution Algorithms
//!
//! An execution algorithm owns primary orders submitted with its
//! `exec_algorithm_id` and works them by spawning child orders over time.
//! Algorithms never touch the cache themselves: callbacks return
//! [`AlgorithmAction`]s, and [`ExecAlgorithmCore`] turns each action into the
//! events and commands the kernel feeds to the engines, one action at a time.
//!
//! Family totals (`exec_spawn_total_*`) are always read from the cache.

mod spawn;
mod twap;

use thiserror::Error;

pub use spawn::{AlgorithmOutput, ExecAlgorithmCore, SpawnedOrder};
pub use twap::TwapAlgorithm;

use crate::domain::execution_tactics::TacticError;
use crate::domain::order_execution::{Order, OrderEventAny, TimeInForce};
use crate::domain::shared::{ClientOrderId, ExecAlgorithmId, Price, Quantity, Timestamp};

/// Errors raised by spawn and in-place operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlgorithmError {
    /// Order not in the cache.
    #[error("Order not found: {0}")]
    OrderNotFound(ClientOrderId),

    /// Order is not the primary of an exec-spawn family.
    #[error("Order {0} is not a primary order")]
    NotPrimary(ClientOrderId),

    /// Spawn quantity is zero or larger than the primary's quantity.
    #[error("Spawn quantity {requested} invalid for primary {primary} with quantity {available}")]
    InvalidSpawnQuantity {
        /// Primary order.
        primary: ClientOrderId,
        /// Requested child quantity.
        requested: Quantity,
        /// Primary's current quantity.
        available: Quantity,
    },

    /// Order already left local state.
    #[error("Order {client_order_id} cannot be changed in place with status {status}")]
    NotLocal {
        /// Order.
        client_order_id: ClientOrderId,
        /// Current status.
        status: String,
    },

    /// In-place modification that changes nothing.
    #[error("Modification of {0} changes nothing")]
    NothingToModify(ClientOrderId),

    /// Order already closed.
    #[error("Order {0} already closed")]
    OrderClosed(ClientOrderId),

    /// Algorithm parameters invalid.
    #[error(transparent)]
    Parameters(#[from] TacticError),
}

/// Kind of child order to spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnKind {
    /// Market order.
    Market,
    /// Limit order at a price.
    Limit(Price),
    /// Market order whose unfilled part rests as a limit.
    MarketToLimit,
}

/// Request to spawn a child from a primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Primary order.
    pub primary_id: ClientOrderId,
    /// Child order kind.
    pub kind: SpawnKind,
    /// Child quantity, taken from the primary.
    pub quantity: Quantity,
    /// Child time in force.
    pub time_in_force: TimeInForce,
    /// Child reduce-only flag.
    pub reduce_only: bool,
    /// Child tags.
    pub tags: Vec<String>,
}

impl SpawnRequest {
    /// GTC market child without tags.
    #[must_use]
    pub fn market(primary_id: ClientOrderId, quantity: Quantity) -> Self {
        Self {
            primary_id,
            kind: SpawnKind::Market,
            quantity,
            time_in_force: TimeInForce::Gtc,
            reduce_only: false,
            tags: Vec::new(),
        }
    }
}

/// What an algorithm wants done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmAction {
    /// Spawn a child from the primary and submit it.
    Spawn(SpawnRequest),
    /// Submit the primary itself with the quantity it has left.
    SubmitPrimary(ClientOrderId),
    /// Amend a local primary in place.
    ModifyInPlace {
        /// Order to amend.
        client_order_id: ClientOrderId,
        /// New quantity.
        quantity: Option<Quantity>,
        /// New limit price.
        price: Option<Price>,
        /// New trigger price.
        trigger_price: Option<Price>,
    },
    /// Cancel an order of the family.
    Cancel(ClientOrderId),
}

/// An execution algorithm.
pub trait ExecAlgorithm: Send {
    /// Algorithm identifier, matched against `exec_algorithm_id`.
    fn id(&self) -> &ExecAlgorithmId;

    /// A primary order arrived.
    ///
    /// # Errors
    ///
    /// Returns error if the order's parameters are invalid.
    fn on_order(&mut self, primary: &Order, now: Timestamp)
    -> Result<Vec<AlgorithmAction>, AlgorithmError>;

    /// Timer tick.
    fn on_time(&mut self, now: Timestamp) -> Vec<AlgorithmAction>;

    /// An event for an order of one of the algorithm's families.
    fn on_order_event(&mut self, event: &OrderEventAny) -> Vec<AlgorithmAction>;

    /// The algorithm is stopping; no further slices should be scheduled.
    fn on_stop(&mut self) -> Vec<AlgorithmAction>;
}
