//! Execution Client Port (Driven Port)
//!
//! A venue client turns trading commands into venue requests. Calls must not
//! block on venue I/O: implementations hand the command off and report the
//! outcome later as order events through the engine inbox.

use crate::domain::order_execution::commands::{
    BatchCancelOrders, CancelAllOrders, CancelOrder, ModifyOrder, QueryOrder, SubmitOrder,
};
use crate::domain::shared::{AccountId, ClientId, Venue};

/// Execution client error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionClientError {
    /// Client is not connected to its venue.
    #[error("Execution client {client_id} is disconnected")]
    Disconnected {
        /// Client identity.
        client_id: String,
    },

    /// Client refused the command before sending it.
    #[error("Command rejected by client: {reason}")]
    Rejected {
        /// Rejection reason.
        reason: String,
    },

    /// Hand-off to the venue task failed.
    #[error("Execution client transport error: {message}")]
    Transport {
        /// Error details.
        message: String,
    },
}

/// Port for venue execution clients.
#[cfg_attr(test, mockall::automock)]
pub trait ExecutionClient: Send + Sync {
    /// Client identity.
    fn client_id(&self) -> ClientId;

    /// Venue served by this client; `None` for a routing client that serves many.
    fn venue(&self) -> Option<Venue>;

    /// Account orders are placed on.
    fn account_id(&self) -> AccountId;

    /// Submit an order.
    fn submit_order(&self, command: &SubmitOrder) -> Result<(), ExecutionClientError>;

    /// Amend an order.
    fn modify_order(&self, command: &ModifyOrder) -> Result<(), ExecutionClientError>;

    /// Cancel an order.
    fn cancel_order(&self, command: &CancelOrder) -> Result<(), ExecutionClientError>;

    /// Cancel all open orders of an instrument.
    fn cancel_all_orders(&self, command: &CancelAllOrders) -> Result<(), ExecutionClientError>;

    /// Cancel several orders in one request.
    fn batch_cancel_orders(&self, command: &BatchCancelOrders)
    -> Result<(), ExecutionClientError>;

    /// Request the venue's view of an order.
    fn query_order(&self, command: &QueryOrder) -> Result<(), ExecutionClientError>;
}
