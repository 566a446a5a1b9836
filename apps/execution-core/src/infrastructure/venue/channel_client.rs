//! Channel Execution Client
//!
//! An [`ExecutionClient`] that forwards every command to an async venue task
//! over an unbounded channel. The task owns the venue connection and reports
//! outcomes back through the engine inbox as order events, so calls here
//! never wait on venue I/O.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, warn};

use crate::application::ports::{ExecutionClient, ExecutionClientError};
use crate::domain::order_execution::commands::{
    BatchCancelOrders, CancelAllOrders, CancelOrder, ModifyOrder, QueryOrder, SubmitOrder,
};
use crate::domain::shared::{AccountId, ClientId, Venue};

/// Command handed to the venue task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenueCommand {
    /// Place an order.
    Submit(SubmitOrder),
    /// Amend an order.
    Modify(ModifyOrder),
    /// Cancel an order.
    Cancel(CancelOrder),
    /// Cancel every open order of an instrument.
    CancelAll(CancelAllOrders),
    /// Cancel several orders.
    BatchCancel(BatchCancelOrders),
    /// Query an order.
    Query(QueryOrder),
}

impl VenueCommand {
    /// Command name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Submit(_) => "SubmitOrder",
            Self::Modify(_) => "ModifyOrder",
            Self::Cancel(_) => "CancelOrder",
            Self::CancelAll(_) => "CancelAllOrders",
            Self::BatchCancel(_) => "BatchCancelOrders",
            Self::Query(_) => "QueryOrder",
        }
    }
}

/// Execution client backed by a channel to a venue task.
#[derive(Debug)]
pub struct ChannelExecutionClient {
    client_id: ClientId,
    venue: Option<Venue>,
    account_id: AccountId,
    sender: UnboundedSender<VenueCommand>,
    connected: AtomicBool,
}

impl ChannelExecutionClient {
    /// Create a connected client and the receiver its venue task drains.
    #[must_use]
    pub fn new(
        client_id: ClientId,
        venue: Option<Venue>,
        account_id: AccountId,
    ) -> (Self, UnboundedReceiver<VenueCommand>) {
        let (sender, receiver) = unbounded_channel();
        let client = Self {
            client_id,
            venue,
            account_id,
            sender,
            connected: AtomicBool::new(true),
        };
        (client, receiver)
    }

    /// Returns true while commands are accepted.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Accept commands again.
    pub fn connect(&self) {
        self.connected.store(true, Ordering::Release);
        info!(client_id = %self.client_id, "Execution client connected");
    }

    /// Refuse further commands.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        warn!(client_id = %self.client_id, "Execution client disconnected");
    }

    fn send(&self, command: VenueCommand) -> Result<(), ExecutionClientError> {
        if !self.is_connected() {
            return Err(ExecutionClientError::Disconnected {
                client_id: self.client_id.to_string(),
            });
        }
        let name = command.name();
        self.sender
            .send(command)
            .map_err(|_| ExecutionClientError::Transport {
                message: format!("venue task for {} has stopped", self.client_id),
            })?;
        debug!(client_id = %self.client_id, command = name, "Handed off to venue task");
        Ok(())
    }
}

impl ExecutionClient for ChannelExecutionClient {
    fn client_id(&self) -> ClientId {
        self.client_id.clone()
    }

    fn venue(&self) -> Option<Venue> {
        self.venue.clone()
    }

    fn account_id(&self) -> AccountId {
        self.account_id.clone()
    }

    fn submit_order(&self, command: &SubmitOrder) -> Result<(), ExecutionClientError> {
        self.send(VenueCommand::Submit(command.clone()))
    }

    fn modify_order(&self, command: &ModifyOrder) -> Result<(), ExecutionClientError> {
        self.send(VenueCommand::Modify(command.clone()))
    }

    fn cancel_order(&self, command: &CancelOrder) -> Result<(), ExecutionClientError> {
        self.send(VenueCommand::Cancel(command.clone()))
    }

    fn cancel_all_orders(&self, command: &CancelAllOrders) -> Result<(), ExecutionClientError> {
        self.send(VenueCommand::CancelAll(command.clone()))
    }

    fn batch_cancel_orders(
        &self,
        command: &BatchCancelOrders,
    ) -> Result<(), ExecutionClientError> {
        self.send(VenueCommand::BatchCancel(command.clone()))
    }

    fn query_order(&self, command: &QueryOrder) -> Result<(), ExecutionClientError> {
        self.send(VenueCommand::Query(command.clone()))
    }
}
