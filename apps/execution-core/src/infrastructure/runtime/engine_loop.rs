//! Engine Loop
//!
//! A tokio task that owns the [`TradingKernel`] and drains an inbox of
//! [`EngineMessage`]s one at a time. Strategies and venue tasks only ever
//! send into the inbox through an [`EngineHandle`], so every cache mutation
//! happens on this task.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::kernel::TradingKernel;
use crate::application::ports::BusMessage;
use crate::domain::account::AccountState;
use crate::domain::order_execution::{OrderEventAny, TradingCommand};
use crate::domain::shared::ClientOrderId;

/// Input to the engine loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    /// Strategy command.
    Command(TradingCommand),
    /// Venue order event.
    Event(OrderEventAny),
    /// Venue account state.
    AccountState(AccountState),
    /// Drive algorithm timers.
    Timer,
    /// Stop the kernel and end the loop.
    Shutdown,
}

/// Engine loop errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineLoopError {
    /// The loop has ended; nothing can be delivered.
    #[error("Engine loop is not running")]
    Closed,
}

/// Cloneable sender into the engine loop.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: UnboundedSender<EngineMessage>,
}

impl EngineHandle {
    /// Enqueue a message.
    ///
    /// # Errors
    ///
    /// Returns `Closed` once the loop has ended.
    pub fn send(&self, message: EngineMessage) -> Result<(), EngineLoopError> {
        self.sender.send(message).map_err(|_| EngineLoopError::Closed)
    }

    /// Enqueue a strategy command.
    ///
    /// # Errors
    ///
    /// Returns `Closed` once the loop has ended.
    pub fn execute(&self, command: TradingCommand) -> Result<(), EngineLoopError> {
        self.send(EngineMessage::Command(command))
    }

    /// Enqueue a venue order event.
    ///
    /// # Errors
    ///
    /// Returns `Closed` once the loop has ended.
    pub fn process(&self, event: OrderEventAny) -> Result<(), EngineLoopError> {
        self.send(EngineMessage::Event(event))
    }

    /// Enqueue a venue account state.
    ///
    /// # Errors
    ///
    /// Returns `Closed` once the loop has ended.
    pub fn process_account_state(&self, state: AccountState) -> Result<(), EngineLoopError> {
        self.send(EngineMessage::AccountState(state))
    }

    /// Ask the loop to stop after the messages already queued.
    ///
    /// # Errors
    ///
    /// Returns `Closed` once the loop has ended.
    pub fn shutdown(&self) -> Result<(), EngineLoopError> {
        self.send(EngineMessage::Shutdown)
    }

    /// Returns true once the loop has ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Owns the kernel and serializes every input to it.
#[derive(Debug)]
pub struct EngineLoop {
    kernel: TradingKernel,
    inbox: UnboundedReceiver<EngineMessage>,
    timer_interval: Option<Duration>,
}

impl EngineLoop {
    /// Create the loop and its handle.
    #[must_use]
    pub fn new(kernel: TradingKernel) -> (Self, EngineHandle) {
        let (sender, inbox) = unbounded_channel();
        let engine_loop = Self {
            kernel,
            inbox,
            timer_interval: None,
        };
        (engine_loop, EngineHandle { sender })
    }

    /// Drive algorithm timers every `interval` in addition to explicit
    /// [`EngineMessage::Timer`] messages.
    #[must_use]
    pub const fn with_timer_interval(mut self, interval: Duration) -> Self {
        self.timer_interval = Some(interval);
        self
    }

    /// Run on a new tokio task; the kernel is handed back when the loop ends.
    pub fn spawn(self) -> JoinHandle<TradingKernel> {
        tokio::spawn(self.run())
    }

    /// Start the kernel if needed, then drain the inbox until shutdown or
    /// until every handle is dropped.
    pub async fn run(mut self) -> TradingKernel {
        if !self.kernel.state().is_running() {
            if let Err(e) = self.kernel.start() {
                error!(error = %e, "Kernel failed to start, engine loop not run");
                return self.kernel;
            }
        }
        info!(trader_id = %self.kernel.trader_id(), "Engine loop running");

        let mut ticker = self.timer_interval.map(|period| {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker
        });

        loop {
            let message = match ticker.as_mut() {
                Some(ticker) => tokio::select! {
                    message = self.inbox.recv() => message,
                    _ = ticker.tick() => Some(EngineMessage::Timer),
                },
                None => self.inbox.recv().await,
            };
            let Some(message) = message else {
                debug!("All engine handles dropped");
                break;
            };
            if !self.handle(message) {
                break;
            }
        }

        if self.kernel.state().is_running() {
            if let Err(e) = self.kernel.stop() {
                warn!(error = %e, "Kernel failed to stop cleanly");
            }
        }
        info!(trader_id = %self.kernel.trader_id(), "Engine loop stopped");
        self.kernel
    }

    /// Returns false when the loop should end.
    fn handle(&mut self, message: EngineMessage) -> bool {
        match message {
            EngineMessage::Command(command) => self.kernel.execute(command),
            EngineMessage::Event(event) => self.kernel.process(event),
            EngineMessage::AccountState(state) => self.kernel.process_account_state(state),
            EngineMessage::Timer => self.kernel.on_timer(),
            EngineMessage::Shutdown => return false,
        }
        true
    }
}

/// Wait for an order event for `client_order_id` that satisfies `predicate`.
///
/// Completes with `None` when `timeout` expires or the bus subscription
/// closes; recovery then proceeds from later events as usual.
pub async fn await_order_event<F>(
    receiver: &mut UnboundedReceiver<BusMessage>,
    client_order_id: &ClientOrderId,
    predicate: F,
    timeout: Duration,
) -> Option<OrderEventAny>
where
    F: Fn(&OrderEventAny) -> bool,
{
    let wait = async {
        while let Some(message) = receiver.recv().await {
            if let BusMessage::OrderEvent(event) = message {
                if event.client_order_id() == client_order_id && predicate(&event) {
                    return Some(event);
                }
            }
        }
        None
    };
    match tokio::time::timeout(timeout, wait).await {
        Ok(event) => event,
        Err(_) => {
            debug!(%client_order_id, timeout_ms = timeout.as_millis(), "Order event wait timed out");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cache::Cache;
    use crate::application::kernel::KernelConfig;
    use crate::application::ports::{EventBus, LiveClock};
    use crate::domain::order_execution::{OrderEventBuilder, OrderFactory, OrderSide, SubmitOrder};
    use crate::domain::reference_data::Instrument;
    use crate::domain::shared::{AccountId, ClientId, Currency, InstrumentId, Quantity, StrategyId, TraderId, Venue};
    use crate::infrastructure::messaging::MessageBus;
    use crate::infrastructure::venue::{ChannelExecutionClient, VenueCommand};
    use chrono::Utc;
    use std::sync::Arc;

    fn make_kernel(bus: Arc<MessageBus>) -> (TradingKernel, UnboundedReceiver<VenueCommand>) {
        let mut cache = Cache::default();
        cache.add_instrument(
            Instrument::new(InstrumentId::new("AUD/USD.SIM"), 5, 0, Currency::new("USD")).unwrap(),
        );
        let mut kernel = TradingKernel::new(
            KernelConfig::default(),
            cache.into_shared(),
            bus,
            Arc::new(LiveClock),
        );
        let (client, venue_rx) = ChannelExecutionClient::new(
            ClientId::new("SIM"),
            Some(Venue::new("SIM")),
            AccountId::new("SIM-001"),
        );
        kernel.exec_engine_mut().register_client(Arc::new(client)).unwrap();
        (kernel, venue_rx)
    }

    fn make_factory() -> OrderFactory {
        OrderFactory::new(TraderId::new("TESTER-000"), StrategyId::new("S-001"))
    }

    #[tokio::test]
    async fn commands_reach_venue_and_events_come_back() {
        let bus = Arc::new(MessageBus::new());
        let mut order_events = bus.subscribe("events.order.*");
        let (kernel, mut venue_rx) = make_kernel(Arc::clone(&bus));
        let (engine_loop, handle) = EngineLoop::new(kernel);
        let task = engine_loop.spawn();

        let order = make_factory().market(InstrumentId::new("AUD/USD.SIM"), OrderSide::Buy, Quantity::from_u64(10));
        let client_order_id = order.client_order_id().clone();
        handle
            .execute(TradingCommand::SubmitOrder(SubmitOrder::new(order, None)))
            .unwrap();

        let Some(VenueCommand::Submit(submit)) = venue_rx.recv().await else {
            panic!("expected submit at venue");
        };
        let submitted = OrderEventBuilder::new(&submit.order, Utc::now()).submitted(AccountId::new("SIM-001"));
        handle.process(submitted).unwrap();

        let event = await_order_event(
            &mut order_events,
            &client_order_id,
            |e| matches!(e, OrderEventAny::Submitted(_)),
            Duration::from_secs(1),
        )
        .await;
        assert!(event.is_some());

        handle.shutdown().unwrap();
        let kernel = task.await.unwrap();
        assert_eq!(kernel.exec_engine().event_count(), 1);
        assert!(!kernel.state().is_running());
    }

    #[tokio::test]
    async fn await_times_out_with_none() {
        let bus = MessageBus::new();
        let mut receiver = bus.subscribe("events.order.*");

        let event = await_order_event(
            &mut receiver,
            &ClientOrderId::new("O-1"),
            |_| true,
            Duration::from_millis(20),
        )
        .await;

        assert!(event.is_none());
    }

    #[tokio::test]
    async fn dropping_every_handle_ends_loop() {
        let (kernel, _venue_rx) = make_kernel(Arc::new(MessageBus::new()));
        let (engine_loop, handle) = EngineLoop::new(kernel);
        let task = engine_loop.with_timer_interval(Duration::from_millis(5)).spawn();

        drop(handle);

        let kernel = task.await.unwrap();
        assert!(!kernel.state().is_running());
    }

    #[tokio::test]
    async fn closed_handle_reports_error() {
        let (kernel, _venue_rx) = make_kernel(Arc::new(MessageBus::new()));
        let (engine_loop, handle) = EngineLoop::new(kernel);
        let task = engine_loop.spawn();

        handle.shutdown().unwrap();
        task.await.unwrap();

        assert!(handle.is_closed());
        assert_eq!(handle.send(EngineMessage::Timer), Err(EngineLoopError::Closed));
    }
}
