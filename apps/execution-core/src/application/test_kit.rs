//! Shared fixtures for engine unit tests.

use parking_lot::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

use crate::application::cache::{Cache, SharedCache};
use crate::application::ports::{BusMessage, EventBus};
use crate::domain::order_execution::{OrderEventAny, OrderFactory};
use crate::domain::reference_data::Instrument;
use crate::domain::shared::{Currency, InstrumentId, StrategyId, TraderId};

/// Bus that keeps every published message.
#[derive(Debug, Default)]
pub struct RecordingBus {
    messages: Mutex<Vec<(String, BusMessage)>>,
}

impl RecordingBus {
    pub fn messages(&self) -> Vec<(String, BusMessage)> {
        self.messages.lock().clone()
    }

    pub fn order_events(&self) -> Vec<OrderEventAny> {
        self.messages
            .lock()
            .iter()
            .filter_map(|(_, m)| m.as_order_event().cloned())
            .collect()
    }

    pub fn topics(&self) -> Vec<String> {
        self.messages.lock().iter().map(|(t, _)| t.clone()).collect()
    }
}

impl EventBus for RecordingBus {
    fn publish(&self, topic: &str, message: BusMessage) {
        self.messages.lock().push((topic.to_string(), message));
    }

    fn subscribe(&self, _pattern: &str) -> UnboundedReceiver<BusMessage> {
        unbounded_channel().1
    }
}

pub fn audusd() -> Instrument {
    Instrument::new(InstrumentId::new("AUD/USD.SIM"), 5, 0, Currency::new("USD"))
        .unwrap()
        .with_base_currency(Currency::new("AUD"))
}

pub fn make_factory() -> OrderFactory {
    OrderFactory::new(TraderId::new("TESTER-000"), StrategyId::new("S-001"))
}

pub fn make_cache() -> SharedCache {
    let mut cache = Cache::default();
    cache.add_instrument(audusd());
    cache.into_shared()
}
