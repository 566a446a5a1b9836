//! In-process message bus.
//!
//! Subscribers register an exact topic or a prefix ending in `*` and receive
//! every matching message on their own unbounded channel. Publishing never
//! waits on a subscriber; subscribers whose receiver is dropped are pruned on
//! the next publish that reaches them.

use parking_lot::RwLock;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, trace};

use crate::application::ports::{BusMessage, EventBus};

#[derive(Debug)]
struct Subscription {
    pattern: String,
    sender: UnboundedSender<BusMessage>,
}

impl Subscription {
    fn matches(&self, topic: &str) -> bool {
        topic_matches(&self.pattern, topic)
    }
}

/// Returns true if `topic` matches `pattern` (exact, or prefix before a trailing `*`).
#[must_use]
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => topic.starts_with(prefix),
        None => pattern == topic,
    }
}

/// Pattern-matching publish/subscribe over unbounded channels.
#[derive(Debug, Default)]
pub struct MessageBus {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl MessageBus {
    /// Create a bus without subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions
            .read()
            .iter()
            .filter(|s| !s.sender.is_closed())
            .count()
    }

    /// Returns true if any live subscription matches `topic`.
    #[must_use]
    pub fn has_subscribers(&self, topic: &str) -> bool {
        self.subscriptions
            .read()
            .iter()
            .any(|s| s.matches(topic) && !s.sender.is_closed())
    }
}

impl EventBus for MessageBus {
    fn publish(&self, topic: &str, message: BusMessage) {
        let mut closed = false;
        {
            let subscriptions = self.subscriptions.read();
            for subscription in subscriptions.iter().filter(|s| s.matches(topic)) {
                if subscription.sender.send(message.clone()).is_err() {
                    closed = true;
                }
            }
        }
        trace!(topic, "Published");
        if closed {
            let mut subscriptions = self.subscriptions.write();
            let before = subscriptions.len();
            subscriptions.retain(|s| !s.sender.is_closed());
            debug!(pruned = before - subscriptions.len(), "Pruned closed subscriptions");
        }
    }

    fn subscribe(&self, pattern: &str) -> UnboundedReceiver<BusMessage> {
        let (sender, receiver) = unbounded_channel();
        self.subscriptions.write().push(Subscription {
            pattern: pattern.to_string(),
            sender,
        });
        debug!(pattern, "Subscribed");
        receiver
    }
}
