//! Clock Port
//!
//! Engines read time only through a [`Clock`] so tests and replays can drive
//! it explicitly.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use crate::domain::shared::Timestamp;

/// Time source.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveClock;

impl Clock for LiveClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Manually driven clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct TestClock {
    now: Arc<Mutex<Timestamp>>,
}

impl TestClock {
    /// Create a clock at `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Jump to `ts`.
    pub fn set_time(&self, ts: Timestamp) {
        *self.now.lock() = ts;
    }

    /// Move forward by `delta`.
    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.lock();
        *now += delta;
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new(chrono::DateTime::UNIX_EPOCH)
    }
}

impl Clock for TestClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
