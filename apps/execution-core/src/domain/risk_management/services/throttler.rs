//! Throttler
//!
//! Sliding-window rate limiter. Callers pass the current time so the window
//! follows whichever clock drives the engine (live or test).

use std::collections::VecDeque;

use crate::domain::risk_management::value_objects::RateLimit;
use crate::domain::shared::Timestamp;

/// Counts messages sent within the last `interval` and refuses more than
/// `limit` of them.
#[derive(Debug, Clone)]
pub struct Throttler {
    rate: RateLimit,
    timestamps: VecDeque<Timestamp>,
    recv_count: usize,
    sent_count: usize,
}

impl Throttler {
    /// Create a throttler for `rate`.
    #[must_use]
    pub fn new(rate: RateLimit) -> Self {
        Self {
            rate,
            timestamps: VecDeque::with_capacity(rate.limit()),
            recv_count: 0,
            sent_count: 0,
        }
    }

    /// Rate limit enforced.
    #[must_use]
    pub const fn rate(&self) -> RateLimit {
        self.rate
    }

    /// Messages offered so far.
    #[must_use]
    pub const fn recv_count(&self) -> usize {
        self.recv_count
    }

    /// Messages let through so far.
    #[must_use]
    pub const fn sent_count(&self) -> usize {
        self.sent_count
    }

    /// Try to send one message at `now`. Returns false when the window is full.
    pub fn try_send(&mut self, now: Timestamp) -> bool {
        self.recv_count += 1;
        self.evict_expired(now);
        if self.timestamps.len() >= self.rate.limit() {
            return false;
        }
        self.timestamps.push_back(now);
        self.sent_count += 1;
        true
    }

    /// Returns true if a message offered at `now` would be refused.
    #[must_use]
    pub fn is_limiting(&self, now: Timestamp) -> bool {
        self.in_window(now) >= self.rate.limit()
    }

    /// Fraction of the window budget used at `now` (0.0 to 1.0).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn used(&self, now: Timestamp) -> f64 {
        self.in_window(now) as f64 / self.rate.limit() as f64
    }

    /// Clear all counters and the window.
    pub fn reset(&mut self) {
        self.timestamps.clear();
        self.recv_count = 0;
        self.sent_count = 0;
    }

    fn window_start(&self, now: Timestamp) -> Timestamp {
        chrono::Duration::from_std(self.rate.interval())
            .map_or(now, |interval| now - interval)
    }

    fn in_window(&self, now: Timestamp) -> usize {
        let start = self.window_start(now);
        self.timestamps.iter().filter(|ts| **ts > start).count()
    }

    fn evict_expired(&mut self, now: Timestamp) {
        let start = self.window_start(now);
        while self.timestamps.front().is_some_and(|ts| *ts <= start) {
            self.timestamps.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};

    fn make_throttler(rate: &str) -> Throttler {
        Throttler::new(rate.parse().unwrap())
    }

    #[test]
    fn refuses_beyond_limit_within_window() {
        let mut throttler = make_throttler("2/00:00:01");
        let t0 = DateTime::UNIX_EPOCH;

        assert!(throttler.try_send(t0));
        assert!(throttler.try_send(t0 + Duration::milliseconds(100)));
        assert!(!throttler.try_send(t0 + Duration::milliseconds(200)));
        assert!(throttler.is_limiting(t0 + Duration::milliseconds(200)));
        assert_eq!(throttler.recv_count(), 3);
        assert_eq!(throttler.sent_count(), 2);
    }

    #[test]
    fn window_slides() {
        let mut throttler = make_throttler("1/00:00:01");
        let t0 = DateTime::UNIX_EPOCH;

        assert!(throttler.try_send(t0));
        assert!(!throttler.try_send(t0 + Duration::milliseconds(999)));
        assert!(throttler.try_send(t0 + Duration::seconds(1)));
    }

    #[test]
    fn used_and_reset() {
        let mut throttler = make_throttler("4/00:00:01");
        let t0 = DateTime::UNIX_EPOCH;
        throttler.try_send(t0);
        assert!((throttler.used(t0) - 0.25).abs() < f64::EPSILON);

        throttler.reset();
        assert_eq!(throttler.sent_count(), 0);
        assert!(throttler.used(t0).abs() < f64::EPSILON);
    }
}
