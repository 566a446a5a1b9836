//! Reference Data
//!
//! Instrument definitions used for precision, limit and notional checks.

mod instrument;

pub use instrument::{Instrument, PriceType};
