//! Position Management Bounded Context
//!
//! Positions are derived from fills. A position opens on the first fill that
//! creates exposure, closes when its signed quantity returns to zero, and may
//! be reopened (netting) by a later fill.
//!
//! # Key Concepts
//!
//! - **Position Aggregate**: signed quantity, average prices and realized PnL
//! - **OMS Type**: netting (one position per instrument/strategy) or hedging
//! - **Position Events**: opened, changed and closed notifications

pub mod aggregate;
pub mod events;
pub mod services;
pub mod value_objects;

pub use aggregate::Position;
pub use events::{PositionEvent, PositionSnapshot};
pub use services::PositionIdGenerator;
pub use value_objects::{OmsType, PositionSide};
