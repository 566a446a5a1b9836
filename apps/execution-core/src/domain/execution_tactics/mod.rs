//! Execution Tactics Bounded Context
//!
//! Slice schedules used by execution algorithms to split a primary order
//! over time.

pub mod errors;
pub mod services;
pub mod value_objects;

pub use errors::TacticError;
pub use services::TwapSchedule;
pub use value_objects::TwapParams;
