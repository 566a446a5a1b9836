//! Execution Tactics Domain Services

mod twap_schedule;

pub use twap_schedule::TwapSchedule;
