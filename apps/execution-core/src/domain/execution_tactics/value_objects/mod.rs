//! Execution Tactics Value Objects

mod twap_params;

pub use twap_params::TwapParams;
