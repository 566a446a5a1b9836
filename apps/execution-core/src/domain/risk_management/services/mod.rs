//! Risk Management Domain Services

mod throttler;

pub use throttler::Throttler;
