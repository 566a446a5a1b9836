//! Risk Management Value Objects

mod rate_limit;
mod trading_state;

pub use rate_limit::RateLimit;
pub use trading_state::TradingState;
