//! Position Management Value Objects

mod oms_type;
mod position_side;

pub use oms_type::OmsType;
pub use position_side::PositionSide;
