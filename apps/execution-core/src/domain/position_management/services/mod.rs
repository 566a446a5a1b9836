//! Position Domain Services

mod position_id_generator;

pub use position_id_generator::PositionIdGenerator;
