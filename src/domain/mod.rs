//! Domain Layer - Core types for the band automaton
//!
//! Pure value types with no I/O. Everything that talks to a broker or a
//! data vendor goes through the ports layer.

pub mod position;
pub mod command;
pub mod series;
pub mod pair;

pub use position::{Side, PositionState, HeldPosition, PositionError};
pub use command::TargetPositionCommand;
pub use series::{Ohlcv, Series, SeriesError};
pub use pair::InstrumentPair;
