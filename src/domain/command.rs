use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::Side;

/// Absolute desired holding on one side of one instrument.
///
/// Not a delta: sending the same command twice leaves the book unchanged
/// after the first one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetPositionCommand {
    pub instrument: String,
    pub side: Side,
    pub quantity: u64,
}

impl TargetPositionCommand {
    pub fn new(instrument: impl Into<String>, side: Side, quantity: u64) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            quantity,
        }
    }

    /// Target zero lots on the given side
    pub fn close(instrument: impl Into<String>, side: Side) -> Self {
        Self::new(instrument, side, 0)
    }

    pub fn is_close(&self) -> bool {
        self.quantity == 0
    }
}

impl fmt::Display for TargetPositionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.instrument, self.side, self.quantity)
    }
}
