use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// Automaton state for one instrument pair.
///
/// For single-instrument engines `LongSpread` reads as plain "long" and
/// `ShortSpread` as plain "short" on the lead instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Flat,
    /// Long the lead instrument, short the hedge
    LongSpread,
    /// Short the lead instrument, long the hedge
    ShortSpread,
}

impl PositionState {
    /// Side held on the lead instrument, if any
    pub fn lead_side(self) -> Option<Side> {
        match self {
            PositionState::Flat => None,
            PositionState::LongSpread => Some(Side::Long),
            PositionState::ShortSpread => Some(Side::Short),
        }
    }

    pub fn from_lead_side(side: Option<Side>) -> Self {
        match side {
            None => PositionState::Flat,
            Some(Side::Long) => PositionState::LongSpread,
            Some(Side::Short) => PositionState::ShortSpread,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            PositionState::Flat => PositionState::Flat,
            PositionState::LongSpread => PositionState::ShortSpread,
            PositionState::ShortSpread => PositionState::LongSpread,
        }
    }

    pub fn is_flat(self) -> bool {
        self == PositionState::Flat
    }

    /// Re-derive the state from what the broker actually holds on the lead leg.
    ///
    /// A lead instrument holding both sides at once is reported as
    /// `PositionError::Conflicting`; the engine flattens in that case.
    pub fn from_holdings(lead: &str, holdings: &[HeldPosition]) -> Result<Self, PositionError> {
        let mut sides = holdings
            .iter()
            .filter(|h| h.instrument == lead && h.quantity > 0)
            .map(|h| h.side);

        let Some(first) = sides.next() else {
            return Ok(PositionState::Flat);
        };
        if sides.any(|side| side != first) {
            return Err(PositionError::Conflicting(lead.to_string()));
        }
        Ok(PositionState::from_lead_side(Some(first)))
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionState::Flat => write!(f, "FLAT"),
            PositionState::LongSpread => write!(f, "LONG_SPREAD"),
            PositionState::ShortSpread => write!(f, "SHORT_SPREAD"),
        }
    }
}

/// One side of one instrument as reported by the execution collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeldPosition {
    pub instrument: String,
    pub side: Side,
    /// Lots held on this side
    pub quantity: u64,
    pub avg_price: f64,
}

impl HeldPosition {
    pub fn new(instrument: impl Into<String>, side: Side, quantity: u64, avg_price: f64) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            quantity,
            avg_price,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PositionError {
    #[error("Instrument {0} holds long and short at the same time")]
    Conflicting(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Long.opposite(), Side::Short);
        assert_eq!(Side::Short.opposite(), Side::Long);
    }

    #[test]
    fn test_state_lead_side_roundtrip() {
        for state in [PositionState::Flat, PositionState::LongSpread, PositionState::ShortSpread] {
            assert_eq!(PositionState::from_lead_side(state.lead_side()), state);
        }
    }

    #[test]
    fn test_state_from_empty_holdings() {
        let state = PositionState::from_holdings("rb1801", &[]).unwrap();
        assert_eq!(state, PositionState::Flat);
    }

    #[test]
    fn test_state_from_lead_short() {
        let holdings = vec![
            HeldPosition::new("rb1801", Side::Short, 1, 3800.0),
            HeldPosition::new("rb1805", Side::Long, 1, 3750.0),
        ];
        let state = PositionState::from_holdings("rb1801", &holdings).unwrap();
        assert_eq!(state, PositionState::ShortSpread);
    }

    #[test]
    fn test_state_ignores_hedge_and_zero_quantity() {
        let holdings = vec![
            HeldPosition::new("rb1801", Side::Long, 0, 0.0),
            HeldPosition::new("rb1805", Side::Short, 2, 3750.0),
        ];
        let state = PositionState::from_holdings("rb1801", &holdings).unwrap();
        assert_eq!(state, PositionState::Flat);
    }

    #[test]
    fn test_state_conflicting_lead() {
        let holdings = vec![
            HeldPosition::new("rb1801", Side::Long, 1, 3800.0),
            HeldPosition::new("rb1801", Side::Short, 1, 3810.0),
        ];
        let result = PositionState::from_holdings("rb1801", &holdings);
        assert!(matches!(result, Err(PositionError::Conflicting(_))));
    }

    #[test]
    fn test_state_conflicting_after_repeated_side() {
        let holdings = vec![
            HeldPosition::new("rb1801", Side::Long, 1, 3800.0),
            HeldPosition::new("rb1801", Side::Long, 2, 3805.0),
            HeldPosition::new("rb1801", Side::Short, 1, 3810.0),
        ];
        let result = PositionState::from_holdings("rb1801", &holdings);
        assert_eq!(result, Err(PositionError::Conflicting("rb1801".to_string())));

        let same_side = &holdings[..2];
        let state = PositionState::from_holdings("rb1801", same_side).unwrap();
        assert_eq!(state, PositionState::LongSpread);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PositionState::ShortSpread.to_string(), "SHORT_SPREAD");
        assert_eq!(PositionState::Flat.opposite(), PositionState::Flat);
        assert_eq!(PositionState::LongSpread.opposite(), PositionState::ShortSpread);
    }
}
