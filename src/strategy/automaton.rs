//! Position Automaton
//!
//! Three states (FLAT, LONG_SPREAD, SHORT_SPREAD) advanced by where the
//! decision statistic falls relative to the band. Per tick, in priority order:
//!
//! 1. Forced flat (invalid gate, session close, trade limit) beats everything
//! 2. FLAT: above `upper` or below `lower` enters
//! 3. Holding: a crossing of the opposite band reverses; otherwise falling
//!    back inside the band on the entry side exits
//!
//! Entries are strict crossings, exits are not: touching a band edge never
//! opens a position but does close one.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::PositionState;

use super::bands::Band;
use super::error::StatsError;

/// Which state an upper-band crossing enters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    /// Fade the move: above upper goes short the spread
    #[default]
    Reversion,
    /// Follow the move: above upper goes long
    Breakout,
}

impl EntryMode {
    pub fn upper_entry(self) -> PositionState {
        match self {
            EntryMode::Reversion => PositionState::ShortSpread,
            EntryMode::Breakout => PositionState::LongSpread,
        }
    }

    pub fn lower_entry(self) -> PositionState {
        self.upper_entry().opposite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlattenReason {
    ValidityRejected,
    SessionClose,
    TradeLimitReached,
    /// Lead leg held on both sides at once
    ConflictingHoldings,
}

impl fmt::Display for FlattenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlattenReason::ValidityRejected => write!(f, "validity rejected"),
            FlattenReason::SessionClose => write!(f, "session close"),
            FlattenReason::TradeLimitReached => write!(f, "trade limit reached"),
            FlattenReason::ConflictingHoldings => write!(f, "conflicting holdings"),
        }
    }
}

/// One step of the automaton
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Hold(PositionState),
    Enter { to: PositionState },
    Exit { from: PositionState },
    /// Close one side and open the other within a single evaluation
    Reverse { from: PositionState, to: PositionState },
    ForcedFlat { from: PositionState, reason: FlattenReason },
}

impl Transition {
    /// State after the transition
    pub fn target(&self) -> PositionState {
        match *self {
            Transition::Hold(state) => state,
            Transition::Enter { to } | Transition::Reverse { to, .. } => to,
            Transition::Exit { .. } | Transition::ForcedFlat { .. } => PositionState::Flat,
        }
    }

    /// Whether a held position was closed, completing a round trip
    pub fn closes_position(&self) -> bool {
        match *self {
            Transition::Exit { .. } | Transition::Reverse { .. } => true,
            Transition::ForcedFlat { from, .. } => !from.is_flat(),
            Transition::Hold(_) | Transition::Enter { .. } => false,
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Transition::Hold(_))
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Hold(state) => write!(f, "HOLD {}", state),
            Transition::Enter { to } => write!(f, "ENTER {}", to),
            Transition::Exit { from } => write!(f, "EXIT {}", from),
            Transition::Reverse { from, to } => write!(f, "REVERSE {} -> {}", from, to),
            Transition::ForcedFlat { from, reason } => write!(f, "FORCE FLAT {} ({})", from, reason),
        }
    }
}

/// State machine for one instrument pair
#[derive(Debug, Clone)]
pub struct PositionAutomaton {
    state: PositionState,
    mode: EntryMode,
}

impl PositionAutomaton {
    pub fn new(mode: EntryMode) -> Self {
        Self {
            state: PositionState::Flat,
            mode,
        }
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    /// Adopt the state re-derived from actual holdings
    pub fn sync(&mut self, state: PositionState) {
        self.state = state;
    }

    pub fn force_flat(&mut self, reason: FlattenReason) -> Transition {
        let from = self.state;
        self.state = PositionState::Flat;
        Transition::ForcedFlat { from, reason }
    }

    /// Apply the band rules for one tick.
    ///
    /// With `allow_reversal = false` an opposite-band crossing only exits.
    /// A non-finite statistic or band leaves the state untouched.
    pub fn advance(
        &mut self,
        statistic: f64,
        band: &Band,
        allow_reversal: bool,
    ) -> Result<Transition, StatsError> {
        if !statistic.is_finite() {
            return Err(StatsError::NonFinite("statistic"));
        }
        if !band.upper.is_finite() || !band.lower.is_finite() {
            return Err(StatsError::NonFinite("band"));
        }

        let upper_state = self.mode.upper_entry();
        let lower_state = self.mode.lower_entry();
        let from = self.state;

        let transition = if from.is_flat() {
            if statistic > band.upper {
                Transition::Enter { to: upper_state }
            } else if statistic < band.lower {
                Transition::Enter { to: lower_state }
            } else {
                Transition::Hold(from)
            }
        } else if from == upper_state {
            if statistic < band.lower {
                self.reverse_or_exit(from, lower_state, allow_reversal)
            } else if statistic <= band.upper {
                Transition::Exit { from }
            } else {
                Transition::Hold(from)
            }
        } else if statistic > band.upper {
            self.reverse_or_exit(from, upper_state, allow_reversal)
        } else if statistic >= band.lower {
            Transition::Exit { from }
        } else {
            Transition::Hold(from)
        };

        self.state = transition.target();
        Ok(transition)
    }

    fn reverse_or_exit(&self, from: PositionState, to: PositionState, allow_reversal: bool) -> Transition {
        if allow_reversal {
            Transition::Reverse { from, to }
        } else {
            Transition::Exit { from }
        }
    }
}

impl Default for PositionAutomaton {
    fn default() -> Self {
        Self::new(EntryMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band() -> Band {
        // center 100, upper 110, lower 90
        Band::from_moments(100.0, 5.0, 20, 2.0, 2.0)
    }

    fn automaton_in(state: PositionState) -> PositionAutomaton {
        let mut automaton = PositionAutomaton::default();
        automaton.sync(state);
        automaton
    }

    #[test]
    fn test_flat_above_upper_enters_short() {
        let mut automaton = PositionAutomaton::default();
        let t = automaton.advance(111.0, &band(), true).unwrap();
        assert_eq!(t, Transition::Enter { to: PositionState::ShortSpread });
        assert_eq!(automaton.state(), PositionState::ShortSpread);
    }

    #[test]
    fn test_flat_below_lower_enters_long() {
        let mut automaton = PositionAutomaton::default();
        let t = automaton.advance(89.0, &band(), true).unwrap();
        assert_eq!(t, Transition::Enter { to: PositionState::LongSpread });
    }

    #[test]
    fn test_touching_band_does_not_enter() {
        let mut automaton = PositionAutomaton::default();
        assert!(automaton.advance(110.0, &band(), true).unwrap().is_hold());
        assert!(automaton.advance(90.0, &band(), true).unwrap().is_hold());
        assert_eq!(automaton.state(), PositionState::Flat);
    }

    #[test]
    fn test_short_exits_inside_band() {
        let mut automaton = automaton_in(PositionState::ShortSpread);
        let t = automaton.advance(105.0, &band(), true).unwrap();
        assert_eq!(t, Transition::Exit { from: PositionState::ShortSpread });
        assert_eq!(automaton.state(), PositionState::Flat);
    }

    #[test]
    fn test_short_exits_on_touching_upper() {
        let mut automaton = automaton_in(PositionState::ShortSpread);
        let t = automaton.advance(110.0, &band(), true).unwrap();
        assert_eq!(t, Transition::Exit { from: PositionState::ShortSpread });
    }

    #[test]
    fn test_short_holds_above_upper() {
        let mut automaton = automaton_in(PositionState::ShortSpread);
        let t = automaton.advance(112.0, &band(), true).unwrap();
        assert_eq!(t, Transition::Hold(PositionState::ShortSpread));
    }

    #[test]
    fn test_short_reverses_below_lower() {
        let mut automaton = automaton_in(PositionState::ShortSpread);
        let t = automaton.advance(85.0, &band(), true).unwrap();
        assert_eq!(
            t,
            Transition::Reverse { from: PositionState::ShortSpread, to: PositionState::LongSpread }
        );
        assert_eq!(automaton.state(), PositionState::LongSpread);
    }

    #[test]
    fn test_long_rules_mirror_short() {
        let mut automaton = automaton_in(PositionState::LongSpread);
        assert!(automaton.advance(88.0, &band(), true).unwrap().is_hold());
        assert_eq!(
            automaton.advance(90.0, &band(), true).unwrap(),
            Transition::Exit { from: PositionState::LongSpread }
        );

        let mut automaton = automaton_in(PositionState::LongSpread);
        assert_eq!(
            automaton.advance(115.0, &band(), true).unwrap(),
            Transition::Reverse { from: PositionState::LongSpread, to: PositionState::ShortSpread }
        );
    }

    #[test]
    fn test_reversal_downgraded_to_exit() {
        let mut automaton = automaton_in(PositionState::ShortSpread);
        let t = automaton.advance(85.0, &band(), false).unwrap();
        assert_eq!(t, Transition::Exit { from: PositionState::ShortSpread });
        assert_eq!(automaton.state(), PositionState::Flat);
    }

    #[test]
    fn test_breakout_mode_follows_move() {
        let mut automaton = PositionAutomaton::new(EntryMode::Breakout);
        assert_eq!(automaton.mode(), EntryMode::Breakout);
        assert_eq!(
            automaton.advance(111.0, &band(), true).unwrap(),
            Transition::Enter { to: PositionState::LongSpread }
        );
        assert!(automaton.advance(111.0, &band(), true).unwrap().is_hold());
        assert_eq!(
            automaton.advance(89.0, &band(), true).unwrap(),
            Transition::Reverse { from: PositionState::LongSpread, to: PositionState::ShortSpread }
        );
        assert_eq!(
            automaton.advance(95.0, &band(), true).unwrap(),
            Transition::Exit { from: PositionState::ShortSpread }
        );
    }

    #[test]
    fn test_force_flat_from_any_state() {
        let mut automaton = automaton_in(PositionState::LongSpread);
        let t = automaton.force_flat(FlattenReason::SessionClose);
        assert_eq!(
            t,
            Transition::ForcedFlat { from: PositionState::LongSpread, reason: FlattenReason::SessionClose }
        );
        assert!(t.closes_position());
        assert_eq!(automaton.state(), PositionState::Flat);

        let t = automaton.force_flat(FlattenReason::ValidityRejected);
        assert!(!t.closes_position());
    }

    #[test]
    fn test_non_finite_statistic_keeps_state() {
        let mut automaton = automaton_in(PositionState::ShortSpread);
        assert!(automaton.advance(f64::NAN, &band(), true).is_err());
        assert_eq!(automaton.state(), PositionState::ShortSpread);
    }

    #[test]
    fn test_transition_display() {
        let t = Transition::Reverse { from: PositionState::ShortSpread, to: PositionState::LongSpread };
        assert_eq!(t.to_string(), "REVERSE SHORT_SPREAD -> LONG_SPREAD");
    }
}
