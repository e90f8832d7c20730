use serde::{Deserialize, Serialize};

use super::command::TargetPositionCommand;
use super::position::PositionState;

/// The instruments one automaton trades.
///
/// `hedge` is absent for single-instrument engines (grid, breakout).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentPair {
    pub name: String,
    pub lead: String,
    #[serde(default)]
    pub hedge: Option<String>,
}

impl InstrumentPair {
    pub fn spread(name: impl Into<String>, lead: impl Into<String>, hedge: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lead: lead.into(),
            hedge: Some(hedge.into()),
        }
    }

    pub fn single(name: impl Into<String>, instrument: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lead: instrument.into(),
            hedge: None,
        }
    }

    pub fn is_spread(&self) -> bool {
        self.hedge.is_some()
    }

    /// Lead first, then hedge
    pub fn instruments(&self) -> Vec<&str> {
        let mut legs = vec![self.lead.as_str()];
        if let Some(hedge) = &self.hedge {
            legs.push(hedge.as_str());
        }
        legs
    }

    /// Desired holdings for a state, lead leg first
    pub fn targets(&self, state: PositionState, quantity: u64) -> Vec<TargetPositionCommand> {
        let Some(side) = state.lead_side() else {
            return Vec::new();
        };

        let mut targets = vec![TargetPositionCommand::new(&self.lead, side, quantity)];
        if let Some(hedge) = &self.hedge {
            targets.push(TargetPositionCommand::new(hedge, side.opposite(), quantity));
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::Side;

    #[test]
    fn test_short_spread_targets() {
        let pair = InstrumentPair::spread("rb-hc", "rb1801", "hc1801");
        let targets = pair.targets(PositionState::ShortSpread, 2);
        assert_eq!(
            targets,
            vec![
                TargetPositionCommand::new("rb1801", Side::Short, 2),
                TargetPositionCommand::new("hc1801", Side::Long, 2),
            ]
        );
    }

    #[test]
    fn test_flat_has_no_targets() {
        let pair = InstrumentPair::spread("rb-hc", "rb1801", "hc1801");
        assert!(pair.targets(PositionState::Flat, 1).is_empty());
    }

    #[test]
    fn test_single_instrument_targets() {
        let pair = InstrumentPair::single("rb-grid", "rb1801");
        assert!(!pair.is_spread());
        assert_eq!(pair.instruments(), vec!["rb1801"]);
        assert_eq!(
            pair.targets(PositionState::LongSpread, 8),
            vec![TargetPositionCommand::new("rb1801", Side::Long, 8)]
        );
    }
}
