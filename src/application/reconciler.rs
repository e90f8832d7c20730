//! Position Reconciler
//!
//! Diffs the desired book against fresh holdings and emits the absolute
//! targets needed to close the gap. Reductions go out before increases so a
//! reversal never holds both directions of a leg at once.

use crate::domain::{HeldPosition, Side, TargetPositionCommand};

#[derive(Debug, Clone, Copy, Default)]
pub struct PositionReconciler;

impl PositionReconciler {
    /// Commands that make `holdings` equal `targets` on every side of `legs`.
    ///
    /// A side of a leg with no target is desired at zero. Sides already at
    /// their desired quantity produce nothing.
    pub fn plan(
        &self,
        legs: &[&str],
        targets: &[TargetPositionCommand],
        holdings: &[HeldPosition],
    ) -> Vec<TargetPositionCommand> {
        let mut reductions = Vec::new();
        let mut increases = Vec::new();

        for &leg in legs {
            for side in [Side::Long, Side::Short] {
                let desired = quantity_of(targets.iter().map(|t| (&t.instrument, t.side, t.quantity)), leg, side);
                let actual = quantity_of(holdings.iter().map(|h| (&h.instrument, h.side, h.quantity)), leg, side);

                if desired < actual {
                    reductions.push(TargetPositionCommand::new(leg, side, desired));
                } else if desired > actual {
                    increases.push(TargetPositionCommand::new(leg, side, desired));
                }
            }
        }

        reductions.extend(increases);
        reductions
    }
}

fn quantity_of<'a, I>(entries: I, leg: &str, side: Side) -> u64
where
    I: Iterator<Item = (&'a String, Side, u64)>,
{
    entries
        .filter(|(instrument, s, _)| instrument.as_str() == leg && *s == side)
        .map(|(_, _, quantity)| quantity)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGS: [&str; 2] = ["rb1801", "hc1801"];

    fn short_spread(quantity: u64) -> Vec<TargetPositionCommand> {
        vec![
            TargetPositionCommand::new("rb1801", Side::Short, quantity),
            TargetPositionCommand::new("hc1801", Side::Long, quantity),
        ]
    }

    fn held_short_spread(quantity: u64) -> Vec<HeldPosition> {
        vec![
            HeldPosition::new("rb1801", Side::Short, quantity, 3900.0),
            HeldPosition::new("hc1801", Side::Long, quantity, 3800.0),
        ]
    }

    #[test]
    fn test_open_from_flat() {
        let plan = PositionReconciler.plan(&LEGS, &short_spread(1), &[]);
        assert_eq!(plan, short_spread(1));
    }

    #[test]
    fn test_synchronized_book_is_noop() {
        let plan = PositionReconciler.plan(&LEGS, &short_spread(2), &held_short_spread(2));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_flatten_emits_zero_targets() {
        let plan = PositionReconciler.plan(&LEGS, &[], &held_short_spread(1));
        assert_eq!(
            plan,
            vec![
                TargetPositionCommand::close("rb1801", Side::Short),
                TargetPositionCommand::close("hc1801", Side::Long),
            ]
        );
    }

    #[test]
    fn test_flat_to_flat_is_noop() {
        assert!(PositionReconciler.plan(&LEGS, &[], &[]).is_empty());
    }

    #[test]
    fn test_reversal_closes_before_opening() {
        let long_spread = vec![
            TargetPositionCommand::new("rb1801", Side::Long, 1),
            TargetPositionCommand::new("hc1801", Side::Short, 1),
        ];
        let plan = PositionReconciler.plan(&LEGS, &long_spread, &held_short_spread(1));
        assert_eq!(
            plan,
            vec![
                TargetPositionCommand::close("rb1801", Side::Short),
                TargetPositionCommand::close("hc1801", Side::Long),
                TargetPositionCommand::new("rb1801", Side::Long, 1),
                TargetPositionCommand::new("hc1801", Side::Short, 1),
            ]
        );
    }

    #[test]
    fn test_resize_targets_absolute_quantity() {
        let plan = PositionReconciler.plan(&LEGS, &short_spread(3), &held_short_spread(5));
        assert_eq!(
            plan,
            vec![
                TargetPositionCommand::new("rb1801", Side::Short, 3),
                TargetPositionCommand::new("hc1801", Side::Long, 3),
            ]
        );

        let plan = PositionReconciler.plan(&LEGS, &short_spread(5), &held_short_spread(3));
        assert_eq!(plan, short_spread(5));
    }

    #[test]
    fn test_repairs_half_filled_leg() {
        let holdings = vec![HeldPosition::new("rb1801", Side::Short, 1, 3900.0)];
        let plan = PositionReconciler.plan(&LEGS, &short_spread(1), &holdings);
        assert_eq!(plan, vec![TargetPositionCommand::new("hc1801", Side::Long, 1)]);
    }

    #[test]
    fn test_ignores_other_instruments() {
        let holdings = vec![HeldPosition::new("i1801", Side::Long, 4, 500.0)];
        assert!(PositionReconciler.plan(&LEGS, &[], &holdings).is_empty());
    }
}
