//! Decision Statistic
//!
//! Turns aligned close series into the scalar the automaton compares against
//! the band, together with that band:
//!
//! - `Spread`: A - B, band over the spreads preceding the current bar
//! - `Residual`: A - beta*B - c, band over the trailing residuals including
//!   the current one
//! - `ZScore`: current spread in std units of the preceding spreads,
//!   compared against the standardized band
//! - `Price`: last lead close against the band of preceding closes

use serde::{Deserialize, Serialize};
use std::fmt;

use super::bands::{Band, BandCalculator, BandSchedule};
use super::error::StatsError;
use super::regression::{HedgeFit, HedgeRatioEstimator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticKind {
    #[default]
    Spread,
    Residual,
    ZScore,
    Price,
}

impl StatisticKind {
    /// Whether the statistic is built from two legs
    pub fn needs_hedge(self) -> bool {
        !matches!(self, StatisticKind::Price)
    }

    /// Bars to request so the band window and the current value both fit
    pub fn history_len(self, lookback: usize) -> usize {
        match self {
            StatisticKind::Residual => lookback,
            _ => lookback + 1,
        }
    }
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatisticKind::Spread => write!(f, "spread"),
            StatisticKind::Residual => write!(f, "residual"),
            StatisticKind::ZScore => write!(f, "zscore"),
            StatisticKind::Price => write!(f, "price"),
        }
    }
}

/// Statistic and band for one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPoint {
    pub statistic: f64,
    pub band: Band,
    /// Regression used for the residual statistic
    pub hedge: Option<HedgeFit>,
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionStatistic {
    kind: StatisticKind,
    calculator: BandCalculator,
    estimator: HedgeRatioEstimator,
}

impl DecisionStatistic {
    pub fn new(kind: StatisticKind, calculator: BandCalculator) -> Self {
        Self {
            kind,
            calculator,
            estimator: HedgeRatioEstimator,
        }
    }

    pub fn kind(&self) -> StatisticKind {
        self.kind
    }

    /// Compute the statistic from lead closes `a` and hedge closes `b`.
    ///
    /// `hedge` overrides the residual regression (the cointegration gate's
    /// fit). `schedule` decides whether the band is recomputed this tick.
    pub fn evaluate(
        &self,
        a: &[f64],
        b: Option<&[f64]>,
        hedge: Option<HedgeFit>,
        schedule: &mut BandSchedule,
    ) -> Result<DecisionPoint, StatsError> {
        let point = match self.kind {
            StatisticKind::Price => {
                let (history, current) = split_current(a)?;
                let band = schedule.band_with(|| self.calculator.compute(history))?;
                DecisionPoint { statistic: current, band, hedge: None }
            }
            StatisticKind::Spread => {
                let spreads = spreads(a, require_hedge(b)?)?;
                let (history, current) = split_current(&spreads)?;
                let band = schedule.band_with(|| self.calculator.compute(history))?;
                DecisionPoint { statistic: current, band, hedge: None }
            }
            StatisticKind::ZScore => {
                let spreads = spreads(a, require_hedge(b)?)?;
                let (history, current) = split_current(&spreads)?;
                let raw = schedule.band_with(|| self.calculator.compute(history))?;
                let z = raw
                    .z_score(current)
                    .ok_or_else(|| StatsError::Degenerate("spread window has no dispersion".to_string()))?;
                DecisionPoint { statistic: z, band: raw.standardized(), hedge: None }
            }
            StatisticKind::Residual => {
                let b = require_hedge(b)?;
                if a.len() != b.len() {
                    return Err(StatsError::LengthMismatch(a.len(), b.len()));
                }
                let fit = match hedge {
                    Some(fit) => fit,
                    None => self.estimator.fit(a, b)?,
                };
                let residuals = fit.residuals(a, b);
                let current = *residuals
                    .last()
                    .ok_or_else(|| StatsError::insufficient(2, 0))?;
                let band = schedule.band_with(|| self.calculator.compute(&residuals))?;
                DecisionPoint { statistic: current, band, hedge: Some(fit) }
            }
        };

        if !point.statistic.is_finite() {
            return Err(StatsError::NonFinite("decision statistic"));
        }
        Ok(point)
    }
}

fn require_hedge(b: Option<&[f64]>) -> Result<&[f64], StatsError> {
    b.ok_or_else(|| StatsError::Degenerate("statistic needs a hedge leg".to_string()))
}

fn spreads(a: &[f64], b: &[f64]) -> Result<Vec<f64>, StatsError> {
    if a.len() != b.len() {
        return Err(StatsError::LengthMismatch(a.len(), b.len()));
    }
    Ok(a.iter().zip(b).map(|(x, y)| x - y).collect())
}

/// Split off the last value; the rest must still hold a band
fn split_current(values: &[f64]) -> Result<(&[f64], f64), StatsError> {
    match values.split_last() {
        Some((current, history)) if history.len() >= 2 => Ok((history, *current)),
        _ => Err(StatsError::insufficient(3, values.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn every_tick() -> BandSchedule {
        BandSchedule::new(1)
    }

    #[test]
    fn test_spread_excludes_current_from_band() {
        let stat = DecisionStatistic::new(StatisticKind::Spread, BandCalculator::symmetric(4, 1.0));
        let a = [110.0, 112.0, 108.0, 110.0, 130.0];
        let b = [10.0, 10.0, 10.0, 10.0, 10.0];

        let point = stat.evaluate(&a, Some(&b), None, &mut every_tick()).unwrap();
        assert_eq!(point.statistic, 120.0);
        assert_abs_diff_eq!(point.band.center, 100.0);
        assert_eq!(point.band.window, 4);
        assert!(point.statistic > point.band.upper);
    }

    #[test]
    fn test_price_uses_lead_only() {
        let stat = DecisionStatistic::new(StatisticKind::Price, BandCalculator::symmetric(3, 2.0));
        let point = stat.evaluate(&[1.0, 2.0, 3.0, 2.0], None, None, &mut every_tick()).unwrap();
        assert_eq!(point.statistic, 2.0);
        assert_abs_diff_eq!(point.band.center, 2.0);
    }

    #[test]
    fn test_zscore_compares_against_standardized_band() {
        let stat = DecisionStatistic::new(StatisticKind::ZScore, BandCalculator::new(4, 2.0, 1.5));
        let a = [102.0, 104.0, 104.0, 106.0, 110.0];
        let b = [100.0; 5];

        let point = stat.evaluate(&a, Some(&b), None, &mut every_tick()).unwrap();
        // preceding spreads 2,4,4,6: mean 4, std sqrt(2)
        assert_abs_diff_eq!(point.statistic, 6.0 / 2f64.sqrt(), epsilon = 1e-12);
        assert_eq!(point.band.center, 0.0);
        assert_eq!(point.band.upper, 2.0);
        assert_eq!(point.band.lower, -1.5);
    }

    #[test]
    fn test_zscore_flat_window_is_degenerate() {
        let stat = DecisionStatistic::new(StatisticKind::ZScore, BandCalculator::symmetric(4, 2.0));
        let a = [5.0; 5];
        let b = [1.0; 5];
        let result = stat.evaluate(&a, Some(&b), None, &mut every_tick());
        assert!(matches!(result, Err(StatsError::Degenerate(_))));
    }

    #[test]
    fn test_residual_uses_supplied_fit() {
        let stat = DecisionStatistic::new(StatisticKind::Residual, BandCalculator::symmetric(3, 1.0));
        let fit = HedgeFit { hedge_ratio: 2.0, intercept: 1.0 };
        let b = [10.0, 11.0, 12.0];
        let a = [21.5, 22.5, 26.0];

        let point = stat.evaluate(&a, Some(&b), Some(fit), &mut every_tick()).unwrap();
        assert_abs_diff_eq!(point.statistic, 1.0);
        // residuals 0.5, -0.5, 1.0 include the current one
        assert_abs_diff_eq!(point.band.center, 1.0 / 3.0, epsilon = 1e-12);
        assert_eq!(point.hedge, Some(fit));
    }

    #[test]
    fn test_residual_fits_when_no_gate() {
        let stat = DecisionStatistic::new(StatisticKind::Residual, BandCalculator::symmetric(10, 1.0));
        let b: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let a: Vec<f64> = b
            .iter()
            .enumerate()
            .map(|(i, x)| 0.5 * x + 3.0 + if i % 2 == 0 { 0.2 } else { -0.2 })
            .collect();

        let point = stat.evaluate(&a, Some(&b), None, &mut every_tick()).unwrap();
        let fit = point.hedge.unwrap();
        assert_abs_diff_eq!(fit.hedge_ratio, 0.5, epsilon = 0.05);
        assert_abs_diff_eq!(point.band.center, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_spread_needs_hedge_leg() {
        let stat = DecisionStatistic::new(StatisticKind::Spread, BandCalculator::symmetric(3, 1.0));
        let result = stat.evaluate(&[1.0, 2.0, 3.0, 4.0], None, None, &mut every_tick());
        assert!(matches!(result, Err(StatsError::Degenerate(_))));
    }

    #[test]
    fn test_too_short_history() {
        let stat = DecisionStatistic::new(StatisticKind::Price, BandCalculator::symmetric(3, 1.0));
        let result = stat.evaluate(&[1.0, 2.0], None, None, &mut every_tick());
        assert_eq!(result, Err(StatsError::insufficient(3, 2)));
    }

    #[test]
    fn test_history_len() {
        assert_eq!(StatisticKind::Spread.history_len(20), 21);
        assert_eq!(StatisticKind::Residual.history_len(20), 20);
        assert!(!StatisticKind::Price.needs_hedge());
    }

    #[test]
    fn test_kind_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: StatisticKind,
        }
        let w: Wrapper = toml::from_str(r#"kind = "zscore""#).unwrap();
        assert_eq!(w.kind, StatisticKind::ZScore);
    }
}
