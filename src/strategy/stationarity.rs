//! Augmented Dickey-Fuller Unit-Root Test
//!
//! Fits, with a constant and `lag` lagged differences:
//!
//!   dy(t) = alpha + gamma * y(t-1) + sum_i beta_i * dy(t-i) + e(t)
//!
//! The test statistic is the t-ratio of gamma. Under the unit-root null it
//! does not follow a t distribution, so the p-value comes from MacKinnon's
//! (1994) response-surface approximation for the constant-only, one-series
//! case.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, Normal};

use super::error::StatsError;
use super::regression::ols;

/// Above this statistic the p-value is 1
const TAU_MAX: f64 = 2.74;
/// Below this statistic the p-value is 0
const TAU_MIN: f64 = -18.83;
/// Switch point between the small-p and large-p polynomials
const TAU_STAR: f64 = -1.61;
/// Polynomial in tau (ascending powers) used at or below TAU_STAR
const SMALL_P: [f64; 3] = [2.1659, 1.4412, 3.8269e-2];
/// Polynomial in tau (ascending powers) used above TAU_STAR
const LARGE_P: [f64; 4] = [1.7339, 9.3202e-1, -1.2745e-1, -1.0368e-2];

/// Outcome of one ADF test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdfResult {
    /// t-ratio of the lagged level coefficient
    pub statistic: f64,
    /// Approximate probability of observing `statistic` under a unit root
    pub p_value: f64,
    pub lag: usize,
    /// Rows used in the regression
    pub n_obs: usize,
}

impl AdfResult {
    /// Unit root rejected at the given significance
    pub fn is_stationary(&self, significance: f64) -> bool {
        self.p_value < significance
    }
}

/// Unit-root tester with a fixed number of lagged differences
#[derive(Debug, Clone, Copy)]
pub struct StationarityTester {
    lag: usize,
}

impl Default for StationarityTester {
    fn default() -> Self {
        Self { lag: 1 }
    }
}

impl StationarityTester {
    pub fn new(lag: usize) -> Self {
        Self { lag }
    }

    pub fn lag(&self) -> usize {
        self.lag
    }

    /// Shortest series that leaves one residual degree of freedom
    pub fn min_len(&self) -> usize {
        2 * self.lag + 4
    }

    pub fn test(&self, series: &[f64]) -> Result<AdfResult, StatsError> {
        let required = self.min_len();
        if series.len() < required {
            return Err(StatsError::insufficient(required, series.len()));
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(StatsError::NonFinite("stationarity input"));
        }

        let lag = self.lag;
        let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
        let n_obs = diffs.len() - lag;
        let k = 2 + lag;

        // Columns: constant, lagged level, lagged differences
        let design = DMatrix::from_fn(n_obs, k, |row, col| {
            let t = row + lag;
            match col {
                0 => 1.0,
                1 => series[t],
                j => diffs[t - (j - 1)],
            }
        });
        let response = DVector::from_iterator(n_obs, diffs[lag..].iter().copied());

        let fit = ols(&design, &response)?;
        let statistic = fit.t_stat(1);
        if !statistic.is_finite() {
            return Err(StatsError::NonFinite("adf statistic"));
        }

        Ok(AdfResult {
            statistic,
            p_value: mackinnon_p_value(statistic),
            lag,
            n_obs,
        })
    }
}

/// Approximate p-value of an ADF statistic (constant, one series)
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }

    let coefficients: &[f64] = if statistic <= TAU_STAR { &SMALL_P } else { &LARGE_P };
    let z = coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * statistic + c);

    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.cdf(z),
        Err(_) => f64::NAN,
    }
}

/// First differences of a series
pub fn difference(series: &[f64]) -> Vec<f64> {
    series.windows(2).map(|w| w[1] - w[0]).collect()
}
