//! Engle-Granger Cointegration Gate
//!
//! Two-step procedure deciding whether spread trading is permitted:
//! 1. Both legs must share an integration order. Level tests that disagree
//!    reject outright; level tests that agree fall through to the
//!    first-difference tests, which must both come out stationary.
//! 2. The OLS residual of lead on hedge must be stationary.
//!
//! An invalid gate carries no regression output: callers read
//! `hedge_ratio`/`intercept` only after checking `valid`.

use serde::{Deserialize, Serialize};

use super::error::StatsError;
use super::regression::HedgeRatioEstimator;
use super::stationarity::{difference, StationarityTester};

/// Default significance for every unit-root test in the gate
pub const DEFAULT_SIGNIFICANCE: f64 = 0.10;

/// Step at which the gate rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    /// One leg stationary in levels, the other not
    LevelMismatch,
    /// At least one leg is not stationary after differencing
    DifferenceNonStationary,
    /// The regression residual still has a unit root
    ResidualNonStationary,
}

/// Outcome of the cointegration gate
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityGate {
    pub hedge_ratio: f64,
    pub intercept: f64,
    pub residuals: Vec<f64>,
    pub valid: bool,
    pub rejection: Option<Rejection>,
    /// ADF p-value of the residual, when the procedure got that far
    pub residual_p_value: Option<f64>,
}

impl ValidityGate {
    fn rejected(rejection: Rejection, residual_p_value: Option<f64>) -> Self {
        Self {
            hedge_ratio: 0.0,
            intercept: 0.0,
            residuals: Vec::new(),
            valid: false,
            rejection: Some(rejection),
            residual_p_value,
        }
    }

    /// Gate for engines that do not require cointegration
    pub fn always_valid() -> Self {
        Self {
            hedge_ratio: 0.0,
            intercept: 0.0,
            residuals: Vec::new(),
            valid: true,
            rejection: None,
            residual_p_value: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CointegrationValidator {
    tester: StationarityTester,
    significance: f64,
    estimator: HedgeRatioEstimator,
}

impl Default for CointegrationValidator {
    fn default() -> Self {
        Self::new(StationarityTester::default(), DEFAULT_SIGNIFICANCE)
    }
}

impl CointegrationValidator {
    pub fn new(tester: StationarityTester, significance: f64) -> Self {
        Self {
            tester,
            significance,
            estimator: HedgeRatioEstimator,
        }
    }

    pub fn significance(&self) -> f64 {
        self.significance
    }

    /// Run the gate on lead series `a` and hedge series `b`
    pub fn validate(&self, a: &[f64], b: &[f64]) -> Result<ValidityGate, StatsError> {
        if a.len() != b.len() {
            return Err(StatsError::LengthMismatch(a.len(), b.len()));
        }

        let a_level = self.tester.test(a)?.is_stationary(self.significance);
        let b_level = self.tester.test(b)?.is_stationary(self.significance);
        if a_level != b_level {
            tracing::debug!(a_level, b_level, "integration orders differ");
            return Ok(ValidityGate::rejected(Rejection::LevelMismatch, None));
        }

        let a_diff = self.tester.test(&difference(a))?.is_stationary(self.significance);
        let b_diff = self.tester.test(&difference(b))?.is_stationary(self.significance);
        if !(a_diff && b_diff) {
            tracing::debug!(a_diff, b_diff, "differenced series not stationary");
            return Ok(ValidityGate::rejected(Rejection::DifferenceNonStationary, None));
        }

        let fit = self.estimator.fit(a, b)?;
        let residuals = fit.residuals(a, b);
        let residual_test = self.tester.test(&residuals)?;

        if !residual_test.is_stationary(self.significance) {
            tracing::debug!(
                p_value = residual_test.p_value,
                hedge_ratio = fit.hedge_ratio,
                "residual not stationary"
            );
            return Ok(ValidityGate::rejected(
                Rejection::ResidualNonStationary,
                Some(residual_test.p_value),
            ));
        }

        Ok(ValidityGate {
            hedge_ratio: fit.hedge_ratio,
            intercept: fit.intercept,
            residuals,
            valid: true,
            rejection: None,
            residual_p_value: Some(residual_test.p_value),
        })
    }
}
