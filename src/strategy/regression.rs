//! Ordinary Least Squares
//!
//! Two entry points: the closed-form simple regression used for hedge
//! ratios, and a general multi-regressor fit (normal equations via
//! nalgebra) used by the ADF test, which needs coefficient standard errors.

use nalgebra::{DMatrix, DVector};

use super::error::StatsError;

/// Variance floor below which a regressor is treated as constant
const MIN_VARIANCE: f64 = 1e-12;

/// Hedge ratio and intercept of `a = hedge_ratio * b + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HedgeFit {
    pub hedge_ratio: f64,
    pub intercept: f64,
}

impl HedgeFit {
    /// Residual `a - hedge_ratio * b - intercept` for one observation
    pub fn residual(&self, a: f64, b: f64) -> f64 {
        a - self.hedge_ratio * b - self.intercept
    }

    pub fn residuals(&self, a: &[f64], b: &[f64]) -> Vec<f64> {
        a.iter().zip(b).map(|(&x, &y)| self.residual(x, y)).collect()
    }
}

/// Regresses one series on another with an intercept
#[derive(Debug, Clone, Copy, Default)]
pub struct HedgeRatioEstimator;

impl HedgeRatioEstimator {
    pub fn fit(&self, a: &[f64], b: &[f64]) -> Result<HedgeFit, StatsError> {
        if a.len() != b.len() {
            return Err(StatsError::LengthMismatch(a.len(), b.len()));
        }
        let n = a.len();
        if n < 2 {
            return Err(StatsError::insufficient(2, n));
        }

        let mean_a = a.iter().sum::<f64>() / n as f64;
        let mean_b = b.iter().sum::<f64>() / n as f64;

        let (mut cov, mut var_b) = (0.0, 0.0);
        for (&x, &y) in a.iter().zip(b) {
            cov += (y - mean_b) * (x - mean_a);
            var_b += (y - mean_b) * (y - mean_b);
        }

        if var_b / (n as f64) < MIN_VARIANCE {
            return Err(StatsError::Degenerate("hedge series has no variance".to_string()));
        }

        let hedge_ratio = cov / var_b;
        let intercept = mean_a - hedge_ratio * mean_b;
        if !hedge_ratio.is_finite() || !intercept.is_finite() {
            return Err(StatsError::NonFinite("hedge regression"));
        }

        Ok(HedgeFit { hedge_ratio, intercept })
    }
}

/// Result of a general OLS fit
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub residual_variance: f64,
}

impl OlsFit {
    /// t-statistic of coefficient `i`
    pub fn t_stat(&self, i: usize) -> f64 {
        self.coefficients[i] / self.std_errors[i]
    }
}

/// Fit `y = X * beta` where `x` is an `n x k` design matrix.
pub fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<OlsFit, StatsError> {
    let (n, k) = x.shape();
    if y.len() != n {
        return Err(StatsError::LengthMismatch(n, y.len()));
    }
    if n <= k {
        return Err(StatsError::insufficient(k + 1, n));
    }

    let xtx = x.transpose() * x;
    let xtx_inv = xtx
        .try_inverse()
        .ok_or_else(|| StatsError::Degenerate("singular design matrix".to_string()))?;
    let beta = &xtx_inv * (x.transpose() * y);

    let residuals = y - x * &beta;
    let rss = residuals.dot(&residuals);
    let residual_variance = rss / (n - k) as f64;

    if !residual_variance.is_finite() {
        return Err(StatsError::NonFinite("ols residuals"));
    }
    if residual_variance < MIN_VARIANCE {
        return Err(StatsError::Degenerate("perfect fit, zero residual variance".to_string()));
    }

    let std_errors = (0..k)
        .map(|i| (residual_variance * xtx_inv[(i, i)]).sqrt())
        .collect::<Vec<_>>();

    if std_errors.iter().any(|se| !se.is_finite() || *se <= 0.0) {
        return Err(StatsError::Degenerate("non-positive coefficient variance".to_string()));
    }

    Ok(OlsFit {
        coefficients: beta.iter().copied().collect(),
        std_errors,
        residual_variance,
    })
}
