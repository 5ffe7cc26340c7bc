//! Single-factor variance decomposition against a benchmark

use super::descriptive::{finite, mean, safe_ratio, variance};
use serde::Serialize;

/// Minimum paired observations for a regression
pub const MIN_REGRESSION_POINTS: usize = 3;

/// OLS fit of strategy returns on benchmark returns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceDecomposition {
    /// Number of paired observations
    pub n: usize,
    /// Intercept per period
    pub alpha: f64,
    /// Slope on the benchmark
    pub beta: f64,
    /// Share of return variance explained by the benchmark
    pub systematic_share: f64,
    /// Share of return variance left in the residual
    pub residual_share: f64,
    /// Sample variance of the residuals
    pub residual_variance: f64,
}

impl VarianceDecomposition {
    /// Regress `returns` on `benchmark`; `None` when the fit is undefined
    pub fn fit(returns: &[f64], benchmark: &[f64]) -> Option<Self> {
        if returns.len() != benchmark.len() || returns.len() < MIN_REGRESSION_POINTS {
            return None;
        }

        let n = returns.len();
        let mr = mean(returns)?;
        let mb = mean(benchmark)?;
        let var_r = variance(returns)?;
        let var_b = variance(benchmark)?;
        if var_r == 0.0 || var_b == 0.0 {
            return None;
        }

        let cov = returns
            .iter()
            .zip(benchmark)
            .map(|(r, b)| (r - mr) * (b - mb))
            .sum::<f64>()
            / (n - 1) as f64;

        let beta = safe_ratio(cov, var_b)?;
        let alpha = finite(mr - beta * mb)?;

        let residuals: Vec<f64> = returns
            .iter()
            .zip(benchmark)
            .map(|(r, b)| r - alpha - beta * b)
            .collect();
        let residual_variance = residuals.iter().map(|e| e * e).sum::<f64>() / (n - 1) as f64;

        let systematic_share = safe_ratio(beta * beta * var_b, var_r)?.clamp(0.0, 1.0);

        Some(Self {
            n,
            alpha,
            beta,
            systematic_share,
            residual_share: 1.0 - systematic_share,
            residual_variance: finite(residual_variance)?,
        })
    }
}
