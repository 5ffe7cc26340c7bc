//! Risk-adjusted return metrics over a per-period return series

use super::descriptive::{finite, mean, safe_ratio, std_dev};
use serde::Serialize;

/// Risk-adjusted metrics; each is `None` when undefined for the series
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskAdjustedMetrics {
    /// Number of return periods
    pub periods: usize,
    /// Annualisation factor used
    pub periods_per_year: f64,
    /// Annualised Sharpe ratio
    pub sharpe: Option<f64>,
    /// Annualised Sortino ratio
    pub sortino: Option<f64>,
    /// Largest peak-to-trough decline of the compounded curve, as a positive fraction
    pub max_drawdown: Option<f64>,
    /// Compounded annual growth rate
    pub annualized_return: Option<f64>,
    /// Annualised return over max drawdown
    pub calmar: Option<f64>,
    /// Fraction of periods with a positive return
    pub win_rate: Option<f64>,
    /// Gross gains over gross losses
    pub profit_factor: Option<f64>,
}

impl RiskAdjustedMetrics {
    /// Compute metrics from an ordered return series.
    ///
    /// `risk_free_rate` is annual and converted to a per-period rate.
    pub fn from_returns(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> Self {
        let rf_per_period = risk_free_rate / periods_per_year;
        let annualizer = periods_per_year.sqrt();

        let avg = mean(returns);
        let sharpe = match (avg, std_dev(returns)) {
            (Some(m), Some(s)) => safe_ratio(m - rf_per_period, s).and_then(|r| finite(r * annualizer)),
            _ => None,
        };

        let negatives: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
        let sortino = match (avg, std_dev(&negatives)) {
            (Some(m), Some(d)) => safe_ratio(m - rf_per_period, d).and_then(|r| finite(r * annualizer)),
            _ => None,
        };

        let max_drawdown = max_drawdown(returns);
        let annualized_return = annualized_return(returns, periods_per_year);
        let calmar = match (annualized_return, max_drawdown) {
            (Some(ar), Some(dd)) => safe_ratio(ar, dd.abs()),
            _ => None,
        };

        let win_rate = if returns.is_empty() {
            None
        } else {
            let wins = returns.iter().filter(|r| **r > 0.0).count();
            Some(wins as f64 / returns.len() as f64)
        };

        let gains: f64 = returns.iter().filter(|r| **r > 0.0).sum();
        let losses: f64 = negatives.iter().sum::<f64>().abs();
        let profit_factor = safe_ratio(gains, losses);

        Self {
            periods: returns.len(),
            periods_per_year,
            sharpe,
            sortino,
            max_drawdown,
            annualized_return,
            calmar,
            win_rate,
            profit_factor,
        }
    }
}

/// Maximum drawdown of the compounded equity curve starting at 1.0
pub fn max_drawdown(returns: &[f64]) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }

    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut worst = 0.0_f64;
    for r in returns {
        equity *= 1.0 + r;
        peak = peak.max(equity);
        if peak > 0.0 {
            worst = worst.max((peak - equity) / peak);
        }
    }
    finite(worst)
}

/// Compound annual growth rate of the series
pub fn annualized_return(returns: &[f64], periods_per_year: f64) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let growth: f64 = returns.iter().map(|r| 1.0 + r).product();
    if growth <= 0.0 {
        return None;
    }
    finite(growth.powf(periods_per_year / returns.len() as f64) - 1.0)
}
