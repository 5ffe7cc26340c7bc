//! Backtest analytics and reporting

use super::types::{BacktestError, SkippedWindow, WindowResult};
use super::BacktestConfig;
use crate::stats::{
    bootstrap_ci, derive_seed, mean, BootstrapEstimate, IcSummary, RiskAdjustedMetrics,
    VarianceDecomposition,
};
use crate::telemetry::{set_gauge, GaugeMetric};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

const PRECISION_STREAM: u64 = 0;
const IC_STREAM: u64 = 1;
const RETURN_STREAM: u64 = 2;

/// Mean of a per-window metric with its bootstrap interval
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricSummary {
    /// Windows contributing
    pub n: usize,
    pub mean: Option<f64>,
    pub bootstrap: Option<BootstrapEstimate>,
}

/// IC distribution with significance test and bootstrap interval
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IcReport {
    #[serde(flatten)]
    pub summary: IcSummary,
    /// Evaluated windows whose IC was undefined (insufficient sample)
    pub windows_without_ic: usize,
    pub bootstrap: Option<BootstrapEstimate>,
}

/// Aggregated results for one forecast horizon
#[derive(Debug, Clone, Serialize)]
pub struct HorizonReport {
    pub horizon_days: u32,
    pub windows_total: usize,
    pub windows_evaluated: usize,
    pub windows_skipped: usize,
    pub precision_at_k: MetricSummary,
    pub information_coefficient: IcReport,
    pub mean_forward_return: MetricSummary,
    pub risk: RiskAdjustedMetrics,
    /// Omitted when no benchmark series is available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance_decomposition: Option<VarianceDecomposition>,
    pub skipped: Vec<SkippedWindow>,
    /// Per-window results, ordered by window start
    #[serde(skip)]
    pub windows: Vec<WindowResult>,
}

/// Complete backtest output across horizons
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub walk_days: f64,
    pub embargo_days: f64,
    pub k: usize,
    pub return_threshold: f64,
    pub risk_free_rate: f64,
    pub n_bootstrap: Option<usize>,
    pub seed: u64,
    /// Skipped windows across all horizons
    pub windows_skipped: usize,
    pub horizons: Vec<HorizonReport>,
}

impl BacktestReport {
    /// Assemble the report from per-horizon results
    pub fn new(config: &BacktestConfig, horizons: Vec<HorizonReport>) -> Self {
        Self {
            start: config.start,
            end: config.end,
            walk_days: config.walk.num_seconds() as f64 / 86_400.0,
            embargo_days: config.embargo.num_seconds() as f64 / 86_400.0,
            k: config.k,
            return_threshold: config.return_threshold,
            risk_free_rate: config.risk_free_rate,
            n_bootstrap: config.bootstrap.map(|b| b.n_resamples),
            seed: config.seed,
            windows_skipped: horizons.iter().map(|h| h.windows_skipped).sum(),
            horizons,
        }
    }

    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let mut out = format!(
            r#"
══════════════════════════════════════════════════════
               WALK-FORWARD BACKTEST
══════════════════════════════════════════════════════
Range:            {} → {}
Walk:             {}d   K: {}   Seed: {}
Bootstrap:        {}
"#,
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d"),
            self.walk_days,
            self.k,
            self.seed,
            self.n_bootstrap
                .map_or_else(|| "disabled".to_string(), |n| format!("{n} resamples")),
        );
        for horizon in &self.horizons {
            out.push_str(&horizon.format_table());
        }
        out.push_str("══════════════════════════════════════════════════════\n");
        out
    }
}

impl HorizonReport {
    /// Format one horizon section
    pub fn format_table(&self) -> String {
        let ic = &self.information_coefficient;
        format!(
            r#"
HORIZON {}d
───────────────────────────────────────────────────────
Windows:          {} evaluated, {} skipped
Precision@K:      {}  {}
Mean IC:          {}  {}
IC IR / t / p:    {} / {} / {}
Mean Return:      {}  {}
Sharpe Ratio:     {}
Sortino Ratio:    {}
Max Drawdown:     {}
Calmar Ratio:     {}
Win Rate:         {}
Profit Factor:    {}
"#,
            self.horizon_days,
            self.windows_evaluated,
            self.windows_skipped,
            fmt_opt(self.precision_at_k.mean, 3),
            fmt_ci(self.precision_at_k.bootstrap.as_ref()),
            fmt_opt(ic.summary.mean, 3),
            fmt_ci(ic.bootstrap.as_ref()),
            fmt_opt(ic.summary.information_ratio, 2),
            fmt_opt(ic.summary.t_stat, 2),
            fmt_opt(ic.summary.p_value, 3),
            fmt_opt(self.mean_forward_return.mean.map(|r| r * 100.0), 2),
            fmt_ci(self.mean_forward_return.bootstrap.as_ref()),
            fmt_opt(self.risk.sharpe, 2),
            fmt_opt(self.risk.sortino, 2),
            fmt_opt(self.risk.max_drawdown.map(|d| d * 100.0), 2),
            fmt_opt(self.risk.calmar, 2),
            fmt_opt(self.risk.win_rate.map(|w| w * 100.0), 1),
            fmt_opt(self.risk.profit_factor, 2),
        )
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.precision$}"))
}

fn fmt_ci(estimate: Option<&BootstrapEstimate>) -> String {
    estimate.map_or_else(String::new, |e| {
        format!("[{:.3}, {:.3}]", e.ci_lower, e.ci_upper)
    })
}

/// Aggregate ordered window results for one horizon.
///
/// Windows without an IC are excluded from IC statistics rather than counted
/// as zero. Bootstrap streams are seeded from the run seed, the horizon and
/// the metric so results do not depend on scheduling.
pub fn aggregate(
    horizon_days: u32,
    windows: Vec<WindowResult>,
    skipped: Vec<SkippedWindow>,
    config: &BacktestConfig,
    cancel: &CancellationToken,
) -> Result<HorizonReport, BacktestError> {
    let precision: Vec<f64> = windows.iter().map(|w| w.precision_at_k).collect();
    let ics: Vec<f64> = windows.iter().filter_map(|w| w.ic).collect();
    let returns: Vec<f64> = windows.iter().map(|w| w.mean_forward_return).collect();

    let streams = [
        ("precision_at_k", &precision, PRECISION_STREAM),
        ("information_coefficient", &ics, IC_STREAM),
        ("mean_forward_return", &returns, RETURN_STREAM),
    ];

    let mut estimates: Vec<Option<BootstrapEstimate>> = match config.bootstrap {
        Some(settings) => {
            set_gauge(GaugeMetric::BootstrapResamples, settings.n_resamples as f64);
            streams
                .par_iter()
                .map(|(name, values, stream)| {
                    if values.is_empty() {
                        return Ok(None);
                    }
                    let seed = derive_seed(config.seed, &[u64::from(horizon_days), *stream]);
                    bootstrap_ci(
                        name,
                        values,
                        settings.n_resamples,
                        settings.alpha,
                        seed,
                        mean,
                        cancel,
                    )
                    .map(Some)
                })
                .collect::<Result<Vec<_>, _>>()?
        }
        None => vec![None, None, None],
    };

    let return_bootstrap = estimates.pop().flatten();
    let ic_bootstrap = estimates.pop().flatten();
    let precision_bootstrap = estimates.pop().flatten();

    let risk = RiskAdjustedMetrics::from_returns(
        &returns,
        config.risk_free_rate,
        config.periods_per_year(),
    );

    let (strategy, benchmark): (Vec<f64>, Vec<f64>) = windows
        .iter()
        .filter_map(|w| w.benchmark_return.map(|b| (w.mean_forward_return, b)))
        .unzip();
    let variance_decomposition = VarianceDecomposition::fit(&strategy, &benchmark);

    tracing::debug!(
        horizon_days,
        windows = windows.len(),
        ic_windows = ics.len(),
        "Aggregated horizon"
    );

    Ok(HorizonReport {
        horizon_days,
        windows_total: windows.len() + skipped.len(),
        windows_evaluated: windows.len(),
        windows_skipped: skipped.len(),
        precision_at_k: MetricSummary {
            n: precision.len(),
            mean: mean(&precision),
            bootstrap: precision_bootstrap,
        },
        information_coefficient: IcReport {
            summary: IcSummary::from_values(&ics),
            windows_without_ic: windows.len() - ics.len(),
            bootstrap: ic_bootstrap,
        },
        mean_forward_return: MetricSummary {
            n: returns.len(),
            mean: mean(&returns),
            bootstrap: return_bootstrap,
        },
        risk,
        variance_decomposition,
        skipped,
        windows,
    })
}
