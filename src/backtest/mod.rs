//! Walk-forward backtesting module
//!
//! Generates walk-forward windows, scores each window's snapshot, measures
//! precision@K and IC against realized returns, and aggregates per-horizon
//! statistics

mod analytics;
mod evaluator;
mod harness;
mod types;
mod window;

pub use analytics::{aggregate, BacktestReport, HorizonReport, IcReport, MetricSummary};
pub use evaluator::{evaluate_window, precision_at_k, rank_entities};
pub use harness::BacktestHarness;
pub use types::{
    BacktestError, EvaluationError, ScoredEntity, SkipReason, SkippedWindow, Window, WindowResult,
};
pub use window::{generate_windows, generate_windows_with_embargo};

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::ops::Deref;

/// Seed used when none is given
pub const DEFAULT_SEED: u64 = 42;
/// Default number of bootstrap resamples
pub const DEFAULT_N_BOOTSTRAP: usize = 10_000;

/// Handling of per-window data source failures
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Skip the window and record it
    #[default]
    Lenient,
    /// Abort the whole run
    Strict,
}

/// Bootstrap resampling settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapSettings {
    /// Resamples per metric
    pub n_resamples: usize,
    /// Two-sided significance level (0.05 gives a 95% interval)
    pub alpha: f64,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            n_resamples: DEFAULT_N_BOOTSTRAP,
            alpha: 0.05,
        }
    }
}

/// Raw backtest settings, validated into a [`BacktestConfig`]
#[derive(Debug, Clone)]
pub struct BacktestSettings {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Stride between consecutive windows
    pub walk: Duration,
    /// Forecast horizons in days, one report each
    pub horizons_days: Vec<u32>,
    /// Top-K cut for precision
    pub k: usize,
    /// A top-K entity is a hit when its return is strictly above this
    pub return_threshold: f64,
    /// Minimum complete entities for an IC
    pub min_ic_sample: usize,
    /// Annual risk-free rate
    pub risk_free_rate: f64,
    /// Overrides the walk-derived annualisation factor
    pub periods_per_year: Option<f64>,
    /// `None` skips bootstrap CIs
    pub bootstrap: Option<BootstrapSettings>,
    pub seed: u64,
    /// Gap between scoring cutoff and return measurement
    pub embargo: Duration,
    pub error_policy: ErrorPolicy,
    /// Concurrent window evaluations
    pub workers: usize,
}

impl BacktestSettings {
    /// Settings with defaults for everything but the date range
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            walk: Duration::days(30),
            horizons_days: vec![7, 14, 30],
            k: 10,
            return_threshold: 0.0,
            min_ic_sample: 5,
            risk_free_rate: 0.0,
            periods_per_year: None,
            bootstrap: Some(BootstrapSettings::default()),
            seed: DEFAULT_SEED,
            embargo: Duration::zero(),
            error_policy: ErrorPolicy::Lenient,
            workers: default_workers(),
        }
    }

    /// Validate into an immutable config
    pub fn validate(self) -> Result<BacktestConfig, BacktestError> {
        let invalid = |msg: String| Err(BacktestError::Configuration(msg));

        if self.start >= self.end {
            return invalid(format!(
                "start ({}) must be before end ({})",
                self.start, self.end
            ));
        }
        if self.walk <= Duration::zero() {
            return invalid("walk interval must be positive".into());
        }
        if self.horizons_days.is_empty() {
            return invalid("at least one horizon is required".into());
        }
        let range = self.end - self.start;
        for &h in &self.horizons_days {
            if h == 0 {
                return invalid("horizons must be positive".into());
            }
            if Duration::days(i64::from(h)) > range {
                return invalid(format!("horizon of {h}d exceeds the backtest range"));
            }
        }
        if self.k == 0 {
            return invalid("k must be at least 1".into());
        }
        if self.min_ic_sample < 2 {
            return invalid("min_ic_sample must be at least 2".into());
        }
        if !self.return_threshold.is_finite() {
            return invalid("return threshold must be finite".into());
        }
        if !self.risk_free_rate.is_finite() {
            return invalid("risk-free rate must be finite".into());
        }
        if let Some(ppy) = self.periods_per_year {
            if !(ppy.is_finite() && ppy > 0.0) {
                return invalid("periods_per_year must be positive".into());
            }
        }
        if let Some(bootstrap) = self.bootstrap {
            if bootstrap.n_resamples == 0 {
                return invalid("n_bootstrap must be at least 1".into());
            }
            if !(bootstrap.alpha > 0.0 && bootstrap.alpha < 1.0) {
                return invalid(format!("alpha must be in (0, 1), got {}", bootstrap.alpha));
            }
        }
        if self.embargo < Duration::zero() {
            return invalid("embargo cannot be negative".into());
        }
        if self.workers == 0 {
            return invalid("workers must be at least 1".into());
        }

        Ok(BacktestConfig(self))
    }
}

/// Validated backtest configuration
#[derive(Debug, Clone)]
pub struct BacktestConfig(BacktestSettings);

impl Deref for BacktestConfig {
    type Target = BacktestSettings;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl BacktestConfig {
    /// Horizon duration for a horizon in days
    pub fn horizon(&self, days: u32) -> Duration {
        Duration::days(i64::from(days))
    }

    /// Annualisation factor: override, or one period per walk stride
    pub fn periods_per_year(&self) -> f64 {
        self.0.periods_per_year.unwrap_or_else(|| {
            let walk_days = self.walk.num_seconds() as f64 / 86_400.0;
            365.0 / walk_days
        })
    }

    /// Walk-forward windows for one horizon
    pub fn windows_for(&self, horizon_days: u32) -> Result<Vec<Window>, BacktestError> {
        generate_windows_with_embargo(
            self.start,
            self.end,
            self.walk,
            self.horizon(horizon_days),
            self.embargo,
        )
    }
}

/// Worker count from available parallelism
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn settings() -> BacktestSettings {
        BacktestSettings::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_defaults_validate() {
        let config = settings().validate().unwrap();
        assert_eq!(config.k, 10);
        assert_eq!(config.horizons_days, vec![7, 14, 30]);
        assert_eq!(config.seed, DEFAULT_SEED);
        assert_eq!(config.bootstrap.unwrap().n_resamples, 10_000);
        assert_eq!(config.error_policy, ErrorPolicy::Lenient);
    }

    #[test]
    fn test_reversed_range_rejected() {
        let mut s = settings();
        std::mem::swap(&mut s.start, &mut s.end);
        assert!(matches!(s.validate(), Err(BacktestError::Configuration(_))));
    }

    #[test]
    fn test_horizon_longer_than_range_rejected() {
        let mut s = settings();
        s.horizons_days = vec![7, 400];
        assert!(matches!(s.validate(), Err(BacktestError::Configuration(_))));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let mut s = settings();
        s.k = 0;
        assert!(s.validate().is_err());

        let mut s = settings();
        s.walk = Duration::zero();
        assert!(s.validate().is_err());

        let mut s = settings();
        s.bootstrap = Some(BootstrapSettings {
            n_resamples: 100,
            alpha: 0.0,
        });
        assert!(s.validate().is_err());

        let mut s = settings();
        s.horizons_days.clear();
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_periods_per_year() {
        let config = settings().validate().unwrap();
        assert!((config.periods_per_year() - 365.0 / 30.0).abs() < 1e-12);

        let mut s = settings();
        s.periods_per_year = Some(52.0);
        assert_eq!(s.validate().unwrap().periods_per_year(), 52.0);
    }
}
