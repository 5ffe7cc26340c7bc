//! Statistics engine primitives
//!
//! Bootstrap confidence intervals, rank correlation, IC significance,
//! risk-adjusted metrics and variance decomposition. Degenerate inputs yield
//! `None` rather than NaN or infinity.

mod bootstrap;
mod correlation;
mod descriptive;
mod ic;
mod regression;
mod risk;

pub use bootstrap::{bootstrap_ci, derive_seed, BootstrapEstimate};
pub use correlation::{pearson, ranks, spearman};
pub use descriptive::{mean, percentile, std_dev, variance};
pub use ic::{IcSummary, IC_SIGNIFICANCE_LEVEL};
pub use regression::{VarianceDecomposition, MIN_REGRESSION_POINTS};
pub use risk::{annualized_return, max_drawdown, RiskAdjustedMetrics};

use thiserror::Error;

/// Statistics errors
#[derive(Debug, Error)]
pub enum StatsError {
    /// No observations to work with
    #[error("Empty sample")]
    EmptySample,
    /// Statistic undefined for the sample
    #[error("Statistic is undefined for this sample")]
    Degenerate,
    /// Bad resampling parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Cancelled between resamples
    #[error("Cancelled")]
    Cancelled,
}
