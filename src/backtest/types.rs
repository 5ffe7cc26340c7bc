//! Backtest data model and errors

use crate::data::DataSourceError;
use crate::stats::StatsError;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// One walk-forward window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    /// Position in the generated sequence
    pub index: usize,
    /// Window start
    pub start: DateTime<Utc>,
    /// Information cutoff for scoring
    pub train_cutoff: DateTime<Utc>,
    /// Start of the realized-return interval (cutoff plus embargo)
    pub evaluation_start: DateTime<Utc>,
    /// End of the realized-return interval
    pub end: DateTime<Utc>,
}

impl Window {
    /// Length of the realized-return interval
    pub fn horizon(&self) -> Duration {
        self.end - self.evaluation_start
    }
}

/// Entity with its predicted score and realized forward return
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntity {
    pub entity_id: String,
    pub predicted_score: f64,
    /// Filled in once the forward horizon has elapsed
    pub realized_return: Option<f64>,
    /// Features the score was computed from
    pub features: BTreeMap<String, f64>,
}

/// Evaluation of a single window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowResult {
    pub window: Window,
    /// Fraction of the top K with a return above the threshold, in `[0, 1]`
    pub precision_at_k: f64,
    /// Spearman IC in `[-1, 1]`; `None` when the sample is too small
    pub ic: Option<f64>,
    /// Mean realized return across entities with complete data
    pub mean_forward_return: f64,
    /// Benchmark return over the same interval
    pub benchmark_return: Option<f64>,
    /// Entities ranked by score descending, ties by id ascending
    pub entities: Vec<ScoredEntity>,
}

impl WindowResult {
    /// Entities that have a realized return
    pub fn complete_entities(&self) -> impl Iterator<Item = &ScoredEntity> {
        self.entities.iter().filter(|e| e.realized_return.is_some())
    }
}

/// Why a window was left out of aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// No entities with complete data
    NoData,
    /// Snapshot or return fetch failed
    DataSourceError(String),
}

impl SkipReason {
    /// Stable reason code for reports and metrics
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::NoData => "no_data",
            SkipReason::DataSourceError(_) => "data_source_error",
        }
    }
}

/// A window that was skipped, with its reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedWindow {
    pub window: Window,
    pub reason: SkipReason,
}

/// Failure evaluating one window
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The snapshot or the return set was empty
    #[error("No entities with complete data")]
    NoData,
    /// Data source failed
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
}

/// Backtest errors
#[derive(Debug, Error)]
pub enum BacktestError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Range too short to produce any window
    #[error("No windows generated: {start} to {end} is shorter than walk + horizon ({required_days} days)")]
    InsufficientRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        required_days: i64,
    },
    /// Data could not be loaded
    #[error("Data source error: {0}")]
    DataLoad(#[from] DataSourceError),
    /// Window fetch failed in strict mode
    #[error("Data source error in window {window_start} to {window_end}: {source}")]
    WindowData {
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        #[source]
        source: DataSourceError,
    },
    /// Run was cancelled
    #[error("Backtest cancelled")]
    Cancelled,
    /// Aggregation failed
    #[error("Aggregation failed: {0}")]
    Aggregation(String),
    /// Report could not be written
    #[error("Report error: {0}")]
    Report(String),
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            BacktestError::Configuration(_) => 2,
            BacktestError::InsufficientRange { .. } => 3,
            BacktestError::DataLoad(_) | BacktestError::WindowData { .. } => 4,
            BacktestError::Cancelled => 130,
            _ => 1,
        }
    }
}

impl From<StatsError> for BacktestError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::Cancelled => BacktestError::Cancelled,
            other => BacktestError::Aggregation(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for BacktestError {
    fn from(err: serde_json::Error) -> Self {
        BacktestError::Report(err.to_string())
    }
}

impl From<csv::Error> for BacktestError {
    fn from(err: csv::Error) -> Self {
        BacktestError::Report(err.to_string())
    }
}
