//! Writes run artifacts: `summary.json`, `windows.csv`, `weights_suggestion.json`

use super::weights::WeightsSuggestion;
use crate::backtest::{BacktestError, BacktestReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE: &str = "summary.json";
pub const WINDOWS_FILE: &str = "windows.csv";
pub const WEIGHTS_FILE: &str = "weights_suggestion.json";

/// One `windows.csv` row
#[derive(Debug, Serialize)]
struct WindowRow {
    horizon_days: u32,
    window_index: usize,
    window_start: DateTime<Utc>,
    train_cutoff: DateTime<Utc>,
    window_end: DateTime<Utc>,
    entities: usize,
    precision_at_k: f64,
    ic: Option<f64>,
    mean_forward_return: f64,
    benchmark_return: Option<f64>,
}

/// Writes report files into an output directory
pub struct ReportEmitter {
    output_dir: PathBuf,
}

impl ReportEmitter {
    /// Create a new emitter
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Ensure output directory exists
    pub fn ensure_dir(&self) -> Result<(), BacktestError> {
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write all artifacts, returning the paths written
    pub fn emit(
        &self,
        report: &BacktestReport,
        weights: Option<&WeightsSuggestion>,
    ) -> Result<Vec<PathBuf>, BacktestError> {
        self.ensure_dir()?;

        let mut written = vec![self.write_summary(report)?, self.write_windows(report)?];
        if let Some(weights) = weights {
            written.push(self.write_weights(weights)?);
        }

        tracing::info!(
            dir = %self.output_dir.display(),
            files = written.len(),
            "Report written"
        );
        Ok(written)
    }

    /// Write the aggregated summary
    pub fn write_summary(&self, report: &BacktestReport) -> Result<PathBuf, BacktestError> {
        self.write_json(SUMMARY_FILE, report)
    }

    /// Write one row per evaluated window
    pub fn write_windows(&self, report: &BacktestReport) -> Result<PathBuf, BacktestError> {
        let path = self.output_dir.join(WINDOWS_FILE);
        std::fs::write(&path, windows_csv(report)?)?;
        Ok(path)
    }

    /// Write the weight suggestion
    pub fn write_weights(&self, weights: &WeightsSuggestion) -> Result<PathBuf, BacktestError> {
        self.write_json(WEIGHTS_FILE, weights)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, BacktestError> {
        let path = self.output_dir.join(name);
        let mut json = serde_json::to_string_pretty(value)?;
        json.push('\n');
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

/// Render `windows.csv`. Skipped windows have no row.
pub fn windows_csv(report: &BacktestReport) -> Result<Vec<u8>, BacktestError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for horizon in &report.horizons {
        for result in &horizon.windows {
            wtr.serialize(WindowRow {
                horizon_days: horizon.horizon_days,
                window_index: result.window.index,
                window_start: result.window.start,
                train_cutoff: result.window.train_cutoff,
                window_end: result.window.end,
                entities: result.complete_entities().count(),
                precision_at_k: result.precision_at_k,
                ic: result.ic,
                mean_forward_return: result.mean_forward_return,
                benchmark_return: result.benchmark_return,
            })?;
        }
    }
    wtr.into_inner()
        .map_err(|e| BacktestError::Report(format!("failed to flush CSV: {e}")))
}

/// Write all artifacts into `output_dir`
pub fn emit(
    report: &BacktestReport,
    weights: Option<&WeightsSuggestion>,
    output_dir: impl Into<PathBuf>,
) -> Result<Vec<PathBuf>, BacktestError> {
    ReportEmitter::new(output_dir).emit(report, weights)
}
