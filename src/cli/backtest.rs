//! Backtest command implementation

use crate::backtest::{BacktestError, BacktestHarness, ErrorPolicy};
use crate::config::{BacktestSection, Config};
use crate::data::SnapshotStore;
use crate::report::{suggest_weights, ReportEmitter};
use crate::scoring::{LinearScorer, Scorer};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug, Default)]
pub struct BacktestArgs {
    /// Range start (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub start: Option<String>,

    /// Range end (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub end: Option<String>,

    /// Walk interval, e.g. 30d
    #[arg(long)]
    pub walk: Option<String>,

    /// Top-K cut for precision
    #[arg(long)]
    pub k: Option<usize>,

    /// Comma-separated forecast horizons in days
    #[arg(long, value_delimiter = ',')]
    pub horizons: Option<Vec<u32>>,

    /// Annual risk-free rate
    #[arg(long)]
    pub risk_free_rate: Option<f64>,

    /// Bootstrap resamples per metric
    #[arg(long)]
    pub n_bootstrap: Option<usize>,

    /// Skip bootstrap confidence intervals
    #[arg(long)]
    pub no_bootstrap_ci: bool,

    /// Output directory for report files
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Seed for bootstrap resampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory containing Parquet snapshot files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Days between scoring cutoff and return measurement
    #[arg(long)]
    pub embargo_days: Option<u32>,

    /// Abort on the first data source error instead of skipping the window
    #[arg(long)]
    pub strict: bool,

    /// Concurrent window evaluations
    #[arg(long)]
    pub workers: Option<usize>,

    /// Do not write weights_suggestion.json
    #[arg(long)]
    pub no_weights: bool,

    /// Output format: json or table
    #[arg(long, default_value = "table")]
    pub format: String,
}

impl BacktestArgs {
    /// Apply flags on top of the file configuration
    pub fn merge(&self, file: &BacktestSection) -> BacktestSection {
        let mut section = file.clone();
        if let Some(start) = &self.start {
            section.start = Some(start.clone());
        }
        if let Some(end) = &self.end {
            section.end = Some(end.clone());
        }
        if let Some(walk) = &self.walk {
            section.walk = walk.clone();
        }
        if let Some(k) = self.k {
            section.k = k;
        }
        if let Some(horizons) = &self.horizons {
            section.horizons = horizons.clone();
        }
        if let Some(rate) = self.risk_free_rate {
            section.risk_free_rate = rate;
        }
        if let Some(n) = self.n_bootstrap {
            section.n_bootstrap = n;
        }
        if self.no_bootstrap_ci {
            section.bootstrap = false;
        }
        if let Some(output) = &self.output {
            section.output_dir = output.clone();
        }
        if let Some(seed) = self.seed {
            section.seed = seed;
        }
        if let Some(embargo) = self.embargo_days {
            section.embargo_days = embargo;
        }
        if self.strict {
            section.error_policy = ErrorPolicy::Strict;
        }
        if let Some(workers) = self.workers {
            section.workers = Some(workers);
        }
        if self.no_weights {
            section.suggest_weights = false;
        }
        section
    }

    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        if !matches!(self.format.as_str(), "table" | "json") {
            return Err(BacktestError::Configuration(format!(
                "unknown output format '{}'",
                self.format
            ))
            .into());
        }

        let section = self.merge(&config.backtest);
        let backtest_config = section.settings()?.validate()?;
        for &h in &backtest_config.horizons_days {
            backtest_config.windows_for(h)?;
        }

        if config.scoring.weights.is_empty() {
            return Err(
                BacktestError::Configuration("no [scoring.weights] configured".into()).into(),
            );
        }
        let scorer = LinearScorer::new(config.scoring.weights.clone());
        let current_weights = scorer.weights();

        let data_dir = self.data_dir.as_ref().unwrap_or(&config.data.data_dir);
        tracing::info!(dir = %data_dir.display(), "Loading snapshots");
        let mut store = SnapshotStore::load_dir(data_dir).map_err(BacktestError::from)?;
        if let Some(benchmark) = &config.data.benchmark_entity {
            store = store.with_benchmark(benchmark.clone());
        }
        if let Some(staleness) = config.data.max_staleness()? {
            store = store.with_max_staleness(staleness);
        }
        tracing::info!(entities = store.entity_count(), "Snapshots loaded");

        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling backtest");
                on_signal.cancel();
            }
        });

        let harness = BacktestHarness::new(backtest_config, Arc::new(store), Arc::new(scorer))
            .with_cancellation(cancel);
        let report = harness.run().await?;

        let suggestion = section
            .suggest_weights
            .then(|| suggest_weights(&report, &current_weights));
        let emitter = ReportEmitter::new(&section.output_dir);
        let written = emitter.emit(&report, suggestion.as_ref())?;

        if self.format == "json" {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", report.format_table());
            for path in &written {
                println!("Wrote {}", path.display());
            }
        }

        Ok(())
    }
}
