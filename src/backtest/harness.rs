//! Backtest harness: worker pool over windows, one aggregation per horizon

use super::analytics::{aggregate, BacktestReport, HorizonReport};
use super::evaluator::evaluate_window;
use super::types::{
    BacktestError, EvaluationError, SkipReason, SkippedWindow, Window, WindowResult,
};
use super::{BacktestConfig, ErrorPolicy};
use crate::data::SnapshotProvider;
use crate::scoring::Scorer;
use crate::telemetry::{increment_counter, record_latency, CounterMetric, LatencyMetric};
use futures_util::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

type WindowOutcome = (Window, Result<WindowResult, EvaluationError>);

/// Runs walk-forward backtests
pub struct BacktestHarness {
    config: Arc<BacktestConfig>,
    provider: Arc<dyn SnapshotProvider>,
    scorer: Arc<dyn Scorer>,
    cancel: CancellationToken,
    /// Caps in-flight window evaluations across all horizons
    slots: Arc<Semaphore>,
}

impl BacktestHarness {
    /// Create a new harness
    pub fn new(
        config: BacktestConfig,
        provider: Arc<dyn SnapshotProvider>,
        scorer: Arc<dyn Scorer>,
    ) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(config.workers)),
            config: Arc::new(config),
            provider,
            scorer,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an external cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this run
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Configuration in use
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run every configured horizon.
    ///
    /// All window sets are generated up front so that an insufficient range
    /// fails before any evaluation starts.
    pub async fn run(&self) -> Result<BacktestReport, BacktestError> {
        let plans = self
            .config
            .horizons_days
            .iter()
            .map(|&h| self.config.windows_for(h).map(|windows| (h, windows)))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            start = %self.config.start,
            end = %self.config.end,
            horizons = ?self.config.horizons_days,
            workers = self.config.workers,
            seed = self.config.seed,
            "Starting walk-forward backtest"
        );

        let horizons = try_join_all(
            plans
                .into_iter()
                .map(|(h, windows)| self.run_horizon_windows(h, windows)),
        )
        .await?;

        Ok(BacktestReport::new(&self.config, horizons))
    }

    /// Run a single horizon
    pub async fn run_horizon(&self, horizon_days: u32) -> Result<HorizonReport, BacktestError> {
        let windows = self.config.windows_for(horizon_days)?;
        self.run_horizon_windows(horizon_days, windows).await
    }

    async fn run_horizon_windows(
        &self,
        horizon_days: u32,
        windows: Vec<Window>,
    ) -> Result<HorizonReport, BacktestError> {
        let span = tracing::info_span!("horizon", days = horizon_days);
        async move {
            let total = windows.len();
            let (results, skipped) = self.evaluate_windows(windows).await?;

            tracing::info!(
                evaluated = results.len(),
                skipped = skipped.len(),
                total,
                "Windows evaluated, aggregating"
            );

            let config = Arc::clone(&self.config);
            let cancel = self.cancel.clone();
            tokio::task::spawn_blocking(move || {
                aggregate(horizon_days, results, skipped, &config, &cancel)
            })
            .await
            .map_err(|e| BacktestError::Aggregation(e.to_string()))?
        }
        .instrument(span)
        .await
    }

    /// Evaluate windows on a worker pool.
    ///
    /// Workers pull windows from a shared queue and push outcomes on a result
    /// channel; outcomes are re-ordered by window start afterwards. Horizons
    /// share one set of `workers` evaluation slots.
    async fn evaluate_windows(
        &self,
        windows: Vec<Window>,
    ) -> Result<(Vec<WindowResult>, Vec<SkippedWindow>), BacktestError> {
        let total = windows.len();
        let (job_tx, job_rx) = mpsc::channel::<Window>(total.max(1));
        for window in windows {
            job_tx
                .send(window)
                .await
                .map_err(|e| BacktestError::Aggregation(e.to_string()))?;
        }
        drop(job_tx);

        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<WindowOutcome>(total.max(1));
        let stop = self.cancel.child_token();

        let mut workers = JoinSet::new();
        for _ in 0..self.config.workers.min(total.max(1)) {
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            let stop = stop.clone();
            let provider = Arc::clone(&self.provider);
            let scorer = Arc::clone(&self.scorer);
            let config = Arc::clone(&self.config);
            let slots = Arc::clone(&self.slots);

            workers.spawn(async move {
                loop {
                    if stop.is_cancelled() {
                        break;
                    }
                    let next = job_rx.lock().await.recv().await;
                    let Some(window) = next else {
                        break;
                    };
                    let Ok(_slot) = slots.acquire().await else {
                        break;
                    };
                    if stop.is_cancelled() {
                        break;
                    }

                    let span = tracing::debug_span!("window", index = window.index, start = %window.start);
                    let started = Instant::now();
                    let outcome =
                        evaluate_window(&window, provider.as_ref(), scorer.as_ref(), &config)
                            .instrument(span)
                            .await;
                    record_latency(LatencyMetric::WindowEvaluation, started.elapsed());

                    if result_tx.send((window, outcome)).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut results = Vec::with_capacity(total);
        let mut skipped = Vec::new();

        while let Some((window, outcome)) = result_rx.recv().await {
            match outcome {
                Ok(result) => {
                    increment_counter(CounterMetric::WindowsEvaluated);
                    results.push(result);
                }
                Err(err) => {
                    let reason = match err {
                        EvaluationError::NoData => SkipReason::NoData,
                        EvaluationError::DataSource(source) => {
                            if self.config.error_policy == ErrorPolicy::Strict {
                                stop.cancel();
                                tracing::error!(
                                    window_start = %window.start,
                                    window_end = %window.end,
                                    error = %source,
                                    "Data source error, aborting run"
                                );
                                return Err(BacktestError::WindowData {
                                    window_start: window.start,
                                    window_end: window.end,
                                    source,
                                });
                            }
                            SkipReason::DataSourceError(source.to_string())
                        }
                    };
                    tracing::warn!(
                        window_start = %window.start,
                        window_end = %window.end,
                        reason = reason.code(),
                        "Skipping window"
                    );
                    increment_counter(CounterMetric::WindowsSkipped(reason.code()));
                    skipped.push(SkippedWindow { window, reason });
                }
            }
        }

        while let Some(joined) = workers.join_next().await {
            joined.map_err(|e| BacktestError::Aggregation(format!("worker failed: {e}")))?;
        }

        if self.cancel.is_cancelled() {
            tracing::warn!(
                completed = results.len() + skipped.len(),
                total,
                "Backtest cancelled"
            );
            return Err(BacktestError::Cancelled);
        }

        results.sort_by_key(|r| r.window.start);
        skipped.sort_by_key(|s| s.window.start);

        Ok((results, skipped))
    }
}
