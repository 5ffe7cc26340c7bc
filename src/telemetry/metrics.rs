//! Prometheus metrics

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Window evaluation latency buckets in milliseconds
const LATENCY_BUCKETS_MS: &[f64] = &[1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1_000.0, 5_000.0];

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// One window: snapshot fetch, scoring and returns
    WindowEvaluation,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Window evaluated and kept for aggregation
    WindowsEvaluated,
    /// Window skipped, labelled with the reason code
    WindowsSkipped(&'static str),
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Bootstrap resamples per metric
    BootstrapResamples,
}

/// Install the Prometheus exporter on `0.0.0.0:port`
pub fn install_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(LATENCY_BUCKETS_MS)
        .map_err(|e| anyhow::anyhow!("Invalid histogram buckets: {}", e))?
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus metrics exporter started");
    Ok(())
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let value_ms = duration.as_secs_f64() * 1_000.0;
    match metric {
        LatencyMetric::WindowEvaluation => {
            histogram!("gem_backtest_window_eval_ms").record(value_ms);
        }
    }
}

/// Increment a counter by one
pub fn increment_counter(metric: CounterMetric) {
    match metric {
        CounterMetric::WindowsEvaluated => {
            counter!("gem_backtest_windows_evaluated_total").increment(1);
        }
        CounterMetric::WindowsSkipped(reason) => {
            counter!("gem_backtest_windows_skipped_total", "reason" => reason).increment(1);
        }
    }
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    match metric {
        GaugeMetric::BootstrapResamples => {
            gauge!("gem_backtest_bootstrap_resamples").set(value);
        }
    }
}
