//! Configuration types for gem-backtest

use crate::backtest::{
    default_workers, BacktestError, BacktestSettings, BootstrapSettings, ErrorPolicy,
    DEFAULT_N_BOOTSTRAP, DEFAULT_SEED,
};
use crate::telemetry::LogFormat;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Backtest parameters; CLI flags override these
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    /// Range start, `YYYY-MM-DD` or RFC 3339
    pub start: Option<String>,
    pub end: Option<String>,
    /// Walk interval, e.g. `30d`
    pub walk: String,
    pub horizons: Vec<u32>,
    pub k: usize,
    /// Annual risk-free rate
    pub risk_free_rate: f64,
    pub n_bootstrap: usize,
    /// Compute bootstrap confidence intervals
    pub bootstrap: bool,
    pub alpha: f64,
    pub seed: u64,
    pub return_threshold: f64,
    pub min_ic_sample: usize,
    pub embargo_days: u32,
    pub periods_per_year: Option<f64>,
    pub error_policy: ErrorPolicy,
    /// Defaults to available parallelism
    pub workers: Option<usize>,
    pub output_dir: PathBuf,
    /// Write `weights_suggestion.json`
    pub suggest_weights: bool,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            walk: "30d".to_string(),
            horizons: vec![7, 14, 30],
            k: 10,
            risk_free_rate: 0.0,
            n_bootstrap: DEFAULT_N_BOOTSTRAP,
            bootstrap: true,
            alpha: 0.05,
            seed: DEFAULT_SEED,
            return_threshold: 0.0,
            min_ic_sample: 5,
            embargo_days: 0,
            periods_per_year: None,
            error_policy: ErrorPolicy::Lenient,
            workers: None,
            output_dir: PathBuf::from("./output"),
            suggest_weights: true,
        }
    }
}

impl BacktestSection {
    /// Build unvalidated settings; dates and the walk are parsed here
    pub fn settings(&self) -> Result<BacktestSettings, BacktestError> {
        let start = self
            .start
            .as_deref()
            .ok_or_else(|| BacktestError::Configuration("start date is required".into()))
            .and_then(parse_date)?;
        let end = self
            .end
            .as_deref()
            .ok_or_else(|| BacktestError::Configuration("end date is required".into()))
            .and_then(parse_date)?;

        let mut settings = BacktestSettings::new(start, end);
        settings.walk = parse_interval(&self.walk)?;
        settings.horizons_days = self.horizons.clone();
        settings.k = self.k;
        settings.risk_free_rate = self.risk_free_rate;
        settings.bootstrap = self.bootstrap.then_some(BootstrapSettings {
            n_resamples: self.n_bootstrap,
            alpha: self.alpha,
        });
        settings.seed = self.seed;
        settings.return_threshold = self.return_threshold;
        settings.min_ic_sample = self.min_ic_sample;
        settings.embargo = Duration::days(i64::from(self.embargo_days));
        settings.periods_per_year = self.periods_per_year;
        settings.error_policy = self.error_policy;
        settings.workers = self.workers.unwrap_or_else(default_workers);
        Ok(settings)
    }
}

/// Historical snapshot source
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory of Parquet snapshot files
    pub data_dir: PathBuf,
    /// Entity whose return is the benchmark for variance decomposition
    pub benchmark_entity: Option<String>,
    /// Observations older than this at a cutoff are ignored, e.g. `3d`
    pub max_staleness: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            benchmark_entity: None,
            max_staleness: None,
        }
    }
}

impl DataConfig {
    /// Parsed staleness limit
    pub fn max_staleness(&self) -> Result<Option<Duration>, BacktestError> {
        self.max_staleness.as_deref().map(parse_interval).transpose()
    }
}

/// Scorer weights
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Configuration shipped with the crate
    pub fn example() -> anyhow::Result<Self> {
        Ok(toml::from_str(include_str!("../config.toml.example"))?)
    }
}

/// Parse an interval such as `30d`, `2w`, `12h` or a bare day count
pub fn parse_interval(s: &str) -> Result<Duration, BacktestError> {
    let s = s.trim();
    let invalid = || BacktestError::Configuration(format!("invalid interval '{s}'"));

    let (number, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], Some(c.to_ascii_lowercase())),
        Some(_) => (s, None),
        None => return Err(invalid()),
    };
    let n: i64 = number.trim().parse().map_err(|_| invalid())?;

    let duration = match unit {
        None | Some('d') => Duration::try_days(n),
        Some('w') => Duration::try_weeks(n),
        Some('h') => Duration::try_hours(n),
        Some(_) => return Err(invalid()),
    }
    .ok_or_else(|| BacktestError::Configuration(format!("interval '{s}' is out of range")))?;
    if duration <= Duration::zero() {
        return Err(BacktestError::Configuration(format!(
            "interval must be positive, got '{s}'"
        )));
    }
    Ok(duration)
}

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp
pub fn parse_date(s: &str) -> Result<DateTime<Utc>, BacktestError> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BacktestError::Configuration(format!("invalid date '{s}': {e}")))
}
