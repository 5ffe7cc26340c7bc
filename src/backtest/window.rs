//! Walk-forward window generation

use super::types::{BacktestError, Window};
use chrono::{DateTime, Duration, Utc};

/// Generate walk-forward windows over `[start, end]`.
///
/// Each window scores at `current + walk` and measures returns over the
/// following `horizon`; `current` then advances by `walk`. Horizons longer
/// than the walk (overlapping evaluation periods) are allowed.
pub fn generate_windows(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    walk: Duration,
    horizon: Duration,
) -> Result<Vec<Window>, BacktestError> {
    generate_windows_with_embargo(start, end, walk, horizon, Duration::zero())
}

/// Generate windows with a gap of `embargo` between the scoring cutoff and
/// the start of the realized-return interval
pub fn generate_windows_with_embargo(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    walk: Duration,
    horizon: Duration,
    embargo: Duration,
) -> Result<Vec<Window>, BacktestError> {
    if start >= end {
        return Err(BacktestError::Configuration(format!(
            "start ({start}) must be before end ({end})"
        )));
    }
    if walk <= Duration::zero() {
        return Err(BacktestError::Configuration(
            "walk interval must be positive".into(),
        ));
    }
    if horizon <= Duration::zero() {
        return Err(BacktestError::Configuration("horizon must be positive".into()));
    }
    if embargo < Duration::zero() {
        return Err(BacktestError::Configuration("embargo cannot be negative".into()));
    }

    let overflow = || BacktestError::Configuration("window bounds out of range".into());

    let required = walk
        .checked_add(&embargo)
        .and_then(|d| d.checked_add(&horizon))
        .ok_or_else(overflow)?;
    if end - start < required {
        return Err(BacktestError::InsufficientRange {
            start,
            end,
            required_days: required.num_days(),
        });
    }

    let mut windows = Vec::new();
    let mut current = start;
    loop {
        let train_cutoff = current.checked_add_signed(walk).ok_or_else(overflow)?;
        let evaluation_start = train_cutoff
            .checked_add_signed(embargo)
            .ok_or_else(overflow)?;
        let window_end = evaluation_start
            .checked_add_signed(horizon)
            .ok_or_else(overflow)?;
        if window_end > end {
            break;
        }
        windows.push(Window {
            index: windows.len(),
            start: current,
            train_cutoff,
            evaluation_start,
            end: window_end,
        });
        current = train_cutoff;
    }

    Ok(windows)
}
