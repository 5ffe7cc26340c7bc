//! Percentile bootstrap confidence intervals
//!
//! Resampling is driven by a seeded ChaCha8 generator so that a run with the
//! same seed and inputs reproduces the same intervals bit for bit.

use super::descriptive::{percentile, std_dev};
use super::StatsError;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Point estimate with a bootstrap confidence interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootstrapEstimate {
    /// Name of the bootstrapped statistic
    pub metric_name: String,
    /// Statistic evaluated on the original sample
    pub point_estimate: f64,
    /// Lower percentile bound (alpha / 2)
    pub ci_lower: f64,
    /// Upper percentile bound (1 - alpha / 2)
    pub ci_upper: f64,
    /// Standard deviation of the resampled statistic
    pub std_error: f64,
    /// Number of resamples drawn
    pub n_resamples: usize,
}

/// Bootstrap the statistic `statistic` over `values`.
///
/// Draws `n_resamples` samples of `values.len()` with replacement and reports
/// the `[alpha/2, 1 - alpha/2]` percentiles of the resampled statistic.
/// Cancellation is checked between resamples.
pub fn bootstrap_ci<F>(
    metric_name: &str,
    values: &[f64],
    n_resamples: usize,
    alpha: f64,
    seed: u64,
    statistic: F,
    cancel: &CancellationToken,
) -> Result<BootstrapEstimate, StatsError>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    if values.is_empty() {
        return Err(StatsError::EmptySample);
    }
    if n_resamples == 0 {
        return Err(StatsError::InvalidParameter("n_resamples must be positive".into()));
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(StatsError::InvalidParameter(format!(
            "alpha must be in (0, 1), got {alpha}"
        )));
    }

    let point_estimate = statistic(values).ok_or(StatsError::Degenerate)?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut resample = vec![0.0; values.len()];
    let mut distribution = Vec::with_capacity(n_resamples);

    for _ in 0..n_resamples {
        if cancel.is_cancelled() {
            return Err(StatsError::Cancelled);
        }
        for slot in resample.iter_mut() {
            *slot = values[rng.gen_range(0..values.len())];
        }
        if let Some(stat) = statistic(&resample) {
            distribution.push(stat);
        }
    }

    if distribution.is_empty() {
        return Err(StatsError::Degenerate);
    }
    distribution.sort_by(f64::total_cmp);

    let ci_lower = percentile(&distribution, alpha / 2.0).ok_or(StatsError::Degenerate)?;
    let ci_upper = percentile(&distribution, 1.0 - alpha / 2.0).ok_or(StatsError::Degenerate)?;

    Ok(BootstrapEstimate {
        metric_name: metric_name.to_string(),
        point_estimate,
        ci_lower,
        ci_upper,
        std_error: std_dev(&distribution).unwrap_or(0.0),
        n_resamples,
    })
}

/// Mix a base seed with stream identifiers (SplitMix64 finaliser)
pub fn derive_seed(base: u64, stream: &[u64]) -> u64 {
    stream.iter().fold(splitmix64(base), |acc, part| {
        splitmix64(acc ^ part.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    })
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::mean;

    fn sample() -> Vec<f64> {
        (0..40).map(|i| ((i * 37) % 23) as f64 / 10.0 - 1.0).collect()
    }

    #[test]
    fn test_ci_contains_point_estimate() {
        let values = sample();
        let est = bootstrap_ci(
            "mean",
            &values,
            2000,
            0.05,
            7,
            mean,
            &CancellationToken::new(),
        )
        .unwrap();

        assert!(est.ci_lower <= est.point_estimate);
        assert!(est.point_estimate <= est.ci_upper);
        assert!(est.std_error > 0.0);
        assert_eq!(est.n_resamples, 2000);
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let values = sample();
        let token = CancellationToken::new();
        let a = bootstrap_ci("mean", &values, 500, 0.05, 11, mean, &token).unwrap();
        let b = bootstrap_ci("mean", &values, 500, 0.05, 11, mean, &token).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.ci_lower.to_bits(), b.ci_lower.to_bits());
    }

    #[test]
    fn test_different_seed_changes_interval() {
        let values = sample();
        let token = CancellationToken::new();
        let a = bootstrap_ci("mean", &values, 500, 0.05, 1, mean, &token).unwrap();
        let b = bootstrap_ci("mean", &values, 500, 0.05, 2, mean, &token).unwrap();
        assert_eq!(a.point_estimate, b.point_estimate);
        assert_ne!((a.ci_lower, a.ci_upper), (b.ci_lower, b.ci_upper));
    }

    #[test]
    fn test_single_value_collapses_interval() {
        let est = bootstrap_ci(
            "mean",
            &[0.4],
            100,
            0.05,
            3,
            mean,
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(est.ci_lower, 0.4);
        assert_eq!(est.ci_upper, 0.4);
        assert_eq!(est.std_error, 0.0);
    }

    #[test]
    fn test_empty_sample_rejected() {
        let result = bootstrap_ci("mean", &[], 100, 0.05, 3, mean, &CancellationToken::new());
        assert!(matches!(result, Err(StatsError::EmptySample)));
    }

    #[test]
    fn test_invalid_alpha_rejected() {
        let result = bootstrap_ci("mean", &[1.0], 100, 1.5, 3, mean, &CancellationToken::new());
        assert!(matches!(result, Err(StatsError::InvalidParameter(_))));
    }

    #[test]
    fn test_cancelled_before_resampling() {
        let token = CancellationToken::new();
        token.cancel();
        let result = bootstrap_ci("mean", &sample(), 100, 0.05, 3, mean, &token);
        assert!(matches!(result, Err(StatsError::Cancelled)));
    }

    #[test]
    fn test_derive_seed_is_stable_and_distinct() {
        assert_eq!(derive_seed(42, &[7, 0]), derive_seed(42, &[7, 0]));
        assert_ne!(derive_seed(42, &[7, 0]), derive_seed(42, &[7, 1]));
        assert_ne!(derive_seed(42, &[7, 0]), derive_seed(43, &[7, 0]));
    }
}
