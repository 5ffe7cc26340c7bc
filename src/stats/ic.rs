//! Information Coefficient distribution summary

use super::descriptive::{finite, mean, safe_ratio, std_dev};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Significance level for rejecting the no-skill hypothesis
pub const IC_SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Summary of per-window IC values with a one-sample t-test against zero
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IcSummary {
    /// Number of windows with a defined IC
    pub n: usize,
    /// Mean IC
    pub mean: Option<f64>,
    /// Sample standard deviation of IC
    pub std_dev: Option<f64>,
    /// Information ratio: mean / std
    pub information_ratio: Option<f64>,
    /// t-statistic of the mean against zero
    pub t_stat: Option<f64>,
    /// Two-sided p-value
    pub p_value: Option<f64>,
    /// Whether the no-skill hypothesis is rejected at the 5% level
    pub significant: bool,
}

impl IcSummary {
    /// Summarise a series of per-window ICs
    pub fn from_values(ics: &[f64]) -> Self {
        let n = ics.len();
        let mean = mean(ics);
        let std_dev = std_dev(ics);

        let information_ratio = match (mean, std_dev) {
            (Some(m), Some(s)) => safe_ratio(m, s),
            _ => None,
        };
        let t_stat = information_ratio.and_then(|ir| finite(ir * (n as f64).sqrt()));
        let p_value = t_stat.and_then(|t| two_sided_p_value(t, (n - 1) as f64));

        Self {
            n,
            mean,
            std_dev,
            information_ratio,
            t_stat,
            p_value,
            significant: p_value.is_some_and(|p| p < IC_SIGNIFICANCE_LEVEL),
        }
    }
}

fn two_sided_p_value(t: f64, degrees_of_freedom: f64) -> Option<f64> {
    let dist = StudentsT::new(0.0, 1.0, degrees_of_freedom).ok()?;
    finite(2.0 * (1.0 - dist.cdf(t.abs()))).map(|p| p.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_window_scenario() {
        let summary = IcSummary::from_values(&[0.3, -0.1, 0.5]);

        assert_eq!(summary.n, 3);
        assert!((summary.mean.unwrap() - 0.233_333).abs() < 1e-5);

        let std = summary.std_dev.unwrap();
        assert!((std - 0.305_505).abs() < 1e-5);

        let ir = summary.information_ratio.unwrap();
        assert!((ir - summary.mean.unwrap() / std).abs() < 1e-12);

        let t = summary.t_stat.unwrap();
        assert!((t - ir * 3f64.sqrt()).abs() < 1e-12);

        let p = summary.p_value.unwrap();
        assert!(p > 0.05 && p < 1.0);
        assert!(!summary.significant);
    }

    #[test]
    fn test_consistent_positive_ic_is_significant() {
        let ics: Vec<f64> = (0..30).map(|i| 0.10 + (i % 5) as f64 * 0.01).collect();
        let summary = IcSummary::from_values(&ics);
        assert!(summary.significant);
        assert!(summary.p_value.unwrap() < 0.001);
    }

    #[test]
    fn test_zero_variance_ic() {
        let summary = IcSummary::from_values(&[0.2, 0.2, 0.2]);
        assert_eq!(summary.std_dev, Some(0.0));
        assert!(summary.information_ratio.is_none());
        assert!(summary.t_stat.is_none());
        assert!(!summary.significant);
    }

    #[test]
    fn test_empty_ic_series() {
        let summary = IcSummary::from_values(&[]);
        assert_eq!(summary.n, 0);
        assert!(summary.mean.is_none());
        assert!(summary.p_value.is_none());
    }
}
