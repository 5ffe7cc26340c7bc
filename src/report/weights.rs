//! Feature weight suggestions from per-window feature/return correlation

use crate::backtest::BacktestReport;
use crate::stats::{mean, spearman};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Share of positively correlated windows at or above which a weight is raised
pub const INCREASE_SHARE: f64 = 0.6;
/// Share at or below which a weight is lowered
pub const DECREASE_SHARE: f64 = 0.4;
/// Relative weight adjustment
pub const ADJUSTMENT: f64 = 0.1;

/// Suggested direction for a feature weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightAction {
    Increase,
    Decrease,
    Hold,
}

/// Suggestion for one feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSuggestion {
    pub feature: String,
    pub current_weight: f64,
    pub suggested_weight: f64,
    pub action: WeightAction,
    /// Windows with a defined correlation
    pub windows: usize,
    pub positive_windows: usize,
    pub positive_share: Option<f64>,
    pub mean_correlation: Option<f64>,
}

/// Suggestions for one horizon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonSuggestion {
    pub horizon_days: u32,
    pub features: Vec<FeatureSuggestion>,
}

/// Contents of `weights_suggestion.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightsSuggestion {
    pub method: &'static str,
    pub increase_share: f64,
    pub decrease_share: f64,
    pub horizons: Vec<HorizonSuggestion>,
}

/// Suggest weight changes for every horizon in the report.
///
/// For each window, the Spearman correlation between a feature's value and
/// the realized return is computed over entities that have both. A feature
/// whose correlation is positive in most windows gets a higher weight.
pub fn suggest_weights(
    report: &BacktestReport,
    current: &BTreeMap<String, f64>,
) -> WeightsSuggestion {
    let horizons = report
        .horizons
        .iter()
        .map(|horizon| {
            let mut names: BTreeSet<&str> = current.keys().map(String::as_str).collect();
            for window in &horizon.windows {
                for entity in window.complete_entities() {
                    names.extend(entity.features.keys().map(String::as_str));
                }
            }

            let features = names
                .into_iter()
                .map(|name| {
                    let correlations: Vec<f64> = horizon
                        .windows
                        .iter()
                        .filter_map(|window| {
                            let (values, returns): (Vec<f64>, Vec<f64>) = window
                                .complete_entities()
                                .filter_map(|e| {
                                    let value = e.features.get(name)?;
                                    Some((*value, e.realized_return?))
                                })
                                .unzip();
                            spearman(&values, &returns)
                        })
                        .collect();
                    let weight = current.get(name).copied().unwrap_or(0.0);
                    suggest_feature(name, weight, &correlations)
                })
                .collect();

            HorizonSuggestion {
                horizon_days: horizon.horizon_days,
                features,
            }
        })
        .collect();

    WeightsSuggestion {
        method: "spearman_sign_consistency",
        increase_share: INCREASE_SHARE,
        decrease_share: DECREASE_SHARE,
        horizons,
    }
}

fn suggest_feature(name: &str, weight: f64, correlations: &[f64]) -> FeatureSuggestion {
    let windows = correlations.len();
    let positive_windows = correlations.iter().filter(|&&c| c > 0.0).count();
    let positive_share = (windows > 0).then(|| positive_windows as f64 / windows as f64);

    let action = match positive_share {
        Some(share) if share >= INCREASE_SHARE => WeightAction::Increase,
        Some(share) if share <= DECREASE_SHARE => WeightAction::Decrease,
        _ => WeightAction::Hold,
    };
    let suggested_weight = match action {
        WeightAction::Increase if weight == 0.0 => ADJUSTMENT,
        WeightAction::Increase => weight + weight.abs() * ADJUSTMENT,
        WeightAction::Decrease => weight - weight.abs() * ADJUSTMENT,
        WeightAction::Hold => weight,
    };

    FeatureSuggestion {
        feature: name.to_string(),
        current_weight: weight,
        suggested_weight,
        action,
        windows,
        positive_windows,
        positive_share,
        mean_correlation: mean(correlations),
    }
}
