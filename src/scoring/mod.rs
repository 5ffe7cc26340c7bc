//! Entity scoring
//!
//! A scorer maps a point-in-time snapshot to a score per entity. Scoring is a
//! pure function of the snapshot and the scorer's weights.

use crate::data::{FeatureVector, Snapshot};
use std::collections::BTreeMap;

/// Trait for scoring implementations
pub trait Scorer: Send + Sync {
    /// Score every entity in the snapshot; non-finite scores are dropped
    fn score(&self, snapshot: &Snapshot) -> BTreeMap<String, f64>;

    /// Feature weights, if the scorer is weight based
    fn weights(&self) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }
}

/// Weighted sum of features (GemScore style)
#[derive(Debug, Clone, Default)]
pub struct LinearScorer {
    weights: BTreeMap<String, f64>,
}

impl LinearScorer {
    /// Create a scorer from feature weights
    pub fn new(weights: BTreeMap<String, f64>) -> Self {
        Self { weights }
    }

    /// Score one feature vector; missing features contribute zero
    pub fn score_entity(&self, features: &FeatureVector) -> f64 {
        self.weights
            .iter()
            .map(|(name, weight)| weight * features.get(name).unwrap_or(0.0))
            .sum()
    }
}

impl Scorer for LinearScorer {
    fn score(&self, snapshot: &Snapshot) -> BTreeMap<String, f64> {
        snapshot
            .entities
            .iter()
            .map(|(id, features)| (id.clone(), self.score_entity(features)))
            .filter(|(_, score)| score.is_finite())
            .collect()
    }

    fn weights(&self) -> BTreeMap<String, f64> {
        self.weights.clone()
    }
}
