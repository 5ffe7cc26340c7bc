//! Per-window evaluation: precision@K and Information Coefficient

use super::types::{EvaluationError, ScoredEntity, Window, WindowResult};
use super::BacktestConfig;
use crate::data::SnapshotProvider;
use crate::scoring::Scorer;
use crate::stats::{mean, spearman};

/// Evaluate one window.
///
/// The scorer only sees the snapshot at `train_cutoff`; realized returns are
/// fetched for the scored entities over `[evaluation_start, end]`.
pub async fn evaluate_window(
    window: &Window,
    provider: &dyn SnapshotProvider,
    scorer: &dyn Scorer,
    config: &BacktestConfig,
) -> Result<WindowResult, EvaluationError> {
    let snapshot = provider.snapshot_at(window.train_cutoff).await?;
    if snapshot.is_empty() {
        return Err(EvaluationError::NoData);
    }

    let scores = scorer.score(&snapshot);
    let entity_ids: Vec<String> = scores.keys().cloned().collect();
    let returns = provider
        .realized_returns(&entity_ids, window.evaluation_start, window.end)
        .await?;

    let mut entities: Vec<ScoredEntity> = scores
        .into_iter()
        .map(|(entity_id, predicted_score)| {
            let features = snapshot
                .entities
                .get(&entity_id)
                .map(|f| f.features.clone())
                .unwrap_or_default();
            ScoredEntity {
                realized_return: returns.get(&entity_id).copied(),
                entity_id,
                predicted_score,
                features,
            }
        })
        .collect();
    rank_entities(&mut entities);

    let complete: Vec<&ScoredEntity> = entities
        .iter()
        .filter(|e| e.realized_return.is_some())
        .collect();
    if complete.is_empty() {
        return Err(EvaluationError::NoData);
    }

    let precision = precision_at_k(&complete, config.k, config.return_threshold);

    let scores: Vec<f64> = complete.iter().map(|e| e.predicted_score).collect();
    let realized: Vec<f64> = complete.iter().filter_map(|e| e.realized_return).collect();

    let ic = if complete.len() >= config.min_ic_sample {
        spearman(&scores, &realized)
    } else {
        tracing::debug!(
            window_start = %window.start,
            window_end = %window.end,
            entities = complete.len(),
            min = config.min_ic_sample,
            "Insufficient sample for IC"
        );
        None
    };

    let mean_forward_return = mean(&realized).ok_or(EvaluationError::NoData)?;
    let benchmark_return = provider
        .benchmark_return(window.evaluation_start, window.end)
        .await?;

    Ok(WindowResult {
        window: *window,
        precision_at_k: precision,
        ic,
        mean_forward_return,
        benchmark_return,
        entities,
    })
}

/// Sort by score descending, ties by entity id ascending
pub fn rank_entities(entities: &mut [ScoredEntity]) {
    entities.sort_by(|a, b| {
        b.predicted_score
            .total_cmp(&a.predicted_score)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
}

/// Fraction of the top `k` ranked entities whose return exceeds `threshold`.
///
/// `ranked` must already be ordered; the denominator is `min(k, len)`.
pub fn precision_at_k(ranked: &[&ScoredEntity], k: usize, threshold: f64) -> f64 {
    let top = k.min(ranked.len());
    if top == 0 {
        return 0.0;
    }
    let hits = ranked[..top]
        .iter()
        .filter(|e| e.realized_return.is_some_and(|r| r > threshold))
        .count();
    hits as f64 / top as f64
}
