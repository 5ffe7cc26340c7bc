//! Report emission
//!
//! Aggregated JSON summary, flat per-window CSV and optional feature
//! weight suggestions

mod emitter;
mod weights;

pub use emitter::{
    emit, windows_csv, ReportEmitter, SUMMARY_FILE, WEIGHTS_FILE, WINDOWS_FILE,
};
pub use weights::{
    suggest_weights, FeatureSuggestion, HorizonSuggestion, WeightAction, WeightsSuggestion,
    DECREASE_SHARE, INCREASE_SHARE,
};
