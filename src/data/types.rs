//! Snapshot data types

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

/// Feature values for one entity at a point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    /// Feature name to value
    pub features: BTreeMap<String, f64>,
}

impl FeatureVector {
    /// Get a feature value by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }
}

/// Cross-section of entities as known at `as_of`
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Information cutoff for this snapshot
    pub as_of: DateTime<Utc>,
    /// Entity id to features
    pub entities: BTreeMap<String, FeatureVector>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn empty(as_of: DateTime<Utc>) -> Self {
        Self {
            as_of,
            entities: BTreeMap::new(),
        }
    }

    /// Whether the snapshot contains no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }
}

/// One stored observation of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Observation time
    pub timestamp: DateTime<Utc>,
    /// Price used for forward returns
    pub price: f64,
    /// Feature values at this time
    pub features: BTreeMap<String, f64>,
}

/// Flat record as stored in Parquet
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub timestamp: DateTime<Utc>,
    pub entity_id: String,
    pub price: f64,
    pub features: BTreeMap<String, f64>,
}

/// Data source errors
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Parquet decoding/encoding error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    /// Arrow array error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    /// File does not match the snapshot schema
    #[error("Schema error: {0}")]
    Schema(String),
    /// Data could not be served for the requested time
    #[error("Data unavailable: {0}")]
    Unavailable(String),
}
