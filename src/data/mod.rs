//! Historical snapshot data
//!
//! Point-in-time feature snapshots and realized forward returns, served from
//! Parquet files loaded into memory

mod parquet;
mod store;
mod types;

pub use self::parquet::{snapshot_schema, ParquetReader, ParquetWriter};
pub use store::SnapshotStore;
pub use types::{DataSourceError, FeatureVector, Observation, Snapshot, SnapshotRecord};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Source of historical snapshots and forward returns
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Features of every entity known at `as_of`, using no later information
    async fn snapshot_at(&self, as_of: DateTime<Utc>) -> Result<Snapshot, DataSourceError>;

    /// Realized returns over `[from, to]` for the given entities.
    ///
    /// Entities without a price at both bounds are omitted.
    async fn realized_returns(
        &self,
        entities: &[String],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BTreeMap<String, f64>, DataSourceError>;

    /// Benchmark return over `[from, to]`, if the source has a benchmark
    async fn benchmark_return(
        &self,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Option<f64>, DataSourceError> {
        Ok(None)
    }
}
