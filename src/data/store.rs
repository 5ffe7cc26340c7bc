//! In-memory snapshot store
//!
//! Holds per-entity observation series sorted by time and serves point-in-time
//! snapshots. A snapshot at `t` only ever sees observations stamped at or
//! before `t`.

use super::parquet::ParquetReader;
use super::types::{DataSourceError, FeatureVector, Observation, Snapshot, SnapshotRecord};
use super::SnapshotProvider;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::path::Path;

/// Point-in-time store of entity observations
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    series: BTreeMap<String, Vec<Observation>>,
    benchmark: Option<String>,
    max_staleness: Option<Duration>,
}

impl SnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Designate an entity as the benchmark series
    pub fn with_benchmark(mut self, entity_id: impl Into<String>) -> Self {
        self.benchmark = Some(entity_id.into());
        self
    }

    /// Ignore observations older than `max_staleness` relative to the query time
    pub fn with_max_staleness(mut self, max_staleness: Duration) -> Self {
        self.max_staleness = Some(max_staleness);
        self
    }

    /// Build a store from flat records
    pub fn from_records(records: impl IntoIterator<Item = SnapshotRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.insert(
                record.entity_id,
                Observation {
                    timestamp: record.timestamp,
                    price: record.price,
                    features: record.features,
                },
            );
        }
        store
    }

    /// Load every `*.parquet` file in a directory
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, DataSourceError> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "parquet") {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(DataSourceError::Unavailable(format!(
                "no parquet files in {}",
                dir.display()
            )));
        }

        let mut records = Vec::new();
        for path in &paths {
            records.extend(ParquetReader::new(path.clone()).read_snapshots()?);
        }

        tracing::info!(
            dir = %dir.display(),
            files = paths.len(),
            records = records.len(),
            "Loaded snapshot data"
        );

        Ok(Self::from_records(records))
    }

    /// Insert an observation, keeping the entity series sorted by time
    pub fn insert(&mut self, entity_id: impl Into<String>, observation: Observation) {
        let series = self.series.entry(entity_id.into()).or_default();
        let pos = series.partition_point(|o| o.timestamp <= observation.timestamp);
        series.insert(pos, observation);
    }

    /// Number of entities with at least one observation
    pub fn entity_count(&self) -> usize {
        self.series.len()
    }

    /// Earliest and latest observation times
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.series.values().filter_map(|s| s.first()).map(|o| o.timestamp).min()?;
        let last = self.series.values().filter_map(|s| s.last()).map(|o| o.timestamp).max()?;
        Some((first, last))
    }

    /// Latest observation of an entity at or before `at`, within the staleness limit
    pub fn latest_at(&self, entity_id: &str, at: DateTime<Utc>) -> Option<&Observation> {
        let series = self.series.get(entity_id)?;
        let idx = series.partition_point(|o| o.timestamp <= at);
        let obs = series.get(idx.checked_sub(1)?)?;
        match self.max_staleness {
            Some(limit) if at - obs.timestamp > limit => None,
            _ => Some(obs),
        }
    }

    fn forward_return(&self, entity_id: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Option<f64> {
        let start = self.latest_at(entity_id, from)?;
        let end = self.latest_at(entity_id, to)?;
        // no fresh price inside the interval
        if end.timestamp <= from || start.price <= 0.0 {
            return None;
        }
        let ret = end.price / start.price - 1.0;
        ret.is_finite().then_some(ret)
    }
}

#[async_trait]
impl SnapshotProvider for SnapshotStore {
    async fn snapshot_at(&self, as_of: DateTime<Utc>) -> Result<Snapshot, DataSourceError> {
        let mut snapshot = Snapshot::empty(as_of);
        for entity_id in self.series.keys() {
            if self.benchmark.as_deref() == Some(entity_id.as_str()) {
                continue;
            }
            if let Some(obs) = self.latest_at(entity_id, as_of) {
                snapshot.entities.insert(
                    entity_id.clone(),
                    FeatureVector {
                        features: obs.features.clone(),
                    },
                );
            }
        }
        Ok(snapshot)
    }

    async fn realized_returns(
        &self,
        entities: &[String],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BTreeMap<String, f64>, DataSourceError> {
        Ok(entities
            .iter()
            .filter_map(|id| self.forward_return(id, from, to).map(|r| (id.clone(), r)))
            .collect())
    }

    async fn benchmark_return(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<f64>, DataSourceError> {
        Ok(self
            .benchmark
            .as_deref()
            .and_then(|id| self.forward_return(id, from, to)))
    }
}
