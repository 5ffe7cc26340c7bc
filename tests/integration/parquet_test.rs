//! Parquet snapshot round trip through the store

use chrono::{DateTime, Duration, TimeZone, Utc};
use gem_backtest::data::{
    DataSourceError, ParquetReader, ParquetWriter, SnapshotProvider, SnapshotRecord, SnapshotStore,
};
use std::collections::BTreeMap;
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn record(day: i64, entity: &str, price: f64, features: &[(&str, f64)]) -> SnapshotRecord {
    SnapshotRecord {
        timestamp: t0() + Duration::days(day),
        entity_id: entity.to_string(),
        price,
        features: features
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<BTreeMap<_, _>>(),
    }
}

#[test]
fn test_write_then_read_preserves_records() {
    let dir = TempDir::new().unwrap();
    let writer = ParquetWriter::new(dir.path().to_path_buf());
    let records = vec![
        record(0, "AAA", 1.5, &[("momentum", 0.2), ("liquidity", 3.0)]),
        record(0, "BBB", 0.8, &[("momentum", -0.1)]),
    ];

    let path = writer.write_snapshots("jan", &records).unwrap();
    assert_eq!(path, writer.file_path("jan"));

    let read = ParquetReader::new(path).read_snapshots().unwrap();
    assert_eq!(read, records);
    // a feature absent for an entity stays absent rather than becoming 0
    assert!(!read[1].features.contains_key("liquidity"));
}

#[tokio::test]
async fn test_load_dir_serves_point_in_time_snapshots() {
    let dir = TempDir::new().unwrap();
    let writer = ParquetWriter::new(dir.path().to_path_buf());
    writer
        .write_snapshots(
            "part-1",
            &[
                record(0, "AAA", 100.0, &[("momentum", 0.1)]),
                record(0, "BBB", 50.0, &[("momentum", 0.3)]),
            ],
        )
        .unwrap();
    writer
        .write_snapshots(
            "part-2",
            &[
                record(7, "AAA", 110.0, &[("momentum", 0.9)]),
                record(7, "BBB", 45.0, &[("momentum", -0.5)]),
            ],
        )
        .unwrap();
    std::fs::write(dir.path().join("README.txt"), "not parquet").unwrap();

    let store = SnapshotStore::load_dir(dir.path()).unwrap();
    assert_eq!(store.entity_count(), 2);
    assert_eq!(
        store.time_range(),
        Some((t0(), t0() + Duration::days(7)))
    );

    let snapshot = store.snapshot_at(t0() + Duration::days(3)).await.unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.entities["AAA"].get("momentum"), Some(0.1));

    let ids = vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()];
    let returns = store
        .realized_returns(&ids, t0(), t0() + Duration::days(7))
        .await
        .unwrap();
    assert_eq!(returns.len(), 2);
    assert!((returns["AAA"] - 0.10).abs() < 1e-12);
    assert!((returns["BBB"] + 0.10).abs() < 1e-12);
}

#[test]
fn test_load_empty_dir_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let result = SnapshotStore::load_dir(dir.path());
    assert!(matches!(result, Err(DataSourceError::Unavailable(_))));
}

#[test]
fn test_load_missing_dir_is_io_error() {
    let result = SnapshotStore::load_dir("/nonexistent/snapshots");
    assert!(matches!(result, Err(DataSourceError::Io(_))));
}
