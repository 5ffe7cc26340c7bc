//! End-to-end integration tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use gem_backtest::backtest::{BacktestHarness, BacktestReport, BacktestSettings, BootstrapSettings};
use gem_backtest::data::{Observation, SnapshotStore};
use gem_backtest::report::{emit, suggest_weights, SUMMARY_FILE, WEIGHTS_FILE, WINDOWS_FILE};
use gem_backtest::scoring::LinearScorer;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Daily observations for `entities` tokens plus a benchmark, with a drift
/// loosely tracking the momentum feature
fn fixture_store(days: i64, entities: usize, gap: Option<(i64, i64)>) -> SnapshotStore {
    let mut store = SnapshotStore::new();
    for d in 0..=days {
        if gap.is_some_and(|(from, to)| d >= from && d <= to) {
            continue;
        }
        let t = d as f64;
        for i in 0..entities {
            let drift = (i as f64 - entities as f64 / 2.0) * 0.0005;
            let wiggle = 0.04 * (0.3 * t + i as f64).sin();
            let momentum = drift + 0.0003 * (0.7 * t * (i as f64 + 1.0)).cos();
            store.insert(
                format!("TOKEN{i:02}"),
                Observation {
                    timestamp: t0() + Duration::days(d),
                    price: 100.0 * (drift * t + wiggle).exp(),
                    features: BTreeMap::from([
                        ("momentum".to_string(), momentum),
                        ("liquidity".to_string(), ((i * 7 + d as usize) % 11) as f64),
                    ]),
                },
            );
        }
        store.insert(
            "BENCH",
            Observation {
                timestamp: t0() + Duration::days(d),
                price: 100.0 * (0.0004 * t + 0.02 * (0.2 * t).sin()).exp(),
                features: BTreeMap::new(),
            },
        );
    }
    store.with_benchmark("BENCH")
}

fn weights() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("momentum".to_string(), 1.0),
        ("liquidity".to_string(), 0.0001),
    ])
}

fn settings(end_day: i64, horizons: Vec<u32>, n_resamples: usize) -> BacktestSettings {
    let mut s = BacktestSettings::new(t0(), t0() + Duration::days(end_day));
    s.horizons_days = horizons;
    s.k = 5;
    s.workers = 4;
    s.bootstrap = Some(BootstrapSettings {
        n_resamples,
        alpha: 0.05,
    });
    s
}

async fn run(settings: BacktestSettings, store: SnapshotStore) -> BacktestReport {
    let config = settings.validate().unwrap();
    let harness = BacktestHarness::new(
        config,
        Arc::new(store),
        Arc::new(LinearScorer::new(weights())),
    );
    harness.run().await.unwrap()
}

#[tokio::test]
async fn test_three_horizons_produce_three_sections() {
    let report = run(settings(365, vec![7, 14, 30], 500), fixture_store(365, 12, None)).await;
    let dir = TempDir::new().unwrap();
    let suggestion = suggest_weights(&report, &weights());
    let paths = assert_ok!(emit(&report, Some(&suggestion), dir.path()));
    assert_eq!(paths.len(), 3);

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap())
            .unwrap();
    let horizons = summary["horizons"].as_array().unwrap();
    assert_eq!(horizons.len(), 3);
    for (section, days) in horizons.iter().zip([7, 14, 30]) {
        assert_eq!(section["horizon_days"], days);
        assert!(section["precision_at_k"]["bootstrap"].is_object());
        assert!(section["information_coefficient"]["bootstrap"].is_object());
        assert!(section["mean_forward_return"]["bootstrap"].is_object());
        assert!(section["variance_decomposition"].is_object());
    }

    let weights: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join(WEIGHTS_FILE)).unwrap())
            .unwrap();
    assert_eq!(weights["horizons"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_same_seed_gives_identical_summary() {
    let first = run(settings(240, vec![7, 14], 1000), fixture_store(240, 10, None)).await;
    let second = run(settings(240, vec![7, 14], 1000), fixture_store(240, 10, None)).await;

    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    assert_ok!(emit(&first, None, a.path()));
    assert_ok!(emit(&second, None, b.path()));

    for file in [SUMMARY_FILE, WINDOWS_FILE] {
        let left = std::fs::read(a.path().join(file)).unwrap();
        let right = std::fs::read(b.path().join(file)).unwrap();
        assert_eq!(left, right, "{file} differs between runs");
    }
}

#[tokio::test]
async fn test_different_seed_changes_intervals_only() {
    let mut other = settings(240, vec![7], 1000);
    other.seed = 7;
    let first = run(settings(240, vec![7], 1000), fixture_store(240, 10, None)).await;
    let second = run(other, fixture_store(240, 10, None)).await;

    let (a, b) = (&first.horizons[0], &second.horizons[0]);
    assert_eq!(a.mean_forward_return.mean, b.mean_forward_return.mean);
    assert_ne!(a.mean_forward_return.bootstrap, b.mean_forward_return.bootstrap);
}

#[tokio::test]
async fn test_data_gap_skips_window() {
    // 2024-02-25..2024-03-03 has no data; the 2024-03-01 cutoff sees nothing fresh
    let store = fixture_store(152, 10, Some((55, 62))).with_max_staleness(Duration::days(3));
    let report = run(settings(152, vec![7], 200), store).await;

    let horizon = &report.horizons[0];
    assert_eq!(horizon.windows_total, 4);
    assert_eq!(horizon.windows_skipped, 1);
    assert_eq!(report.windows_skipped, 1);
    assert_eq!(horizon.skipped[0].reason.code(), "no_data");
    assert_eq!(
        horizon.skipped[0].window.train_cutoff,
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    );

    let dir = TempDir::new().unwrap();
    assert_ok!(emit(&report, None, dir.path()));
    let csv = std::fs::read_to_string(dir.path().join(WINDOWS_FILE)).unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert!(csv
        .lines()
        .skip(1)
        .all(|row| row.split(',').nth(1) != Some("1")));
}

#[tokio::test]
async fn test_bootstrap_intervals_contain_point_estimates() {
    let report = run(settings(365, vec![7, 30], 2000), fixture_store(365, 12, None)).await;

    for horizon in &report.horizons {
        let estimates = [
            horizon.precision_at_k.bootstrap.as_ref(),
            horizon.information_coefficient.bootstrap.as_ref(),
            horizon.mean_forward_return.bootstrap.as_ref(),
        ];
        for est in estimates.into_iter().flatten() {
            assert_eq!(est.n_resamples, 2000);
            assert!(
                est.ci_lower <= est.point_estimate && est.point_estimate <= est.ci_upper,
                "{} interval [{}, {}] misses {}",
                est.metric_name,
                est.ci_lower,
                est.ci_upper,
                est.point_estimate
            );
        }
        for w in &horizon.windows {
            assert!((0.0..=1.0).contains(&w.precision_at_k));
            if let Some(ic) = w.ic {
                assert!((-1.0..=1.0).contains(&ic));
            }
        }
    }
}

#[tokio::test]
async fn test_no_bootstrap_fast_path() {
    let mut s = settings(180, vec![7], 10);
    s.bootstrap = None;
    let report = run(s, fixture_store(180, 8, None)).await;

    assert!(report.n_bootstrap.is_none());
    assert!(report.horizons[0].precision_at_k.bootstrap.is_none());
    assert!(report.horizons[0].precision_at_k.mean.is_some());
}

#[tokio::test]
async fn test_empty_store_skips_every_window() {
    let config = settings(120, vec![7], 100).validate().unwrap();
    let harness = BacktestHarness::new(
        config,
        Arc::new(SnapshotStore::new()),
        Arc::new(LinearScorer::new(weights())),
    );
    let report = assert_ok!(harness.run().await);
    assert_eq!(report.horizons[0].windows_evaluated, 0);
    assert_eq!(
        report.horizons[0].windows_skipped,
        report.horizons[0].windows_total
    );
}

#[tokio::test]
async fn test_insufficient_range_exit_code() {
    let mut s = settings(14, vec![7], 100);
    s.walk = Duration::days(30);
    let harness = BacktestHarness::new(
        s.validate().unwrap(),
        Arc::new(fixture_store(14, 5, None)),
        Arc::new(LinearScorer::new(weights())),
    );
    let err = assert_err!(harness.run().await);
    assert_eq!(err.exit_code(), 3);
}
