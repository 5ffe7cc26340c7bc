//! Benchmarks for bootstrap resampling and rank correlation

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gem_backtest::stats::{bootstrap_ci, mean, spearman};
use tokio_util::sync::CancellationToken;

fn sample(n: usize) -> Vec<f64> {
    (0..n).map(|i| ((i as f64) * 0.37).sin() * 0.05).collect()
}

fn benchmark_bootstrap_ci(c: &mut Criterion) {
    let values = sample(24);
    let cancel = CancellationToken::new();

    c.bench_function("bootstrap_ci_10k", |b| {
        b.iter(|| {
            bootstrap_ci(
                "mean_forward_return",
                black_box(&values),
                10_000,
                0.05,
                42,
                mean,
                &cancel,
            )
        })
    });
}

fn benchmark_spearman(c: &mut Criterion) {
    let scores = sample(500);
    let returns: Vec<f64> = scores.iter().map(|s| s * 0.5 + (s * 40.0).cos() * 0.01).collect();

    c.bench_function("spearman_500", |b| {
        b.iter(|| spearman(black_box(&scores), black_box(&returns)))
    });
}

criterion_group!(benches, benchmark_bootstrap_ci, benchmark_spearman);
criterion_main!(benches);
