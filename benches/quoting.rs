//! Benchmarks for quoting and latency budget derivation
//!
//! Target: <100ns per quote, <150ns per budget

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hft_exec_core::core::MarketRegime;
use hft_exec_core::hot_path::{LatencyBudgetCalculator, QuoteModel};
use hft_exec_core::infrastructure::config::{Config, QuotingConfig};

fn bench_quotes(c: &mut Criterion) {
    let model = QuoteModel::new(&QuotingConfig::default()).expect("default quoting config");

    c.bench_function("calculate_quotes", |b| {
        b.iter(|| {
            model.calculate_quotes(
                black_box(100.0),
                black_box(250.0),
                black_box(300.0),
                black_box(0.002),
            )
        })
    });
}

fn bench_budget(c: &mut Criterion) {
    let calc = LatencyBudgetCalculator::from_config(&Config::default()).expect("default config");

    c.bench_function("calculate_latency_budget", |b| {
        b.iter(|| {
            calc.calculate_latency_budget(
                black_box(100.0),
                black_box(0.02),
                black_box(-120.0),
                black_box(10.0),
                black_box(MarketRegime::Elevated),
            )
        })
    });
}

criterion_group!(benches, bench_quotes, bench_budget);
criterion_main!(benches);
