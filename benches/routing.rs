//! Benchmarks for venue routing over the default three venues
//!
//! Target: <1us per routing decision

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hft_exec_core::core::{MarketRegime, VenueId, VenueRegistry};
use hft_exec_core::health::VenueHealthMonitor;
use hft_exec_core::hot_path::{LatencyBudgetCalculator, VenueRouter};
use hft_exec_core::infrastructure::{Config, MetricsCollector};
use std::collections::BTreeMap;
use std::sync::Arc;

fn bench_route_order(c: &mut Criterion) {
    let config = Config::default();
    let registry = Arc::new(
        VenueRegistry::from_profiles(config.venues.iter().cloned()).expect("default venues"),
    );
    let monitor = VenueHealthMonitor::new(
        &config.routing,
        registry.clone(),
        Arc::new(MetricsCollector::new()),
    );
    let mut prices = BTreeMap::new();
    for (i, venue) in config.venues.iter().enumerate() {
        let rtt_ns = (venue.baseline_latency_us * 1_000.0) as u64;
        monitor.receive_heartbeat(&venue.id, 1_000_000, 1_000_000 + rtt_ns);
        prices.insert(venue.id.clone(), 100.01 + 0.01 * i as f64);
    }

    let router = VenueRouter::new(
        config.routing,
        LatencyBudgetCalculator::from_config(&config).expect("default config"),
        registry,
    );

    c.bench_function("route_order_three_venues", |b| {
        b.iter(|| {
            router.route_order(
                black_box(100.0),
                black_box(0.02),
                black_box(0.0),
                black_box(10.0),
                black_box(MarketRegime::Normal),
                black_box(&prices),
            )
        })
    });

    let missing = VenueId::from("NONE");
    c.bench_function("registry_health_lookup", |b| {
        b.iter(|| router.registry().health(black_box(&missing)))
    });
}

criterion_group!(benches, bench_route_order);
criterion_main!(benches);
