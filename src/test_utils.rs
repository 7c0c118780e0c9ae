//! Shared test fixtures
//!
//! Venue profiles, registries and configs used across module tests.

use crate::core::{ConnectionState, FeeSchedule, VenueId, VenueProfile, VenueRegistry};
use crate::infrastructure::config::Config;
use std::sync::Arc;

/// Liquid venue that passes every static filter for sizes in [0.001, 10_000]
pub fn venue_profile(id: &str, baseline_latency_us: f64) -> VenueProfile {
    VenueProfile {
        id: VenueId::from(id),
        name: id.to_lowercase(),
        endpoint: format!("{}.test:443", id.to_lowercase()),
        baseline_latency_us,
        fees: FeeSchedule {
            maker_fee_bps: 0.0,
            taker_fee_bps: 5.0,
        },
        min_order_size: 0.001,
        max_order_size: 10_000.0,
        typical_bid_depth: 5_000.0,
        typical_ask_depth: 5_000.0,
        historical_fill_rate: 0.95,
        active: true,
    }
}

/// Shared registry from profiles
pub fn registry_with(profiles: Vec<VenueProfile>) -> Arc<VenueRegistry> {
    Arc::new(VenueRegistry::from_profiles(profiles).expect("fixture venues are unique"))
}

/// Default config with the given venues
pub fn config_with(profiles: Vec<VenueProfile>) -> Config {
    let mut config = Config::default();
    config.venues = profiles;
    config
}

/// Milliseconds to nanoseconds
pub const fn ms(value: u64) -> u64 {
    value * 1_000_000
}

/// Microseconds to nanoseconds
pub const fn us(value: u64) -> u64 {
    value * 1_000
}

/// Force a venue into the connected state with the given RTT statistics
pub fn connect(registry: &VenueRegistry, id: &str, ema_rtt: f64, stddev_rtt: f64) {
    registry
        .with_health_mut(&VenueId::from(id), |_, health| {
            health.state = ConnectionState::Connected;
            health.current_rtt = ema_rtt;
            health.ema_rtt = ema_rtt;
            health.stddev_rtt = stddev_rtt;
        })
        .expect("fixture venue is registered");
}
