//! Metrics collection for system monitoring
//!
//! Lock-free counters using atomic operations.
//! Updated from the decision path and heartbeat task, read as snapshots.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Decision core metrics collector
///
/// Thread-safe counters shared as `Arc<MetricsCollector>`.
pub struct MetricsCollector {
    /// Trade events applied to the intensity estimator
    trades_processed: AtomicU64,
    /// Trade events dropped because the inbox was full
    trades_dropped: AtomicU64,
    /// Routing calls
    routes_attempted: AtomicU64,
    /// Routing calls that selected a venue
    routes_routed: AtomicU64,
    /// Routing calls that returned a rejection
    routes_rejected: AtomicU64,
    heartbeats_sent: AtomicU64,
    heartbeat_acks: AtomicU64,
    /// Negative RTT samples discarded
    clock_anomalies: AtomicU64,
    /// Connected/Unknown -> Disconnected transitions
    venues_disconnected: AtomicU64,
    /// Order fill/reject/timeout notifications
    order_results: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

/// Metrics snapshot for export
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub trades_processed: u64,
    pub trades_dropped: u64,
    pub routes_attempted: u64,
    pub routes_routed: u64,
    pub routes_rejected: u64,
    pub heartbeats_sent: u64,
    pub heartbeat_acks: u64,
    pub clock_anomalies: u64,
    pub venues_disconnected: u64,
    pub order_results: u64,
    /// Fraction of routing calls that selected a venue
    pub route_rate: f64,
    pub uptime_seconds: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            trades_processed: AtomicU64::new(0),
            trades_dropped: AtomicU64::new(0),
            routes_attempted: AtomicU64::new(0),
            routes_routed: AtomicU64::new(0),
            routes_rejected: AtomicU64::new(0),
            heartbeats_sent: AtomicU64::new(0),
            heartbeat_acks: AtomicU64::new(0),
            clock_anomalies: AtomicU64::new(0),
            venues_disconnected: AtomicU64::new(0),
            order_results: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    #[inline]
    pub fn record_trades(&self, count: u64) {
        self.trades_processed.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_trade_dropped(&self) {
        self.trades_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a routing outcome
    #[inline]
    pub fn record_route(&self, routed: bool) {
        self.routes_attempted.fetch_add(1, Ordering::Relaxed);
        if routed {
            self.routes_routed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.routes_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_heartbeat_sent(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_heartbeat_ack(&self) {
        self.heartbeat_acks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_clock_anomaly(&self) {
        self.clock_anomalies.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_disconnect(&self) {
        self.venues_disconnected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_order_result(&self) {
        self.order_results.fetch_add(1, Ordering::Relaxed);
    }

    pub fn clock_anomalies(&self) -> u64 {
        self.clock_anomalies.load(Ordering::Relaxed)
    }

    /// Get current snapshot of metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let attempted = self.routes_attempted.load(Ordering::Relaxed);
        let routed = self.routes_routed.load(Ordering::Relaxed);
        let route_rate = if attempted > 0 {
            routed as f64 / attempted as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            trades_processed: self.trades_processed.load(Ordering::Relaxed),
            trades_dropped: self.trades_dropped.load(Ordering::Relaxed),
            routes_attempted: attempted,
            routes_routed: routed,
            routes_rejected: self.routes_rejected.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            heartbeat_acks: self.heartbeat_acks.load(Ordering::Relaxed),
            clock_anomalies: self.clock_anomalies.load(Ordering::Relaxed),
            venues_disconnected: self.venues_disconnected.load(Ordering::Relaxed),
            order_results: self.order_results.load(Ordering::Relaxed),
            route_rate,
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
