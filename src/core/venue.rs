//! Venue types
//!
//! VenueProfile is static and set once at startup (rarely updated through the
//! registry). VenueHealth is mutated continuously by the health monitor and
//! read as a Copy snapshot by the router.

use super::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Venue identifier
///
/// Ordering is the router's deterministic tie-break order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VenueId(String);

impl VenueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VenueId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Fee schedule in basis points (negative maker fee = rebate)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeeSchedule {
    #[serde(default)]
    pub maker_fee_bps: f64,
    #[serde(default)]
    pub taker_fee_bps: f64,
}

/// Static venue description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueProfile {
    pub id: VenueId,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// host:port of the venue gateway
    #[serde(default)]
    pub endpoint: String,
    /// Expected RTT under normal conditions (microseconds)
    pub baseline_latency_us: f64,
    #[serde(default)]
    pub fees: FeeSchedule,
    pub min_order_size: f64,
    pub max_order_size: f64,
    pub typical_bid_depth: f64,
    pub typical_ask_depth: f64,
    /// Historical fill rate (0.0 - 1.0), used until live orders exist
    pub historical_fill_rate: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl VenueProfile {
    /// Resting depth an order on `side` would consume
    ///
    /// Buying lifts the ask side, selling hits the bid side.
    #[inline]
    pub fn available_depth(&self, side: Side) -> f64 {
        match side {
            Side::Buy => self.typical_ask_depth,
            Side::Sell => self.typical_bid_depth,
        }
    }

    /// Whether the venue accepts an order of this absolute size
    #[inline]
    pub fn accepts_size(&self, abs_size: f64) -> bool {
        abs_size >= self.min_order_size && abs_size <= self.max_order_size
    }
}

/// Connectivity state machine
///
/// Unknown -> Connected on the first heartbeat ack. Three consecutive
/// missed heartbeats -> Disconnected. Any ack -> Connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Unknown,
    Connected,
    Disconnected,
}

/// Heartbeat and order counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VenueCounters {
    pub heartbeats_sent: u64,
    pub heartbeats_received: u64,
    pub orders_sent: u64,
    pub orders_filled: u64,
    pub orders_rejected: u64,
    pub orders_timeout: u64,
}

/// Live network health of a venue
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VenueHealth {
    /// Last heartbeat send time (ns)
    pub last_heartbeat_sent: Option<u64>,
    /// Last heartbeat ack time (ns)
    pub last_heartbeat_received: Option<u64>,
    /// Most recent RTT (microseconds)
    pub current_rtt: f64,
    /// Smoothed RTT (microseconds)
    pub ema_rtt: f64,
    /// Smoothed RTT deviation (microseconds)
    pub stddev_rtt: f64,
    pub state: ConnectionState,
    pub consecutive_timeouts: u32,
    /// Send time of the oldest unanswered heartbeat (ns)
    pub awaiting_since: Option<u64>,
    pub counters: VenueCounters,
}

impl VenueHealth {
    /// Initial health seeded from the venue's baseline latency
    pub fn from_baseline(baseline_latency_us: f64) -> Self {
        Self {
            last_heartbeat_sent: None,
            last_heartbeat_received: None,
            current_rtt: baseline_latency_us,
            ema_rtt: baseline_latency_us,
            stddev_rtt: baseline_latency_us * 0.1,
            state: ConnectionState::Unknown,
            consecutive_timeouts: 0,
            awaiting_since: None,
            counters: VenueCounters::default(),
        }
    }

    #[inline(always)]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Live fill rate, or the historical rate until an order has been sent
    #[inline]
    pub fn live_fill_rate(&self, historical: f64) -> f64 {
        if self.counters.orders_sent > 0 {
            self.counters.orders_filled as f64 / self.counters.orders_sent as f64
        } else {
            historical
        }
    }

    /// Upper RTT bound before the current sample counts as a spike
    #[inline]
    pub fn spike_ceiling(&self, spike_threshold: f64) -> f64 {
        self.ema_rtt + spike_threshold * self.stddev_rtt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::venue_profile;

    #[test]
    fn test_venue_id_ordering() {
        let a = VenueId::from("BINANCE");
        let b = VenueId::from("COINBASE");
        assert!(a < b);
        assert_eq!(a.to_string(), "BINANCE");
    }

    #[test]
    fn test_available_depth_by_side() {
        let mut profile = venue_profile("A", 500.0);
        profile.typical_bid_depth = 10.0;
        profile.typical_ask_depth = 20.0;
        assert_eq!(profile.available_depth(Side::Buy), 20.0);
        assert_eq!(profile.available_depth(Side::Sell), 10.0);
    }

    #[test]
    fn test_initial_health() {
        let health = VenueHealth::from_baseline(500.0);
        assert_eq!(health.state, ConnectionState::Unknown);
        assert_eq!(health.ema_rtt, 500.0);
        assert_eq!(health.stddev_rtt, 50.0);
        assert!(!health.is_connected());
    }

    #[test]
    fn test_live_fill_rate_falls_back_to_historical() {
        let mut health = VenueHealth::from_baseline(500.0);
        assert_eq!(health.live_fill_rate(0.9), 0.9);

        health.counters.orders_sent = 4;
        health.counters.orders_filled = 3;
        assert_eq!(health.live_fill_rate(0.9), 0.75);
    }
}
