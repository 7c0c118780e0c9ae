//! Heartbeat task and transport seam
//!
//! Heartbeats are fire-and-forget: the task hands each probe to a
//! [`HeartbeatTransport`] together with a correlation token, and the network
//! side answers later with a [`HeartbeatAck`] over an mpsc channel. The task
//! is the single writer of heartbeat state.

use super::monitor::VenueHealthMonitor;
use crate::core::{now_nanos, VenueId, VenueProfile, NANOS_PER_MICRO};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::Level;

/// Correlation id linking a heartbeat to its acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeartbeatToken(u64);

impl HeartbeatToken {
    #[inline(always)]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HeartbeatToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hb-{}", self.0)
    }
}

/// Acknowledgement delivered by the network collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatAck {
    pub token: HeartbeatToken,
    pub venue: VenueId,
    /// Send timestamp echoed back (ns)
    pub sent_time: u64,
    /// Local receive timestamp (ns)
    pub received_time: u64,
}

/// Outbound heartbeat hand-off
///
/// Implementations must not block: queue the probe and return.
pub trait HeartbeatTransport: Send + Sync {
    fn transmit(&self, venue: &VenueProfile, token: HeartbeatToken, sent_at: u64);
}

/// Periodic heartbeat driver
pub struct HeartbeatTask {
    monitor: Arc<VenueHealthMonitor>,
    transport: Arc<dyn HeartbeatTransport>,
    acks: mpsc::Receiver<HeartbeatAck>,
    period: Duration,
    shutdown: watch::Receiver<bool>,
}

impl HeartbeatTask {
    pub fn new(
        monitor: Arc<VenueHealthMonitor>,
        transport: Arc<dyn HeartbeatTransport>,
        acks: mpsc::Receiver<HeartbeatAck>,
        period: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            monitor,
            transport,
            acks,
            period,
            shutdown,
        }
    }

    /// Run until shutdown is signalled or its sender is dropped
    pub async fn run(mut self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        crate::log_health!(
            Level::INFO,
            period_ms = self.period.as_millis() as u64,
            venues = self.monitor.registry().len(),
            "heartbeat task started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(now_nanos());
                }
                Some(ack) = self.acks.recv() => {
                    self.monitor.resolve_ack(&ack);
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        crate::log_health!(Level::INFO, "heartbeat task stopped");
    }

    /// Probe every active venue, then count timeouts
    pub fn tick(&self, now: u64) {
        for venue in self.monitor.registry().snapshot() {
            if !venue.profile.active {
                continue;
            }
            if let Some(token) = self.monitor.send_heartbeat(&venue.profile.id, now) {
                self.transport.transmit(&venue.profile, token, now);
            }
        }
        self.monitor.check_timeouts(now);
    }
}

/// In-process transport answering with simulated round trips
///
/// Each ack reports `baseline_latency_us` plus a bounded deterministic jitter.
/// Venues marked silent never answer.
pub struct SimulatedTransport {
    acks: mpsc::Sender<HeartbeatAck>,
    jitter_fraction: f64,
    silent: Mutex<HashSet<VenueId>>,
}

impl SimulatedTransport {
    pub fn new(acks: mpsc::Sender<HeartbeatAck>, jitter_fraction: f64) -> Self {
        Self {
            acks,
            jitter_fraction: jitter_fraction.clamp(0.0, 1.0),
            silent: Mutex::new(HashSet::new()),
        }
    }

    /// Stop or resume answering for a venue
    pub fn set_silent(&self, venue: &VenueId, silent: bool) {
        let mut set = self.silent.lock();
        if silent {
            set.insert(venue.clone());
        } else {
            set.remove(venue);
        }
    }

    fn simulated_rtt_ns(&self, venue: &VenueProfile, token: HeartbeatToken) -> u64 {
        // Spread over [-1, 1] in sevenths, keyed on the token
        let phase = ((token.get() % 7) as f64 - 3.0) / 3.0;
        let rtt_us = venue.baseline_latency_us * (1.0 + self.jitter_fraction * phase);
        (rtt_us.max(0.0) * NANOS_PER_MICRO) as u64
    }
}

impl HeartbeatTransport for SimulatedTransport {
    fn transmit(&self, venue: &VenueProfile, token: HeartbeatToken, sent_at: u64) {
        if self.silent.lock().contains(&venue.id) {
            return;
        }
        let ack = HeartbeatAck {
            token,
            venue: venue.id.clone(),
            sent_time: sent_at,
            received_time: sent_at + self.simulated_rtt_ns(venue, token),
        };
        if let Err(e) = self.acks.try_send(ack) {
            crate::log_health!(Level::DEBUG, venue = %venue.id, error = %e, "simulated ack dropped");
        }
    }
}
