//! Per-venue connectivity and RTT tracking
//!
//! State machine per venue:
//!
//! ```text
//! Unknown --ack--> Connected --3 missed--> Disconnected
//!    |                 ^                        |
//!    +---3 missed------+--------- ack ----------+
//! ```
//!
//! Timeouts are counted from the oldest unanswered heartbeat: a gap longer
//! than one timeout counts one, and every further whole interval counts
//! another. Polling frequency never changes the count.

use super::heartbeat::{HeartbeatAck, HeartbeatToken};
use crate::core::{ConnectionState, VenueId, VenueRegistry, NANOS_PER_MICRO};
use crate::infrastructure::config::RoutingConfig;
use crate::infrastructure::metrics::MetricsCollector;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::Level;

#[derive(Debug, Clone)]
struct PendingHeartbeat {
    venue: VenueId,
    sent_at: u64,
}

/// Heartbeat bookkeeping over the shared venue registry
pub struct VenueHealthMonitor {
    registry: Arc<VenueRegistry>,
    metrics: Arc<MetricsCollector>,
    ema_alpha: f64,
    timeout_ns: u64,
    max_consecutive_timeouts: u32,
    next_token: AtomicU64,
    /// Lock order: `pending` before any health record
    pending: Mutex<HashMap<HeartbeatToken, PendingHeartbeat>>,
    clock_anomalies: AtomicU64,
}

impl VenueHealthMonitor {
    pub fn new(
        config: &RoutingConfig,
        registry: Arc<VenueRegistry>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            registry,
            metrics,
            ema_alpha: config.ema_alpha,
            timeout_ns: config.heartbeat_timeout_ns(),
            max_consecutive_timeouts: config.max_consecutive_timeouts.max(1),
            next_token: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            clock_anomalies: AtomicU64::new(0),
        }
    }

    /// Record an outgoing heartbeat
    ///
    /// Returns the correlation token the acknowledgement must carry, or None
    /// for an unknown venue.
    pub fn send_heartbeat(&self, venue: &VenueId, now: u64) -> Option<HeartbeatToken> {
        let mut pending = self.pending.lock();
        self.registry.with_health_mut(venue, |_, health| {
            health.last_heartbeat_sent = Some(now);
            health.counters.heartbeats_sent += 1;
            health.awaiting_since.get_or_insert(now);
        })?;

        let token = HeartbeatToken::new(self.next_token.fetch_add(1, Ordering::Relaxed));
        pending.insert(
            token,
            PendingHeartbeat {
                venue: venue.clone(),
                sent_at: now,
            },
        );
        self.metrics.record_heartbeat_sent();
        Some(token)
    }

    /// Match an acknowledgement to its outgoing heartbeat
    ///
    /// Returns false for unknown or expired tokens and discarded samples.
    pub fn resolve_ack(&self, ack: &HeartbeatAck) -> bool {
        let known = self.pending.lock().remove(&ack.token);
        match known {
            Some(sent) if sent.venue == ack.venue => {
                self.receive_heartbeat(&ack.venue, sent.sent_at, ack.received_time)
            }
            Some(sent) => {
                crate::log_health!(
                    Level::WARN,
                    token = ack.token.get(),
                    expected = %sent.venue,
                    got = %ack.venue,
                    "heartbeat ack venue mismatch"
                );
                false
            }
            None => {
                crate::log_health!(
                    Level::DEBUG,
                    token = ack.token.get(),
                    venue = %ack.venue,
                    "ignoring ack for unknown or expired heartbeat"
                );
                false
            }
        }
    }

    /// Apply a heartbeat response
    ///
    /// Negative round trips are clock anomalies: the sample is discarded and
    /// no venue state changes. Returns whether the sample was applied.
    pub fn receive_heartbeat(&self, venue: &VenueId, sent_time: u64, received_time: u64) -> bool {
        if received_time < sent_time {
            self.clock_anomalies.fetch_add(1, Ordering::Relaxed);
            self.metrics.record_clock_anomaly();
            crate::log_health!(
                Level::WARN,
                venue = %venue,
                sent_time,
                received_time,
                "negative heartbeat RTT discarded"
            );
            return false;
        }
        let rtt_us = (received_time - sent_time) as f64 / NANOS_PER_MICRO;

        let mut pending = self.pending.lock();
        // Older unanswered heartbeats are superseded by this response
        pending.retain(|_, p| !(p.venue == *venue && p.sent_at <= sent_time));
        let next_awaiting = pending
            .values()
            .filter(|p| p.venue == *venue)
            .map(|p| p.sent_at)
            .min();

        let alpha = self.ema_alpha;
        let previous = self.registry.with_health_mut(venue, |_, health| {
            let previous = health.state;
            health.last_heartbeat_received = Some(received_time);
            health.counters.heartbeats_received += 1;
            health.consecutive_timeouts = 0;
            health.awaiting_since = next_awaiting;
            health.state = ConnectionState::Connected;

            health.current_rtt = rtt_us;
            health.ema_rtt = alpha * rtt_us + (1.0 - alpha) * health.ema_rtt;
            let delta = rtt_us - health.ema_rtt;
            health.stddev_rtt = (alpha * delta * delta
                + (1.0 - alpha) * health.stddev_rtt * health.stddev_rtt)
                .sqrt();
            previous
        });
        drop(pending);

        match previous {
            Some(state) => {
                self.metrics.record_heartbeat_ack();
                if state != ConnectionState::Connected {
                    crate::log_health!(
                        Level::INFO,
                        venue = %venue,
                        from = ?state,
                        rtt_us,
                        "venue connected"
                    );
                }
                true
            }
            None => false,
        }
    }

    /// Count missed heartbeats and demote stale venues
    ///
    /// Returns the number of venues that became disconnected on this call.
    pub fn check_timeouts(&self, now: u64) -> usize {
        let timeout_ns = self.timeout_ns;
        let max_timeouts = self.max_consecutive_timeouts;
        let mut demoted = 0;

        self.registry.for_each_health_mut(|id, _, health| {
            if health.state == ConnectionState::Disconnected {
                return;
            }
            let Some(since) = health.awaiting_since else {
                return;
            };
            let missed =
                missed_intervals(now.saturating_sub(since), timeout_ns).min(max_timeouts);
            if missed <= health.consecutive_timeouts {
                return;
            }

            health.consecutive_timeouts = missed;
            crate::log_health!(
                Level::DEBUG,
                venue = %id,
                consecutive = health.consecutive_timeouts,
                "heartbeat timeout"
            );

            if health.consecutive_timeouts >= max_timeouts {
                health.state = ConnectionState::Disconnected;
                demoted += 1;
                crate::log_health!(
                    Level::WARN,
                    venue = %id,
                    consecutive = health.consecutive_timeouts,
                    "venue disconnected after missed heartbeats"
                );
            }
        });

        for _ in 0..demoted {
            self.metrics.record_disconnect();
        }
        self.expire_pending(now);
        demoted
    }

    /// Drop pending heartbeats too old to ever be matched usefully
    fn expire_pending(&self, now: u64) {
        let horizon = self
            .timeout_ns
            .saturating_mul(u64::from(self.max_consecutive_timeouts) + 1);
        self.pending
            .lock()
            .retain(|_, p| now.saturating_sub(p.sent_at) <= horizon);
    }

    /// Record an order outcome for the live fill-rate filter
    ///
    /// Every call counts one sent order plus exactly one of filled, timed out
    /// or rejected. Returns false for an unknown venue.
    pub fn record_order_result(&self, venue: &VenueId, filled: bool, timed_out: bool) -> bool {
        let applied = self
            .registry
            .with_health_mut(venue, |_, health| {
                let counters = &mut health.counters;
                counters.orders_sent += 1;
                if filled {
                    counters.orders_filled += 1;
                } else if timed_out {
                    counters.orders_timeout += 1;
                } else {
                    counters.orders_rejected += 1;
                }
            })
            .is_some();
        if applied {
            self.metrics.record_order_result();
        }
        applied
    }

    pub fn clock_anomalies(&self) -> u64 {
        self.clock_anomalies.load(Ordering::Relaxed)
    }

    pub fn pending_heartbeats(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn registry(&self) -> &Arc<VenueRegistry> {
        &self.registry
    }

    pub fn heartbeat_timeout_ns(&self) -> u64 {
        self.timeout_ns
    }
}

/// Whole timeout intervals covered by an unanswered gap
///
/// A gap of exactly one timeout is still within the window.
#[inline]
fn missed_intervals(gap_ns: u64, timeout_ns: u64) -> u32 {
    if timeout_ns == 0 || gap_ns <= timeout_ns {
        return 0;
    }
    u32::try_from(gap_ns / timeout_ns).unwrap_or(u32::MAX)
}
