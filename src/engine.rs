//! Decision engine
//!
//! Owns the decision-path components and runs them on a single thread.
//! Trade events arrive through a lock-free bounded inbox that any producer
//! thread can push into; the decision thread drains it before each decision.

use crate::core::{
    ConnectionState, MarketRegime, QuotePair, TradeEvent, VenueId, VenueRegistry,
};
use crate::hot_path::{IntensityEstimator, LatencyBudgetCalculator, RoutingDecision, VenueRouter};
use crate::infrastructure::config::Config;
use crate::infrastructure::metrics::{MetricsCollector, MetricsSnapshot};
use crate::Result;
use crossbeam_queue::ArrayQueue;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::Level;

/// Bounded multi-producer trade event queue
pub struct TradeInbox {
    queue: ArrayQueue<TradeEvent>,
    metrics: Arc<MetricsCollector>,
}

impl TradeInbox {
    pub fn new(capacity: usize, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            metrics,
        }
    }

    /// Enqueue an event; returns false and counts a drop when full
    #[inline]
    pub fn push(&self, event: TradeEvent) -> bool {
        match self.queue.push(event) {
            Ok(()) => true,
            Err(_) => {
                self.metrics.record_trade_dropped();
                false
            }
        }
    }

    #[inline]
    fn pop(&self) -> Option<TradeEvent> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

/// Inputs for one routing call
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub mid_price: f64,
    pub volatility: f64,
    pub position: f64,
    /// Signed: positive buys, negative sells
    pub order_size: f64,
    pub regime: MarketRegime,
    /// Best opposite-side price per venue
    pub venue_prices: BTreeMap<VenueId, f64>,
}

/// Per-venue line of the status report
#[derive(Debug, Clone, Serialize)]
pub struct VenueStatus {
    pub id: VenueId,
    pub active: bool,
    pub state: ConnectionState,
    pub ema_rtt_us: f64,
    pub stddev_rtt_us: f64,
    pub consecutive_timeouts: u32,
    pub fill_rate: f64,
}

/// Engine state summary
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub buy_intensity: f64,
    pub sell_intensity: f64,
    pub intensity_imbalance: f64,
    pub trade_events: u64,
    pub venues: Vec<VenueStatus>,
    pub metrics: MetricsSnapshot,
}

/// Single-threaded decision engine
pub struct DecisionEngine {
    intensity: IntensityEstimator,
    router: VenueRouter,
    inbox: Arc<TradeInbox>,
    metrics: Arc<MetricsCollector>,
}

impl DecisionEngine {
    /// Build every decision-path component from a validated config
    pub fn new(
        config: &Config,
        registry: Arc<VenueRegistry>,
        metrics: Arc<MetricsCollector>,
        inbox_capacity: usize,
    ) -> Result<Self> {
        let budget = LatencyBudgetCalculator::from_config(config)?;
        let router = VenueRouter::new(config.routing, budget, registry);

        tracing::info!(
            target: "engine",
            venues = router.registry().len(),
            inbox_capacity,
            "decision engine ready"
        );

        Ok(Self {
            intensity: IntensityEstimator::new(&config.hawkes),
            router,
            inbox: Arc::new(TradeInbox::new(inbox_capacity, metrics.clone())),
            metrics,
        })
    }

    /// Producer handle for trade events
    pub fn inbox(&self) -> Arc<TradeInbox> {
        self.inbox.clone()
    }

    /// Apply every queued trade event to the intensity estimator
    pub fn drain_trades(&mut self) -> usize {
        let mut drained = 0usize;
        while let Some(event) = self.inbox.pop() {
            self.intensity.update(&event);
            drained += 1;
        }
        if drained > 0 {
            self.metrics.record_trades(drained as u64);
        }
        drained
    }

    /// Apply one trade event directly, bypassing the inbox
    #[inline]
    pub fn on_trade(&mut self, event: &TradeEvent) {
        self.intensity.update(event);
        self.metrics.record_trades(1);
    }

    /// Quotes with the latency cost priced in, or None when latency eats the edge
    ///
    /// `time_remaining` defaults to the configured quoting horizon.
    pub fn quote(
        &self,
        mid_price: f64,
        inventory: f64,
        time_remaining: Option<f64>,
        volatility: f64,
    ) -> Option<QuotePair> {
        let model = self.router.budget_calculator().quote_model();
        let time_remaining = time_remaining.unwrap_or_else(|| model.time_horizon());
        let latency_cost = model.calculate_latency_cost(volatility, mid_price);
        let quotes = model.calculate_quotes(mid_price, inventory, time_remaining, latency_cost);
        if quotes.is_valid() && model.should_quote(quotes.spread, latency_cost) {
            Some(quotes)
        } else {
            None
        }
    }

    /// Route one order and record the outcome
    pub fn route(&self, request: &RouteRequest) -> RoutingDecision {
        let decision = self.router.route_order(
            request.mid_price,
            request.volatility,
            request.position,
            request.order_size,
            request.regime,
            &request.venue_prices,
        );
        self.metrics.record_route(decision.is_routed());

        if let Some(reason) = &decision.rejection_reason {
            crate::log_engine!(
                Level::DEBUG,
                regime = request.regime.name(),
                budget_us = decision.latency_budget,
                %reason,
                "route rejected"
            );
        }
        decision
    }

    pub fn status(&self) -> EngineStatus {
        let venues = self
            .router
            .registry()
            .snapshot()
            .into_iter()
            .map(|venue| VenueStatus {
                id: venue.profile.id.clone(),
                active: venue.profile.active,
                state: venue.health.state,
                ema_rtt_us: venue.health.ema_rtt,
                stddev_rtt_us: venue.health.stddev_rtt,
                consecutive_timeouts: venue.health.consecutive_timeouts,
                fill_rate: venue.health.live_fill_rate(venue.profile.historical_fill_rate),
            })
            .collect();

        EngineStatus {
            buy_intensity: self.intensity.buy_intensity(),
            sell_intensity: self.intensity.sell_intensity(),
            intensity_imbalance: self.intensity.get_intensity_imbalance(),
            trade_events: self.intensity.event_count(),
            venues,
            metrics: self.metrics.snapshot(),
        }
    }

    pub fn intensity(&self) -> &IntensityEstimator {
        &self.intensity
    }

    pub fn router(&self) -> &VenueRouter {
        &self.router
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }
}
