//! Latency-budgeted execution decision core
//!
//! # Architecture
//! - **core**: Plain data types and the shared venue registry
//! - **hot_path**: Intensity, quoting, latency budget, venue routing
//! - **health**: Heartbeat task and venue health monitor
//! - **engine**: Single-threaded decision loop
//! - **infrastructure**: Cold path (config, logging, metrics)
//!
//! The binary wires everything together over a simulated heartbeat transport
//! and a synthetic market, then prints a JSON status report on exit.
//! Usage: `hft-exec-core [seconds]` (runs until Ctrl-C when omitted).

use anyhow::Context;
use hft_exec_core::core::{now_nanos, MarketRegime, Side, TradeEvent, VenueRegistry};
use hft_exec_core::engine::{DecisionEngine, RouteRequest};
use hft_exec_core::health::{HeartbeatTask, SimulatedTransport, VenueHealthMonitor};
use hft_exec_core::infrastructure::{init_logging, Config, MetricsCollector};
use hft_exec_core::VenueId;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Decision loop period
const DECISION_PERIOD: Duration = Duration::from_millis(10);
const TRADE_INBOX_CAPACITY: usize = 65_536;
const ACK_CHANNEL_CAPACITY: usize = 4_096;
/// Simulated RTT jitter as a fraction of each venue's baseline
const SIMULATED_JITTER: f64 = 0.25;

/// Deterministic synthetic market for the demo loop
struct SyntheticMarket {
    step: u64,
    position: f64,
}

impl SyntheticMarket {
    fn new() -> Self {
        Self {
            step: 0,
            position: 0.0,
        }
    }

    fn advance(&mut self) {
        self.step += 1;
    }

    fn mid_price(&self) -> f64 {
        100.0 + 0.5 * (self.step as f64 * 0.01).sin()
    }

    fn volatility(&self) -> f64 {
        0.02 + 0.01 * (self.step as f64 * 0.003).cos().abs()
    }

    fn regime(&self) -> MarketRegime {
        match (self.step / 500) % 8 {
            0..=4 => MarketRegime::Normal,
            5 | 6 => MarketRegime::Elevated,
            _ => MarketRegime::Stress,
        }
    }

    /// Trade prints for this step: buys lead when the mid is rising
    fn trades(&self, now: u64) -> impl Iterator<Item = TradeEvent> {
        let rising = (self.step as f64 * 0.01).cos() > 0.0;
        let count = 1 + (self.step % 3);
        (0..count).map(move |i| {
            let side = if (i == 0) == rising { Side::Buy } else { Side::Sell };
            TradeEvent::new(now + i, side, 1)
        })
    }

    fn order_size(&self) -> f64 {
        let size = 5.0 + (self.step % 20) as f64;
        if self.position > 200.0 || (self.position > -200.0 && self.step % 2 == 0) {
            -size
        } else {
            size
        }
    }

    fn venue_prices(&self, registry: &VenueRegistry, side: Side) -> BTreeMap<VenueId, f64> {
        let mid = self.mid_price();
        registry
            .venue_ids()
            .into_iter()
            .enumerate()
            .map(|(i, id)| {
                let offset = 0.01 * (1 + i) as f64;
                let price = match side {
                    Side::Buy => mid + offset,
                    Side::Sell => mid - offset,
                };
                (id, price)
            })
            .collect()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let run_for = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<u64>().map(Duration::from_secs))
        .transpose()
        .context("run duration must be a whole number of seconds")?;

    let config = Config::load().context("failed to load configuration")?;
    let _log_guards = init_logging(&config.logging).context("failed to initialise logging")?;

    tracing::info!(
        venues = config.venues.len(),
        heartbeat_interval_ms = config.routing.heartbeat_interval_ms,
        heartbeat_timeout_ms = config.routing.heartbeat_timeout_ms,
        "Starting execution decision core"
    );

    // 1. Shared state
    let metrics = Arc::new(MetricsCollector::new());
    let registry = Arc::new(
        VenueRegistry::from_profiles(config.venues.iter().cloned())
            .context("failed to register venues")?,
    );

    // 2. Heartbeat task (warm path)
    let monitor = Arc::new(VenueHealthMonitor::new(
        &config.routing,
        registry.clone(),
        metrics.clone(),
    ));
    let (ack_tx, ack_rx) = mpsc::channel(ACK_CHANNEL_CAPACITY);
    let transport = Arc::new(SimulatedTransport::new(ack_tx, SIMULATED_JITTER));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let heartbeat = HeartbeatTask::new(
        monitor.clone(),
        transport,
        ack_rx,
        Duration::from_millis(config.routing.heartbeat_interval_ms),
        shutdown_rx,
    );
    let heartbeat_handle = tokio::spawn(heartbeat.run());

    // 3. Decision loop (hot path)
    let mut engine = DecisionEngine::new(
        &config,
        registry.clone(),
        metrics.clone(),
        TRADE_INBOX_CAPACITY,
    )
    .context("failed to build decision engine")?;
    let inbox = engine.inbox();
    let mut market = SyntheticMarket::new();

    let mut ticker = tokio::time::interval(DECISION_PERIOD);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let deadline = run_for.map(|d| tokio::time::Instant::now() + d);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                }
                tracing::info!("Shutdown requested");
                break;
            }
        }
        if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
            break;
        }

        market.advance();
        let now = now_nanos();
        for trade in market.trades(now) {
            inbox.push(trade);
        }
        engine.drain_trades();

        let order_size = market.order_size();
        let side = Side::from_signed(order_size);
        let request = RouteRequest {
            mid_price: market.mid_price(),
            volatility: market.volatility(),
            position: market.position,
            order_size,
            regime: market.regime(),
            venue_prices: market.venue_prices(&registry, side),
        };
        let decision = engine.route(&request);

        if market.step % 100 == 0 {
            match engine.quote(request.mid_price, market.position, None, request.volatility) {
                Some(q) => tracing::debug!(
                    bid = q.bid_price,
                    ask = q.ask_price,
                    position = market.position,
                    "quotes"
                ),
                None => tracing::debug!(position = market.position, "not quoting: latency cost exceeds edge"),
            }
        }

        if let Some(venue) = &decision.selected_venue {
            // Roughly one order in twelve misses
            let filled = market.step % 12 != 0;
            monitor.record_order_result(venue, filled, !filled && market.step % 24 == 0);
            if filled {
                market.position += order_size;
            }
        }
    }

    // 4. Shutdown
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Heartbeat task already stopped");
    }
    heartbeat_handle
        .await
        .context("heartbeat task panicked")?;

    let status = engine.status();
    println!(
        "{}",
        serde_json::to_string_pretty(&status).context("failed to render status")?
    );
    tracing::info!(
        routed = status.metrics.routes_routed,
        rejected = status.metrics.routes_rejected,
        "Execution decision core stopped"
    );

    Ok(())
}
