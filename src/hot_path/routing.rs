//! Latency-budgeted venue router
//!
//! Turns the latency budget into a venue choice. Venues are filtered on
//! activity, connectivity, smoothed RTT against the budget, RTT spikes, fill
//! rate and order size, then ranked by a weighted composite of price, latency
//! and liquidity quality. Routing never fails: every outcome is a
//! [`RoutingDecision`], with a [`RejectionReason`] when nothing was selected.

use super::budget::LatencyBudgetCalculator;
use crate::core::{MarketRegime, Side, VenueHealth, VenueId, VenueProfile, VenueRegistry};
use crate::infrastructure::config::RoutingConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::Level;

/// Relative distance from the best price at which price quality reaches 0 (1%)
const PRICE_DISTANCE_SCALE: f64 = 100.0;

/// Quality assigned to a venue with no observed price
const NEUTRAL_PRICE_QUALITY: f64 = 0.5;

/// Per-filter rejection counts for one routing call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterTally {
    pub inactive: u32,
    pub disconnected: u32,
    pub over_budget: u32,
    pub spiking: u32,
    pub low_fill_rate: u32,
    pub size_out_of_range: u32,
}

impl FilterTally {
    pub fn total(&self) -> u32 {
        self.inactive
            + self.disconnected
            + self.over_budget
            + self.spiking
            + self.low_fill_rate
            + self.size_out_of_range
    }
}

/// Why a routing call selected no venue
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Mid price or order size unusable
    InvalidRequest { detail: &'static str },
    /// Every venue failed at least one filter
    NoEligibleVenue { budget_us: f64, filtered: FilterTally },
    /// Best composite fell short of the configured minimum
    ScoreBelowMinimum { best_score: f64, min_score: f64 },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest { detail } => write!(f, "Invalid routing request: {}", detail),
            Self::NoEligibleVenue {
                budget_us,
                filtered,
            } => write!(
                f,
                "No venues meet latency budget ({:.1} us) and connectivity requirements \
                 (inactive {}, disconnected {}, over budget {}, spiking {}, low fill rate {}, \
                 size out of range {})",
                budget_us,
                filtered.inactive,
                filtered.disconnected,
                filtered.over_budget,
                filtered.spiking,
                filtered.low_fill_rate,
                filtered.size_out_of_range
            ),
            Self::ScoreBelowMinimum {
                best_score,
                min_score,
            } => write!(
                f,
                "No venues meet minimum composite score ({:.3} < {:.3})",
                best_score, min_score
            ),
        }
    }
}

/// Outcome of one routing call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub selected_venue: Option<VenueId>,
    /// Budget in microseconds, reported even on rejection
    pub latency_budget: f64,
    /// Winner's smoothed RTT in microseconds
    pub expected_latency: f64,
    pub price_quality: f64,
    pub latency_quality: f64,
    pub liquidity_quality: f64,
    pub composite_score: f64,
    pub rejection_reason: Option<RejectionReason>,
}

impl RoutingDecision {
    fn rejected(latency_budget: f64, reason: RejectionReason) -> Self {
        Self {
            selected_venue: None,
            latency_budget,
            expected_latency: 0.0,
            price_quality: 0.0,
            latency_quality: 0.0,
            liquidity_quality: 0.0,
            composite_score: 0.0,
            rejection_reason: Some(reason),
        }
    }

    #[inline(always)]
    pub fn is_routed(&self) -> bool {
        self.selected_venue.is_some()
    }
}

/// Quality components of one candidate venue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub price_quality: f64,
    pub latency_quality: f64,
    pub liquidity_quality: f64,
    pub composite: f64,
}

/// Venue router over a shared registry
pub struct VenueRouter {
    config: RoutingConfig,
    budget: LatencyBudgetCalculator,
    registry: Arc<VenueRegistry>,
}

impl VenueRouter {
    pub fn new(
        config: RoutingConfig,
        budget: LatencyBudgetCalculator,
        registry: Arc<VenueRegistry>,
    ) -> Self {
        Self {
            config,
            budget,
            registry,
        }
    }

    /// Select the best venue for an order
    ///
    /// `order_size` is signed: positive buys, negative sells. `venue_prices`
    /// maps venues to their best opposite-side price (ask when buying, bid
    /// when selling); venues without an entry get neutral price quality.
    pub fn route_order(
        &self,
        mid_price: f64,
        volatility: f64,
        position: f64,
        order_size: f64,
        regime: MarketRegime,
        venue_prices: &BTreeMap<VenueId, f64>,
    ) -> RoutingDecision {
        let budget =
            self.budget
                .calculate_latency_budget(mid_price, volatility, position, order_size, regime);

        if !(mid_price.is_finite() && mid_price > 0.0) {
            return RoutingDecision::rejected(
                budget,
                RejectionReason::InvalidRequest {
                    detail: "mid price must be positive and finite",
                },
            );
        }
        if !order_size.is_finite() || order_size == 0.0 {
            return RoutingDecision::rejected(
                budget,
                RejectionReason::InvalidRequest {
                    detail: "order size must be non-zero and finite",
                },
            );
        }

        let side = Side::from_signed(order_size);
        let abs_size = order_size.abs();

        // Ascending VenueId order
        let mut candidates = self.registry.snapshot();
        let mut tally = FilterTally::default();
        candidates.retain(|venue| {
            self.passes_filters(&venue.profile, &venue.health, budget, abs_size, &mut tally)
        });

        if candidates.is_empty() {
            let reason = RejectionReason::NoEligibleVenue {
                budget_us: budget,
                filtered: tally,
            };
            crate::log_routing!(Level::DEBUG, budget_us = budget, %reason, "order not routed");
            return RoutingDecision::rejected(budget, reason);
        }

        let best_price = best_observed_price(
            candidates.iter().map(|venue| &venue.profile.id),
            venue_prices,
            side,
        );

        let mut winner: Option<(usize, CandidateScore)> = None;
        for (idx, venue) in candidates.iter().enumerate() {
            let score = self.score_candidate(
                &venue.profile,
                &venue.health,
                observed_price(venue_prices, &venue.profile.id),
                best_price,
                side,
                abs_size,
                budget,
            );
            // Strictly greater: earlier (lower) ids win ties
            let better = match winner {
                Some((_, best)) => score.composite > best.composite,
                None => true,
            };
            if better {
                winner = Some((idx, score));
            }
        }

        let Some((idx, best)) = winner else {
            return RoutingDecision::rejected(
                budget,
                RejectionReason::NoEligibleVenue {
                    budget_us: budget,
                    filtered: tally,
                },
            );
        };

        if best.composite < self.config.min_composite_score {
            let reason = RejectionReason::ScoreBelowMinimum {
                best_score: best.composite,
                min_score: self.config.min_composite_score,
            };
            crate::log_routing!(Level::DEBUG, budget_us = budget, %reason, "order not routed");
            return RoutingDecision::rejected(budget, reason);
        }

        let venue = &candidates[idx];
        let rescored = self.score_candidate(
            &venue.profile,
            &venue.health,
            observed_price(venue_prices, &venue.profile.id),
            best_price,
            side,
            abs_size,
            budget,
        );
        debug_assert_eq!(rescored, best);

        crate::log_routing!(
            Level::DEBUG,
            venue = %venue.profile.id,
            budget_us = budget,
            ema_rtt_us = venue.health.ema_rtt,
            score = rescored.composite,
            "order routed"
        );

        RoutingDecision {
            selected_venue: Some(venue.profile.id.clone()),
            latency_budget: budget,
            expected_latency: venue.health.ema_rtt,
            price_quality: rescored.price_quality,
            latency_quality: rescored.latency_quality,
            liquidity_quality: rescored.liquidity_quality,
            composite_score: rescored.composite,
            rejection_reason: None,
        }
    }

    /// Eligibility filters, counting the first one that fails
    #[inline]
    fn passes_filters(
        &self,
        profile: &VenueProfile,
        health: &VenueHealth,
        budget: f64,
        abs_size: f64,
        tally: &mut FilterTally,
    ) -> bool {
        if !profile.active {
            tally.inactive += 1;
            return false;
        }
        if !health.is_connected() {
            tally.disconnected += 1;
            return false;
        }
        if health.ema_rtt > budget {
            tally.over_budget += 1;
            return false;
        }
        if health.current_rtt > health.spike_ceiling(self.config.spike_threshold) {
            tally.spiking += 1;
            return false;
        }
        if health.live_fill_rate(profile.historical_fill_rate) < self.config.min_fill_rate {
            tally.low_fill_rate += 1;
            return false;
        }
        if !profile.accepts_size(abs_size) {
            tally.size_out_of_range += 1;
            return false;
        }
        true
    }

    /// Quality components for one candidate
    ///
    /// Pure: the same inputs always give bit-identical scores, so the winner
    /// can be re-scored for the decision without drift.
    #[allow(clippy::too_many_arguments)]
    #[inline]
    pub fn score_candidate(
        &self,
        profile: &VenueProfile,
        health: &VenueHealth,
        venue_price: Option<f64>,
        best_price: Option<f64>,
        side: Side,
        abs_size: f64,
        budget: f64,
    ) -> CandidateScore {
        let price_quality = match (venue_price, best_price) {
            (Some(price), Some(best)) => {
                let distance = match side {
                    Side::Buy => (price - best) / best,
                    Side::Sell => (best - price) / best,
                };
                (1.0 - distance * PRICE_DISTANCE_SCALE).max(0.0)
            }
            _ => NEUTRAL_PRICE_QUALITY,
        };

        let latency_quality = if budget > 0.0 {
            (1.0 - health.ema_rtt / budget).max(0.0)
        } else {
            0.0
        };

        let liquidity_quality = if abs_size > 0.0 {
            (profile.available_depth(side) / abs_size).min(1.0)
        } else {
            0.0
        };

        let composite = self.config.price_weight * price_quality
            + self.config.latency_weight * latency_quality
            + self.config.liquidity_weight * liquidity_quality;

        CandidateScore {
            price_quality,
            latency_quality,
            liquidity_quality,
            composite,
        }
    }

    pub fn budget_calculator(&self) -> &LatencyBudgetCalculator {
        &self.budget
    }

    pub fn registry(&self) -> &Arc<VenueRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }
}

#[inline]
fn observed_price(venue_prices: &BTreeMap<VenueId, f64>, id: &VenueId) -> Option<f64> {
    venue_prices
        .get(id)
        .copied()
        .filter(|price| price.is_finite() && *price > 0.0)
}

/// Lowest observed price when buying, highest when selling
fn best_observed_price<'a>(
    ids: impl Iterator<Item = &'a VenueId>,
    venue_prices: &BTreeMap<VenueId, f64>,
    side: Side,
) -> Option<f64> {
    ids.filter_map(|id| observed_price(venue_prices, id))
        .reduce(|best, price| match side {
            Side::Buy => best.min(price),
            Side::Sell => best.max(price),
        })
}

// HFT Hot Path Checklist verified:
// ✓ No panics (rejections are values)
// ✓ One snapshot allocation per call, no locks held while scoring
// ✓ Deterministic iteration (ascending VenueId)
