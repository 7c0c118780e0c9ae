//! Hot path operations - synchronous, allocation-light, no panics
//!
//! This module contains the decision path:
//! - Order-flow intensity estimation
//! - Inventory-aware quoting
//! - Latency budget derivation
//! - Venue selection

pub mod budget;
pub mod intensity;
pub mod quote;
pub mod routing;

pub use budget::LatencyBudgetCalculator;
pub use intensity::{IntensityEstimator, IntensityState};
pub use quote::QuoteModel;
pub use routing::{CandidateScore, FilterTally, RejectionReason, RoutingDecision, VenueRouter};
