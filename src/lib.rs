//! Latency-budgeted execution decision core
//!
//! Order-flow intensity estimation, inventory-aware quoting with an explicit
//! latency-cost term, and a venue router that turns the resulting time budget
//! into a routing decision under live network health.

pub mod core;
pub mod engine;
pub mod health;
pub mod hot_path;
pub mod infrastructure;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use crate::core::{MarketRegime, Side, TradeEvent, VenueId, VenueProfile, VenueRegistry};
pub use engine::{DecisionEngine, RouteRequest};
pub use health::{HeartbeatAck, HeartbeatTask, HeartbeatToken, HeartbeatTransport, VenueHealthMonitor};
pub use hot_path::{
    IntensityEstimator, LatencyBudgetCalculator, QuoteModel, RoutingDecision, VenueRouter,
};
pub use infrastructure::config::Config;

use thiserror::Error;

/// Main error type for the decision core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(#[from] infrastructure::config::ConfigError),

    #[error("Venue already registered: {0}")]
    DuplicateVenue(VenueId),

    #[error("Unknown venue: {0}")]
    UnknownVenue(VenueId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CoreError>;
