//! Core types for the execution decision core
//!
//! This module contains the fundamental types used throughout the system:
//! - TradeEvent / Side / MarketRegime: market inputs
//! - QuotePair: quoting model output
//! - VenueProfile / VenueHealth: static and live venue state
//! - VenueRegistry: explicit shared registry of venues

pub mod market_data;
pub mod registry;
pub mod venue;

pub use market_data::{
    elapsed_secs, now_nanos, MarketRegime, QuotePair, Side, TradeEvent, NANOS_PER_MICRO,
    NANOS_PER_SEC,
};
pub use registry::{VenueRegistry, VenueSnapshot};
pub use venue::{ConnectionState, FeeSchedule, VenueCounters, VenueHealth, VenueId, VenueProfile};
