//! Market data types
//!
//! TradeEvent is the only market input the core consumes directly.
//! QuotePair is the quoting model's per-cycle output.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds per second
pub const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Nanoseconds per microsecond
pub const NANOS_PER_MICRO: f64 = 1_000.0;

/// Wall clock in nanoseconds since the Unix epoch
#[inline]
pub fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Signed difference `later - earlier` in seconds
#[inline(always)]
pub fn elapsed_secs(earlier: u64, later: u64) -> f64 {
    (later as i128 - earlier as i128) as f64 / NANOS_PER_SEC
}

/// Trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Side {
    Buy = 1,
    Sell = 2,
}

impl Side {
    /// Side implied by a signed quantity (positive = buy)
    #[inline(always)]
    pub fn from_signed(qty: f64) -> Self {
        if qty > 0.0 {
            Self::Buy
        } else {
            Self::Sell
        }
    }

    /// Returns true if Buy
    #[inline(always)]
    pub const fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }

    /// Returns true if Sell
    #[inline(always)]
    pub const fn is_sell(&self) -> bool {
        matches!(self, Self::Sell)
    }

    #[inline(always)]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// Single trade print, consumed once by the intensity estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeEvent {
    /// Arrival time (nanoseconds since epoch)
    pub arrival_time: u64,
    /// Aggressor side
    pub side: Side,
    /// Instrument identifier
    pub asset_id: u32,
}

impl TradeEvent {
    #[inline(always)]
    pub const fn new(arrival_time: u64, side: Side, asset_id: u32) -> Self {
        Self {
            arrival_time,
            side,
            asset_id,
        }
    }
}

/// Market regime supplied by the external regime classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarketRegime {
    #[default]
    Normal,
    Elevated,
    Stress,
    Halted,
}

impl MarketRegime {
    /// Execution urgency multiplier for the regime
    #[inline(always)]
    pub const fn urgency_multiplier(&self) -> f64 {
        match self {
            Self::Normal => 1.0,
            Self::Elevated => 1.5,
            Self::Stress => 3.0,
            Self::Halted => 10.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Elevated => "elevated",
            Self::Stress => "stress",
            Self::Halted => "halted",
        }
    }
}

/// Two-sided quote produced by the quoting model
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct QuotePair {
    pub bid_price: f64,
    pub ask_price: f64,
    pub bid_size: f64,
    pub ask_size: f64,
    /// ask_price - bid_price
    pub spread: f64,
    pub mid_price: f64,
    /// Generation time (nanoseconds since epoch)
    pub generated_at: u64,
}

impl QuotePair {
    /// All-zero quote returned for degenerate inputs
    #[inline]
    pub fn degenerate(mid_price: f64) -> Self {
        Self {
            mid_price,
            ..Self::default()
        }
    }

    /// Both sides priced and strictly ordered
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.bid_price > 0.0 && self.bid_price < self.ask_price
    }

    /// Distance from mid to the bid
    #[inline]
    pub fn bid_half_spread(&self) -> f64 {
        self.mid_price - self.bid_price
    }

    /// Distance from mid to the ask
    #[inline]
    pub fn ask_half_spread(&self) -> f64 {
        self.ask_price - self.mid_price
    }
}
