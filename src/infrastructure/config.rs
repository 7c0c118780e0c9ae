//! Configuration management for the decision core
//!
//! Loads configuration from config.toml at startup and validates it before
//! any component is built. All values are static for the process lifetime.

use crate::core::{FeeSchedule, VenueId, VenueProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Tolerance for the routing weights summing to 1.0
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// Decision core configuration
///
/// Loaded from config.toml at startup. Contains all tunable parameters
/// to avoid hardcoded values throughout the codebase.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Order-flow intensity model
    #[serde(default)]
    pub hawkes: HawkesConfig,

    /// Inventory-aware quoting model
    #[serde(default)]
    pub quoting: QuotingConfig,

    /// Latency budget derivation
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Venue filtering, scoring and heartbeats
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Venue profiles registered at startup
    #[serde(default = "default_venues")]
    pub venues: Vec<VenueProfile>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hawkes intensity parameters
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct HawkesConfig {
    /// Baseline buy intensity (events/s)
    #[serde(default = "default_baseline")]
    pub baseline_buy: f64,
    /// Baseline sell intensity (events/s)
    #[serde(default = "default_baseline")]
    pub baseline_sell: f64,
    /// Same-side excitation
    #[serde(default = "default_alpha_self")]
    pub alpha_self: f64,
    /// Opposite-side excitation
    #[serde(default = "default_alpha_cross")]
    pub alpha_cross: f64,
    /// Exponential decay rate (1/s)
    #[serde(default = "default_beta")]
    pub beta: f64,
}

/// Quoting model parameters
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct QuotingConfig {
    /// Risk aversion (gamma)
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Annualised volatility (sigma)
    #[serde(default = "default_sigma")]
    pub sigma: f64,
    /// Quoting horizon in seconds
    #[serde(default = "default_time_horizon")]
    pub time_horizon_secs: f64,
    /// Order arrival rate (k)
    #[serde(default = "default_k")]
    pub k: f64,
    #[serde(default = "default_tick_size")]
    pub tick_size: f64,
    /// Round-trip system latency in nanoseconds
    #[serde(default = "default_system_latency")]
    pub system_latency_ns: u64,
    /// Inventory normaliser for skew and size scaling
    #[serde(default = "default_max_inventory")]
    pub max_inventory: f64,
    /// Quote size before inventory scaling
    #[serde(default = "default_base_size")]
    pub base_size: f64,
}

/// Latency budget parameters (budgets in microseconds)
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct BudgetConfig {
    /// Horizon used when pricing the budget quotes
    #[serde(default = "default_quote_horizon")]
    pub quote_horizon_secs: f64,
    #[serde(default = "default_min_budget")]
    pub min_budget_us: f64,
    #[serde(default = "default_max_budget")]
    pub max_budget_us: f64,
    /// Profit-per-volatility to microseconds conversion
    #[serde(default = "default_k_unit")]
    pub k_unit: f64,
    /// Position size at which position urgency doubles
    #[serde(default = "default_position_scale")]
    pub position_scale: f64,
}

/// Routing and venue health parameters
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RoutingConfig {
    #[serde(default = "default_price_weight")]
    pub price_weight: f64,
    #[serde(default = "default_latency_weight")]
    pub latency_weight: f64,
    #[serde(default = "default_liquidity_weight")]
    pub liquidity_weight: f64,
    /// Fraction of the theoretical budget actually granted
    #[serde(default = "default_safety_margin")]
    pub safety_margin: f64,
    /// Reject venues whose current RTT exceeds EMA + N * stddev
    #[serde(default = "default_spike_threshold")]
    pub spike_threshold: f64,
    #[serde(default = "default_min_fill_rate")]
    pub min_fill_rate: f64,
    #[serde(default = "default_min_composite_score")]
    pub min_composite_score: f64,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_ms: u64,
    /// RTT EMA smoothing factor
    #[serde(default = "default_ema_alpha")]
    pub ema_alpha: f64,
    /// Consecutive missed heartbeats before a venue is disconnected
    #[serde(default = "default_max_timeouts")]
    pub max_consecutive_timeouts: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// EnvFilter directive used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for rolling log files
    #[serde(default = "default_log_dir")]
    pub directory: PathBuf,
    /// Write log files in addition to the console
    #[serde(default = "default_file_logging")]
    pub file_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hawkes: HawkesConfig::default(),
            quoting: QuotingConfig::default(),
            budget: BudgetConfig::default(),
            routing: RoutingConfig::default(),
            venues: default_venues(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for HawkesConfig {
    fn default() -> Self {
        Self {
            baseline_buy: default_baseline(),
            baseline_sell: default_baseline(),
            alpha_self: default_alpha_self(),
            alpha_cross: default_alpha_cross(),
            beta: default_beta(),
        }
    }
}

impl Default for QuotingConfig {
    fn default() -> Self {
        Self {
            gamma: default_gamma(),
            sigma: default_sigma(),
            time_horizon_secs: default_time_horizon(),
            k: default_k(),
            tick_size: default_tick_size(),
            system_latency_ns: default_system_latency(),
            max_inventory: default_max_inventory(),
            base_size: default_base_size(),
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            quote_horizon_secs: default_quote_horizon(),
            min_budget_us: default_min_budget(),
            max_budget_us: default_max_budget(),
            k_unit: default_k_unit(),
            position_scale: default_position_scale(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            price_weight: default_price_weight(),
            latency_weight: default_latency_weight(),
            liquidity_weight: default_liquidity_weight(),
            safety_margin: default_safety_margin(),
            spike_threshold: default_spike_threshold(),
            min_fill_rate: default_min_fill_rate(),
            min_composite_score: default_min_composite_score(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            heartbeat_timeout_ms: default_heartbeat_timeout(),
            ema_alpha: default_ema_alpha(),
            max_consecutive_timeouts: default_max_timeouts(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_dir(),
            file_logging: default_file_logging(),
        }
    }
}

fn default_baseline() -> f64 {
    10.0
}

fn default_alpha_self() -> f64 {
    0.5
}

fn default_alpha_cross() -> f64 {
    0.2
}

fn default_beta() -> f64 {
    1e-3
}

fn default_gamma() -> f64 {
    0.1
}

fn default_sigma() -> f64 {
    0.20 // 20% annualized
}

fn default_time_horizon() -> f64 {
    300.0 // 5 minutes
}

fn default_k() -> f64 {
    10.0
}

fn default_tick_size() -> f64 {
    0.01
}

fn default_system_latency() -> u64 {
    800
}

fn default_max_inventory() -> f64 {
    1000.0
}

fn default_base_size() -> f64 {
    100.0
}

fn default_quote_horizon() -> f64 {
    600.0 // 10 minutes
}

fn default_min_budget() -> f64 {
    100.0
}

fn default_max_budget() -> f64 {
    10_000.0
}

fn default_k_unit() -> f64 {
    1000.0
}

fn default_position_scale() -> f64 {
    1000.0
}

fn default_price_weight() -> f64 {
    0.5
}

fn default_latency_weight() -> f64 {
    0.3
}

fn default_liquidity_weight() -> f64 {
    0.2
}

fn default_safety_margin() -> f64 {
    0.8
}

fn default_spike_threshold() -> f64 {
    2.0
}

fn default_min_fill_rate() -> f64 {
    0.85
}

fn default_min_composite_score() -> f64 {
    0.6
}

fn default_heartbeat_interval() -> u64 {
    100
}

fn default_heartbeat_timeout() -> u64 {
    1000
}

fn default_ema_alpha() -> f64 {
    0.2
}

fn default_max_timeouts() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_file_logging() -> bool {
    true
}

#[allow(clippy::too_many_arguments)]
fn venue(
    id: &str,
    name: &str,
    endpoint: &str,
    baseline_latency_us: f64,
    maker_fee_bps: f64,
    taker_fee_bps: f64,
    min_order_size: f64,
    max_order_size: f64,
    depth: f64,
    historical_fill_rate: f64,
) -> VenueProfile {
    VenueProfile {
        id: VenueId::from(id),
        name: name.to_string(),
        endpoint: endpoint.to_string(),
        baseline_latency_us,
        fees: FeeSchedule {
            maker_fee_bps,
            taker_fee_bps,
        },
        min_order_size,
        max_order_size,
        typical_bid_depth: depth,
        typical_ask_depth: depth,
        historical_fill_rate,
        active: true,
    }
}

fn default_venues() -> Vec<VenueProfile> {
    vec![
        venue("BINANCE", "Binance", "api.binance.com:443", 500.0, -1.0, 4.0, 0.001, 10_000.0, 5_000.0, 0.95),
        venue("COINBASE", "Coinbase Pro", "api.pro.coinbase.com:443", 800.0, 0.0, 5.0, 0.01, 5_000.0, 3_000.0, 0.90),
        venue("KRAKEN", "Kraken", "api.kraken.com:443", 1200.0, 0.0, 6.0, 0.01, 3_000.0, 2_000.0, 0.88),
    ]
}

impl Config {
    /// Load configuration from config.toml file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// # Errors
    /// Returns error if file exists but cannot be parsed, or if the parsed
    /// configuration fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File not found - use defaults
                let config = Config::default();
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::IoError(e)),
        }
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject malformed configurations before the core starts operating
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_hawkes()?;
        self.validate_quoting()?;
        self.validate_budget()?;
        self.validate_routing()?;
        self.validate_venues()
    }

    fn validate_hawkes(&self) -> Result<(), ConfigError> {
        let h = &self.hawkes;
        non_negative("hawkes.baseline_buy", h.baseline_buy)?;
        non_negative("hawkes.baseline_sell", h.baseline_sell)?;
        non_negative("hawkes.alpha_self", h.alpha_self)?;
        non_negative("hawkes.alpha_cross", h.alpha_cross)?;
        positive("hawkes.beta", h.beta)
    }

    fn validate_quoting(&self) -> Result<(), ConfigError> {
        let q = &self.quoting;
        positive("quoting.gamma", q.gamma)?;
        positive("quoting.sigma", q.sigma)?;
        positive("quoting.time_horizon_secs", q.time_horizon_secs)?;
        positive("quoting.k", q.k)?;
        positive("quoting.tick_size", q.tick_size)?;
        positive("quoting.max_inventory", q.max_inventory)?;
        positive("quoting.base_size", q.base_size)
    }

    fn validate_budget(&self) -> Result<(), ConfigError> {
        let b = &self.budget;
        positive("budget.quote_horizon_secs", b.quote_horizon_secs)?;
        positive("budget.min_budget_us", b.min_budget_us)?;
        positive("budget.max_budget_us", b.max_budget_us)?;
        positive("budget.k_unit", b.k_unit)?;
        positive("budget.position_scale", b.position_scale)?;
        if b.min_budget_us > b.max_budget_us {
            return Err(ConfigError::Validation(format!(
                "budget.min_budget_us ({}) exceeds budget.max_budget_us ({})",
                b.min_budget_us, b.max_budget_us
            )));
        }
        Ok(())
    }

    fn validate_routing(&self) -> Result<(), ConfigError> {
        let r = &self.routing;
        non_negative("routing.price_weight", r.price_weight)?;
        non_negative("routing.latency_weight", r.latency_weight)?;
        non_negative("routing.liquidity_weight", r.liquidity_weight)?;

        let sum = r.price_weight + r.latency_weight + r.liquidity_weight;
        if (sum - 1.0).abs() > WEIGHT_EPSILON {
            return Err(ConfigError::Validation(format!(
                "routing weights must sum to 1.0, got {}",
                sum
            )));
        }

        in_unit_interval("routing.safety_margin", r.safety_margin, false)?;
        in_unit_interval("routing.ema_alpha", r.ema_alpha, false)?;
        in_unit_interval("routing.min_fill_rate", r.min_fill_rate, true)?;
        non_negative("routing.spike_threshold", r.spike_threshold)?;
        non_negative("routing.min_composite_score", r.min_composite_score)?;

        if r.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "routing.heartbeat_interval_ms must be positive".to_string(),
            ));
        }
        if r.heartbeat_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "routing.heartbeat_timeout_ms must be positive".to_string(),
            ));
        }
        if r.max_consecutive_timeouts == 0 {
            return Err(ConfigError::Validation(
                "routing.max_consecutive_timeouts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_venues(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for v in &self.venues {
            if v.id.as_str().is_empty() {
                return Err(ConfigError::Validation("venue id must not be empty".to_string()));
            }
            if !seen.insert(v.id.clone()) {
                return Err(ConfigError::Validation(format!("duplicate venue id {}", v.id)));
            }
            positive(&format!("venues.{}.baseline_latency_us", v.id), v.baseline_latency_us)?;
            non_negative(&format!("venues.{}.min_order_size", v.id), v.min_order_size)?;
            non_negative(&format!("venues.{}.typical_bid_depth", v.id), v.typical_bid_depth)?;
            non_negative(&format!("venues.{}.typical_ask_depth", v.id), v.typical_ask_depth)?;
            in_unit_interval(
                &format!("venues.{}.historical_fill_rate", v.id),
                v.historical_fill_rate,
                true,
            )?;
            if v.min_order_size > v.max_order_size {
                return Err(ConfigError::Validation(format!(
                    "venue {}: min_order_size exceeds max_order_size",
                    v.id
                )));
            }
        }
        Ok(())
    }
}

impl RoutingConfig {
    /// Heartbeat timeout in nanoseconds
    #[inline(always)]
    pub fn heartbeat_timeout_ns(&self) -> u64 {
        self.heartbeat_timeout_ms.saturating_mul(1_000_000)
    }
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{} must be positive, got {}", name, value)))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{} must be non-negative, got {}", name, value)))
    }
}

/// (0, 1], or [0, 1] when `allow_zero`
fn in_unit_interval(name: &str, value: f64, allow_zero: bool) -> Result<(), ConfigError> {
    let lower_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if value.is_finite() && lower_ok && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{} out of range, got {}", name, value)))
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading file
    IoError(std::io::Error),
    /// Parse error (invalid TOML)
    ParseError(String),
    /// Parsed but semantically invalid
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::ParseError(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Validation(e) => write!(f, "Invalid config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            ConfigError::ParseError(_) | ConfigError::Validation(_) => None,
        }
    }
}
