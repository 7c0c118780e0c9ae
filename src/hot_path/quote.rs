//! Inventory-aware quoting with an explicit latency-cost term
//!
//! Closed-form Avellaneda-Stoikov quotes:
//!
//! ```text
//! r        = mid - q * gamma * sigma^2 * tau
//! spread   = gamma * sigma^2 * tau + (2 / gamma) * ln(1 + gamma / k)
//! ```
//!
//! The spread is floored at two ticks, widened when the latency cost exceeds
//! the half-spread, and split asymmetrically by a tanh inventory skew.

use crate::core::{now_nanos, QuotePair, Side, NANOS_PER_SEC};
use crate::infrastructure::config::QuotingConfig;
use crate::{CoreError, Result};

/// Trading seconds per year used to de-annualise sigma (252 days x 6.5 h)
pub const TRADING_SECONDS_PER_YEAR: f64 = 252.0 * 6.5 * 3600.0;

/// Quoting is worthwhile only if half the spread beats latency cost by 10%
const QUOTE_PROFIT_MARGIN: f64 = 1.1;

/// Closed-form quoting model
#[derive(Debug, Clone)]
pub struct QuoteModel {
    gamma: f64,
    /// Annualised volatility
    sigma: f64,
    sigma_sq_per_second: f64,
    time_horizon: f64,
    k: f64,
    tick_size: f64,
    system_latency_ns: u64,
    min_spread: f64,
    max_inventory: f64,
    base_size: f64,
}

impl QuoteModel {
    /// Build the model, rejecting parameters that would divide by zero
    ///
    /// # Errors
    /// `InvalidParameter` for non-positive gamma, sigma, k, tick size,
    /// max inventory or base size.
    pub fn new(config: &QuotingConfig) -> Result<Self> {
        require_positive("gamma", config.gamma)?;
        require_positive("sigma", config.sigma)?;
        require_positive("k", config.k)?;
        require_positive("tick_size", config.tick_size)?;
        require_positive("max_inventory", config.max_inventory)?;
        require_positive("base_size", config.base_size)?;

        Ok(Self {
            gamma: config.gamma,
            sigma: config.sigma,
            sigma_sq_per_second: per_second_variance(config.sigma),
            time_horizon: config.time_horizon_secs,
            k: config.k,
            tick_size: config.tick_size,
            system_latency_ns: config.system_latency_ns,
            min_spread: config.tick_size * 2.0,
            max_inventory: config.max_inventory,
            base_size: config.base_size,
        })
    }

    /// Optimal bid/ask around the inventory-adjusted reservation price
    ///
    /// Returns an all-zero quote when `mid_price <= 0` or
    /// `time_remaining <= 0`. Otherwise `bid_price < ask_price` always holds.
    pub fn calculate_quotes(
        &self,
        mid_price: f64,
        inventory: f64,
        time_remaining: f64,
        latency_cost: f64,
    ) -> QuotePair {
        let valid = mid_price.is_finite()
            && mid_price > 0.0
            && time_remaining.is_finite()
            && time_remaining > 0.0
            && inventory.is_finite();
        if !valid {
            return QuotePair::degenerate(mid_price.max(0.0));
        }

        let time_component = self.gamma * self.sigma_sq_per_second * time_remaining;
        let reservation_price = mid_price - inventory * time_component;

        let arrival_component = (2.0 / self.gamma) * (1.0 + self.gamma / self.k).ln();
        let mut total_spread = (time_component + arrival_component).max(self.min_spread);

        // Latency cost taxes the quoted spread directly
        if latency_cost.is_finite() && latency_cost > total_spread / 2.0 {
            total_spread += 2.0 * (latency_cost - total_spread / 2.0);
        }
        let half_spread = total_spread / 2.0;

        let skew = self.inventory_skew(inventory);
        let bid_spread = half_spread * (1.0 - skew);
        let ask_spread = half_spread * (1.0 + skew);

        let ask_price = self.round_to_tick(reservation_price + ask_spread);
        let mut bid_price = self.round_to_tick(reservation_price - bid_spread);
        if bid_price >= ask_price {
            bid_price = ask_price - self.tick_size;
        }

        QuotePair {
            bid_price,
            ask_price,
            bid_size: self.quote_size(Side::Buy, inventory),
            ask_size: self.quote_size(Side::Sell, inventory),
            spread: ask_price - bid_price,
            mid_price,
            generated_at: now_nanos(),
        }
    }

    /// Expected adverse price move over one system round trip, in price units
    #[inline]
    pub fn calculate_latency_cost(&self, volatility: f64, mid_price: f64) -> f64 {
        let latency_seconds = self.system_latency_ns as f64 / NANOS_PER_SEC;
        let expected_slippage = volatility * latency_seconds.sqrt();
        expected_slippage * mid_price
    }

    /// Whether the half-spread covers latency cost with a 10% margin
    #[inline]
    pub fn should_quote(&self, expected_spread: f64, latency_cost: f64) -> bool {
        expected_spread / 2.0 > QUOTE_PROFIT_MARGIN * latency_cost
    }

    /// tanh skew in [-1, 1]; positive when long
    #[inline]
    fn inventory_skew(&self, inventory: f64) -> f64 {
        (2.0 * inventory / self.max_inventory).tanh()
    }

    /// Base size, scaled up to 2x on the side that reduces inventory
    #[inline]
    fn quote_size(&self, side: Side, inventory: f64) -> f64 {
        let reduces = match side {
            Side::Sell => inventory > 0.0,
            Side::Buy => inventory < 0.0,
        };
        if reduces {
            let ratio = (inventory.abs() / self.max_inventory).min(1.0);
            self.base_size * (1.0 + ratio)
        } else {
            self.base_size
        }
    }

    #[inline(always)]
    fn round_to_tick(&self, price: f64) -> f64 {
        (price / self.tick_size).round() * self.tick_size
    }

    /// Replace the annualised volatility; non-positive values are ignored
    pub fn set_volatility(&mut self, sigma: f64) {
        if !(sigma.is_finite() && sigma > 0.0) {
            tracing::warn!(target: "engine", sigma, "ignoring non-positive volatility");
            return;
        }
        self.sigma = sigma;
        self.sigma_sq_per_second = per_second_variance(sigma);
    }

    /// Replace the risk aversion; non-positive values are ignored
    pub fn set_risk_aversion(&mut self, gamma: f64) {
        if !(gamma.is_finite() && gamma > 0.0) {
            tracing::warn!(target: "engine", gamma, "ignoring non-positive risk aversion");
            return;
        }
        self.gamma = gamma;
    }

    pub fn risk_aversion(&self) -> f64 {
        self.gamma
    }

    pub fn volatility(&self) -> f64 {
        self.sigma
    }

    pub fn time_horizon(&self) -> f64 {
        self.time_horizon
    }

    pub fn tick_size(&self) -> f64 {
        self.tick_size
    }

    pub fn system_latency_ns(&self) -> u64 {
        self.system_latency_ns
    }
}

fn per_second_variance(annualised_sigma: f64) -> f64 {
    let per_second = annualised_sigma / TRADING_SECONDS_PER_YEAR.sqrt();
    per_second * per_second
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidParameter(format!(
            "quoting {} must be positive, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn model() -> QuoteModel {
        QuoteModel::new(&QuotingConfig::default()).unwrap()
    }

    #[test]
    fn test_quote_spread_at_least_two_ticks() {
        let model = QuoteModel::new(&QuotingConfig {
            gamma: 0.1,
            sigma: 0.2,
            tick_size: 0.01,
            ..QuotingConfig::default()
        })
        .unwrap();

        let q = model.calculate_quotes(100.0, 0.0, 300.0, 0.0);
        assert!(q.bid_price < q.ask_price);
        assert!(q.spread >= 0.02 - 1e-9);
        assert_eq!(q.mid_price, 100.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        let model = model();
        let q = model.calculate_quotes(0.0, 0.0, 300.0, 0.0);
        assert_eq!((q.bid_price, q.ask_price, q.spread), (0.0, 0.0, 0.0));

        let q = model.calculate_quotes(100.0, 0.0, 0.0, 0.0);
        assert_eq!((q.bid_price, q.ask_price, q.spread), (0.0, 0.0, 0.0));

        let q = model.calculate_quotes(100.0, 0.0, -5.0, 0.0);
        assert!(!q.is_valid());
    }

    #[test]
    fn test_rejects_non_positive_parameters() {
        for bad in [
            QuotingConfig { gamma: 0.0, ..QuotingConfig::default() },
            QuotingConfig { sigma: -1.0, ..QuotingConfig::default() },
            QuotingConfig { k: 0.0, ..QuotingConfig::default() },
            QuotingConfig { tick_size: 0.0, ..QuotingConfig::default() },
        ] {
            assert!(matches!(
                QuoteModel::new(&bad),
                Err(CoreError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_latency_cost_widens_spread() {
        let model = model();
        let base = model.calculate_quotes(100.0, 0.0, 300.0, 0.0);
        let taxed = model.calculate_quotes(100.0, 0.0, 300.0, 5.0);
        assert!(taxed.spread > base.spread);
        // Half-spread at least covers the latency cost
        assert!(taxed.ask_price - 100.0 >= 5.0 - 0.01);
        assert!(100.0 - taxed.bid_price >= 5.0 - 0.01);
    }

    #[test]
    fn test_small_latency_cost_leaves_spread() {
        let model = model();
        let base = model.calculate_quotes(100.0, 0.0, 300.0, 0.0);
        let taxed = model.calculate_quotes(100.0, 0.0, 300.0, 1e-6);
        assert_eq!(base.spread, taxed.spread);
    }

    #[test]
    fn test_long_inventory_skew() {
        let model = model();
        let flat = model.calculate_quotes(100.0, 0.0, 300.0, 0.0);
        let long = model.calculate_quotes(100.0, 500.0, 300.0, 0.0);

        // Positive skew: bid side gets (1 - skew) of the half-spread
        assert!(long.mid_price - long.bid_price < long.ask_price - long.mid_price);
        assert!(long.ask_size > long.bid_size);
        assert_eq!(long.bid_size, 100.0);
        assert_eq!(flat.bid_size, flat.ask_size);
    }

    #[test]
    fn test_size_capped_at_double() {
        let model = model();
        let q = model.calculate_quotes(100.0, -50_000.0, 300.0, 0.0);
        assert_eq!(q.bid_size, 200.0);
        assert_eq!(q.ask_size, 100.0);
    }

    #[test]
    fn test_quotes_on_tick_grid() {
        let model = model();
        let q = model.calculate_quotes(101.237, 123.0, 300.0, 0.0);
        let on_grid = |p: f64| ((p / 0.01).round() * 0.01 - p).abs() < 1e-9;
        assert!(on_grid(q.bid_price));
        assert!(on_grid(q.ask_price));
    }

    #[test]
    fn test_latency_cost_formula() {
        let model = QuoteModel::new(&QuotingConfig {
            system_latency_ns: 1_000_000, // 1ms
            ..QuotingConfig::default()
        })
        .unwrap();
        let cost = model.calculate_latency_cost(0.5, 100.0);
        assert!((cost - 0.5 * 0.001f64.sqrt() * 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_should_quote_margin() {
        let model = model();
        assert!(model.should_quote(2.3, 1.0));
        assert!(!model.should_quote(2.2, 1.0));
        assert!(!model.should_quote(2.0, 1.0));
    }

    #[test]
    fn test_setters_ignore_invalid() {
        let mut model = model();
        model.set_volatility(-1.0);
        model.set_risk_aversion(0.0);
        assert_eq!(model.volatility(), 0.2);
        assert_eq!(model.risk_aversion(), 0.1);

        model.set_volatility(0.4);
        assert_eq!(model.volatility(), 0.4);
    }

    proptest! {
        #[test]
        fn prop_bid_below_ask(
            mid in 0.01f64..1_000_000.0,
            inventory in -5_000.0f64..5_000.0,
            tau in 0.001f64..86_400.0,
            latency_cost in 0.0f64..1_000.0,
        ) {
            let q = model().calculate_quotes(mid, inventory, tau, latency_cost);
            prop_assert!(q.bid_price < q.ask_price);
            prop_assert!(q.spread > 0.0);
        }
    }
}
