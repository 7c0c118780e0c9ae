//! Latency budget derivation
//!
//! Converts the quoting model's edge into the maximum network round trip a
//! venue may exhibit while the trade stays profitable after latency cost.
//!
//! ```text
//! urgency = regime_multiplier * (1 + |position| / position_scale)
//! budget  = ((profit - latency_cost) / volatility) * (k_unit / urgency)
//! ```
//!
//! The raw budget is clamped to `[min_budget_us, max_budget_us]`, replaced by
//! the floor when the edge does not clear latency cost, and finally scaled by
//! the safety margin. All budgets are in microseconds.

use super::quote::QuoteModel;
use crate::core::MarketRegime;
use crate::infrastructure::config::{BudgetConfig, Config};
use crate::Result;

/// Edge must exceed latency cost by this factor to earn more than the floor
const PROFIT_MARGIN: f64 = 1.1;

/// Pure budget function over a fixed quoting model
#[derive(Debug, Clone)]
pub struct LatencyBudgetCalculator {
    model: QuoteModel,
    config: BudgetConfig,
    safety_margin: f64,
}

impl LatencyBudgetCalculator {
    pub fn new(model: QuoteModel, config: BudgetConfig, safety_margin: f64) -> Self {
        Self {
            model,
            config,
            safety_margin,
        }
    }

    /// Build the quoting model and calculator from a validated config
    pub fn from_config(config: &Config) -> Result<Self> {
        let model = QuoteModel::new(&config.quoting)?;
        Ok(Self::new(
            model,
            config.budget,
            config.routing.safety_margin,
        ))
    }

    /// Execution urgency for a regime and open position
    #[inline]
    pub fn urgency(&self, regime: MarketRegime, position: f64) -> f64 {
        let position_factor = if self.config.position_scale > 0.0 {
            position.abs() / self.config.position_scale
        } else {
            0.0
        };
        regime.urgency_multiplier() * (1.0 + position_factor)
    }

    /// Maximum tolerable round trip in microseconds
    ///
    /// Deterministic given its inputs. Never returns less than
    /// `min_budget_us * safety_margin` or more than `max_budget_us * safety_margin`.
    pub fn calculate_latency_budget(
        &self,
        mid_price: f64,
        volatility: f64,
        position: f64,
        order_size: f64,
        regime: MarketRegime,
    ) -> f64 {
        let floor = self.config.min_budget_us * self.safety_margin;
        if !(volatility.is_finite() && volatility > 0.0) {
            return floor;
        }

        let quotes =
            self.model
                .calculate_quotes(mid_price, position, self.config.quote_horizon_secs, 0.0);
        let latency_cost = self.model.calculate_latency_cost(volatility, mid_price);

        // Buying lifts the ask side of our own quote
        let expected_profit = if order_size > 0.0 {
            quotes.ask_half_spread()
        } else {
            quotes.bid_half_spread()
        };

        let urgency = self.urgency(regime, position);
        let raw = if expected_profit > PROFIT_MARGIN * latency_cost {
            let budget =
                ((expected_profit - latency_cost) / volatility) * (self.config.k_unit / urgency);
            budget.clamp(self.config.min_budget_us, self.config.max_budget_us)
        } else {
            self.config.min_budget_us
        };

        raw * self.safety_margin
    }

    pub fn quote_model(&self) -> &QuoteModel {
        &self.model
    }

    pub fn safety_margin(&self) -> f64 {
        self.safety_margin
    }

    pub fn min_budget_us(&self) -> f64 {
        self.config.min_budget_us
    }

    pub fn max_budget_us(&self) -> f64 {
        self.config.max_budget_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn calculator() -> LatencyBudgetCalculator {
        LatencyBudgetCalculator::from_config(&Config::default()).unwrap()
    }

    #[test]
    fn test_urgency_table() {
        let calc = calculator();
        assert_eq!(calc.urgency(MarketRegime::Normal, 0.0), 1.0);
        assert_eq!(calc.urgency(MarketRegime::Elevated, 0.0), 1.5);
        assert_eq!(calc.urgency(MarketRegime::Stress, 0.0), 3.0);
        assert_eq!(calc.urgency(MarketRegime::Halted, 0.0), 10.0);
        assert!((calc.urgency(MarketRegime::Normal, -500.0) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_budget_within_window() {
        let calc = calculator();
        let budget = calc.calculate_latency_budget(100.0, 0.02, 0.0, 10.0, MarketRegime::Normal);

        assert!(budget >= 100.0 * 0.8);
        assert!(budget <= 10_000.0 * 0.8);
    }

    #[test]
    fn test_calm_market_clamped_to_ceiling() {
        let calc = calculator();
        // Raw budget far above the 10ms cap
        let budget = calc.calculate_latency_budget(100.0, 0.0005, 0.0, 10.0, MarketRegime::Normal);
        assert_eq!(budget, calc.max_budget_us() * calc.safety_margin());
        assert_eq!(budget, 10_000.0 * 0.8);
    }

    #[test]
    fn test_invalid_volatility_uses_floor() {
        let calc = calculator();
        let floor = 100.0 * 0.8;
        for vol in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let budget = calc.calculate_latency_budget(100.0, vol, 0.0, 10.0, MarketRegime::Normal);
            assert_eq!(budget, floor);
        }
    }

    #[test]
    fn test_degenerate_quote_uses_floor() {
        let calc = calculator();
        // No edge at a non-positive mid
        let budget = calc.calculate_latency_budget(0.0, 0.02, 0.0, 10.0, MarketRegime::Normal);
        assert_eq!(budget, 100.0 * 0.8);
    }

    #[test]
    fn test_halted_regime_shrinks_budget() {
        let calc = calculator();
        let normal = calc.calculate_latency_budget(100.0, 0.02, 0.0, 10.0, MarketRegime::Normal);
        let halted = calc.calculate_latency_budget(100.0, 0.02, 0.0, 10.0, MarketRegime::Halted);
        assert!(halted < normal);
    }

    #[test]
    fn test_budget_is_deterministic() {
        let calc = calculator();
        let a = calc.calculate_latency_budget(101.5, 0.03, 250.0, -5.0, MarketRegime::Stress);
        let b = calc.calculate_latency_budget(101.5, 0.03, 250.0, -5.0, MarketRegime::Stress);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    proptest! {
        #[test]
        fn prop_budget_monotone_in_urgency(
            mid in 10.0f64..1_000.0,
            vol in 0.0001f64..1.0,
            position in -2_000.0f64..2_000.0,
            size in 1.0f64..100.0,
        ) {
            let calc = calculator();
            let regimes = [
                MarketRegime::Normal,
                MarketRegime::Elevated,
                MarketRegime::Stress,
                MarketRegime::Halted,
            ];
            let floor = calc.min_budget_us() * calc.safety_margin();
            let ceiling = calc.max_budget_us() * calc.safety_margin();
            let mut previous = f64::INFINITY;
            for regime in regimes {
                let budget = calc.calculate_latency_budget(mid, vol, position, size, regime);
                prop_assert!(budget >= floor);
                prop_assert!(budget <= ceiling);
                prop_assert!(budget <= previous);
                // Strictly decreasing between the clamps
                if previous > floor && previous < ceiling {
                    prop_assert!(budget < previous || budget == floor);
                }
                previous = budget;
            }
        }
    }
}
