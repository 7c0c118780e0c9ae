//! Hawkes order-flow intensity estimator
//!
//! Exponential-kernel Hawkes process kept as two decaying accumulators, so
//! each update is O(1) with no event history:
//!
//! ```text
//! S_i(t)   = S_i(t_prev) * exp(-beta * dt) + 1{event on side i}
//! lambda_b = mu_b + alpha_self * beta * S_b + alpha_cross * beta * S_s
//! lambda_s = mu_s + alpha_self * beta * S_s + alpha_cross * beta * S_b
//! ```

use crate::core::{elapsed_secs, Side, TradeEvent, NANOS_PER_SEC};
use crate::infrastructure::config::HawkesConfig;

/// Smallest decay rate accepted; keeps exp() and divisions finite
pub const MIN_BETA: f64 = 1e-9;

/// Below this total intensity the imbalance is reported as zero
const IMBALANCE_EPSILON: f64 = 1e-10;

/// Estimator state, exclusively owned by the estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityState {
    /// Decaying buy-event accumulator (always >= 0)
    pub state_buy: f64,
    /// Decaying sell-event accumulator (always >= 0)
    pub state_sell: f64,
    pub baseline_buy: f64,
    pub baseline_sell: f64,
    pub alpha_self: f64,
    pub alpha_cross: f64,
    /// Decay rate (1/s)
    pub beta: f64,
    /// Arrival time of the last processed event (ns)
    pub last_update_time: Option<u64>,
}

/// Online buy/sell intensity estimator
#[derive(Debug, Clone)]
pub struct IntensityEstimator {
    state: IntensityState,
    buy_intensity: f64,
    sell_intensity: f64,
    event_count: u64,
}

impl IntensityEstimator {
    /// Create estimator from configuration
    ///
    /// Non-positive `beta` is clamped to [`MIN_BETA`]; negative baselines and
    /// excitations are clamped to zero.
    pub fn new(config: &HawkesConfig) -> Self {
        let beta = if config.beta.is_finite() && config.beta >= MIN_BETA {
            config.beta
        } else {
            tracing::warn!(target: "engine", beta = config.beta, "hawkes beta clamped to {}", MIN_BETA);
            MIN_BETA
        };

        let state = IntensityState {
            state_buy: 0.0,
            state_sell: 0.0,
            baseline_buy: config.baseline_buy.max(0.0),
            baseline_sell: config.baseline_sell.max(0.0),
            alpha_self: config.alpha_self.max(0.0),
            alpha_cross: config.alpha_cross.max(0.0),
            beta,
            last_update_time: None,
        };

        Self {
            buy_intensity: state.baseline_buy,
            sell_intensity: state.baseline_sell,
            state,
            event_count: 0,
        }
    }

    /// Fold one trade event into the accumulators
    #[inline]
    pub fn update(&mut self, event: &TradeEvent) {
        let s = &mut self.state;

        let dt = match s.last_update_time {
            Some(last) => elapsed_secs(last, event.arrival_time),
            None => 0.0,
        };

        // Out-of-order arrival: no decay rather than exp(+beta*|dt|) growth
        let decay = if dt < 0.0 { 1.0 } else { (-s.beta * dt).exp() };

        s.state_buy *= decay;
        s.state_sell *= decay;
        match event.side {
            Side::Buy => s.state_buy += 1.0,
            Side::Sell => s.state_sell += 1.0,
        }
        s.last_update_time = Some(event.arrival_time);
        self.event_count += 1;

        let (buy, sell) = Self::intensities(s, s.state_buy, s.state_sell);
        self.buy_intensity = buy;
        self.sell_intensity = sell;
    }

    #[inline(always)]
    fn intensities(s: &IntensityState, state_buy: f64, state_sell: f64) -> (f64, f64) {
        let buy = s.baseline_buy
            + s.alpha_self * s.beta * state_buy
            + s.alpha_cross * s.beta * state_sell;
        let sell = s.baseline_sell
            + s.alpha_self * s.beta * state_sell
            + s.alpha_cross * s.beta * state_buy;
        (buy, sell)
    }

    /// Decayed (buy, sell) intensities `horizon_ns` after the last event
    #[inline]
    fn predict(&self, horizon_ns: u64) -> (f64, f64) {
        let s = &self.state;
        let decay = (-s.beta * (horizon_ns as f64 / NANOS_PER_SEC)).exp();
        Self::intensities(s, s.state_buy * decay, s.state_sell * decay)
    }

    /// Buy intensity `horizon_ns` after the last event; does not mutate state
    #[inline]
    pub fn predict_buy_intensity(&self, horizon_ns: u64) -> f64 {
        self.predict(horizon_ns).0
    }

    /// Sell intensity `horizon_ns` after the last event; does not mutate state
    #[inline]
    pub fn predict_sell_intensity(&self, horizon_ns: u64) -> f64 {
        self.predict(horizon_ns).1
    }

    /// (buy - sell) / (buy + sell), zero when both are negligible
    #[inline]
    pub fn get_intensity_imbalance(&self) -> f64 {
        let total = self.buy_intensity + self.sell_intensity;
        if total < IMBALANCE_EPSILON {
            return 0.0;
        }
        (self.buy_intensity - self.sell_intensity) / total
    }

    /// Zero both accumulators and restore baseline intensities
    pub fn reset(&mut self) {
        self.state.state_buy = 0.0;
        self.state.state_sell = 0.0;
        self.buy_intensity = self.state.baseline_buy;
        self.sell_intensity = self.state.baseline_sell;
        self.event_count = 0;
    }

    #[inline(always)]
    pub fn buy_intensity(&self) -> f64 {
        self.buy_intensity
    }

    #[inline(always)]
    pub fn sell_intensity(&self) -> f64 {
        self.sell_intensity
    }

    #[inline(always)]
    pub fn state(&self) -> IntensityState {
        self.state
    }

    /// Events processed since construction or the last reset
    #[inline(always)]
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    #[inline(always)]
    pub fn last_update_time(&self) -> Option<u64> {
        self.state.last_update_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ms;
    use proptest::prelude::*;

    fn scenario_config() -> HawkesConfig {
        HawkesConfig {
            baseline_buy: 10.0,
            baseline_sell: 10.0,
            alpha_self: 0.5,
            alpha_cross: 0.2,
            beta: 1e-3,
        }
    }

    fn buy(t: u64) -> TradeEvent {
        TradeEvent::new(t, Side::Buy, 1)
    }

    fn sell(t: u64) -> TradeEvent {
        TradeEvent::new(t, Side::Sell, 1)
    }

    #[test]
    fn test_single_buy_event() {
        let mut est = IntensityEstimator::new(&scenario_config());
        est.update(&buy(1_000_000_000));

        assert!((est.buy_intensity() - 10.0005).abs() < 1e-12);
        assert!((est.sell_intensity() - 10.0002).abs() < 1e-12);
        assert_eq!(est.event_count(), 1);
    }

    #[test]
    fn test_starts_at_baseline() {
        let est = IntensityEstimator::new(&scenario_config());
        assert_eq!(est.buy_intensity(), 10.0);
        assert_eq!(est.sell_intensity(), 10.0);
        assert_eq!(est.get_intensity_imbalance(), 0.0);
    }

    #[test]
    fn test_decay_between_events() {
        let config = HawkesConfig {
            beta: 1.0,
            ..scenario_config()
        };
        let mut est = IntensityEstimator::new(&config);
        est.update(&buy(ms(1_000)));
        est.update(&sell(ms(2_000)));

        let s = est.state();
        assert!((s.state_buy - (-1.0f64).exp()).abs() < 1e-12);
        assert_eq!(s.state_sell, 1.0);
    }

    #[test]
    fn test_event_at_time_zero_still_decays() {
        let config = HawkesConfig {
            beta: 1.0,
            ..scenario_config()
        };
        let mut est = IntensityEstimator::new(&config);
        assert_eq!(est.last_update_time(), None);

        est.update(&buy(0));
        assert_eq!(est.last_update_time(), Some(0));
        est.update(&sell(ms(1_000)));

        assert!((est.state().state_buy - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_order_does_not_amplify() {
        let config = HawkesConfig {
            beta: 1.0,
            ..scenario_config()
        };
        let mut est = IntensityEstimator::new(&config);
        est.update(&buy(ms(5_000)));
        est.update(&buy(ms(1_000)));

        // No decay applied: 1 + 1
        assert_eq!(est.state().state_buy, 2.0);
        assert_eq!(est.last_update_time(), Some(ms(1_000)));
    }

    #[test]
    fn test_beta_clamped() {
        let config = HawkesConfig {
            beta: 0.0,
            ..scenario_config()
        };
        let est = IntensityEstimator::new(&config);
        assert_eq!(est.state().beta, MIN_BETA);

        let config = HawkesConfig {
            beta: -5.0,
            ..scenario_config()
        };
        assert_eq!(IntensityEstimator::new(&config).state().beta, MIN_BETA);
    }

    #[test]
    fn test_predict_does_not_mutate() {
        let config = HawkesConfig {
            beta: 2.0,
            ..scenario_config()
        };
        let mut est = IntensityEstimator::new(&config);
        est.update(&buy(ms(1_000)));
        let before = est.state();
        let now_buy = est.buy_intensity();

        let later = est.predict_buy_intensity(ms(500));
        assert!(later < now_buy);
        assert!(later > config.baseline_buy);
        assert_eq!(est.predict_buy_intensity(0), now_buy);
        assert_eq!(est.state(), before);
        assert_eq!(est.buy_intensity(), now_buy);
    }

    #[test]
    fn test_prediction_converges_to_baseline() {
        let config = HawkesConfig {
            beta: 10.0,
            ..scenario_config()
        };
        let mut est = IntensityEstimator::new(&config);
        est.update(&sell(ms(1)));
        let far = est.predict_sell_intensity(ms(60_000));
        assert!((far - config.baseline_sell).abs() < 1e-9);
    }

    #[test]
    fn test_imbalance_sign() {
        let mut est = IntensityEstimator::new(&HawkesConfig {
            beta: 1.0,
            ..scenario_config()
        });
        for i in 1..=20 {
            est.update(&buy(ms(i)));
        }
        assert!(est.get_intensity_imbalance() > 0.0);
    }

    #[test]
    fn test_imbalance_zero_denominator() {
        let est = IntensityEstimator::new(&HawkesConfig {
            baseline_buy: 0.0,
            baseline_sell: 0.0,
            ..scenario_config()
        });
        assert_eq!(est.get_intensity_imbalance(), 0.0);
    }

    #[test]
    fn test_reset_restores_baseline() {
        let mut est = IntensityEstimator::new(&scenario_config());
        est.update(&buy(ms(1)));
        est.update(&sell(ms(2)));
        est.reset();

        assert_eq!(est.buy_intensity(), 10.0);
        assert_eq!(est.sell_intensity(), 10.0);
        assert_eq!(est.state().state_buy, 0.0);
        assert_eq!(est.state().state_sell, 0.0);
        assert_eq!(est.event_count(), 0);
    }

    fn event_strategy() -> impl Strategy<Value = Vec<(u64, bool)>> {
        prop::collection::vec((0u64..10_000_000_000, any::<bool>()), 1..200)
    }

    proptest! {
        #[test]
        fn prop_deterministic(events in event_strategy()) {
            let config = HawkesConfig { beta: 0.7, ..scenario_config() };
            let mut a = IntensityEstimator::new(&config);
            let mut b = IntensityEstimator::new(&config);
            for &(t, is_buy) in &events {
                let e = TradeEvent::new(t, if is_buy { Side::Buy } else { Side::Sell }, 7);
                a.update(&e);
                b.update(&e);
            }
            prop_assert_eq!(a.buy_intensity().to_bits(), b.buy_intensity().to_bits());
            prop_assert_eq!(a.sell_intensity().to_bits(), b.sell_intensity().to_bits());
        }

        #[test]
        fn prop_never_below_baseline(events in event_strategy(), beta in 1e-6f64..50.0) {
            let config = HawkesConfig { beta, ..scenario_config() };
            let mut est = IntensityEstimator::new(&config);
            for &(t, is_buy) in &events {
                est.update(&TradeEvent::new(t, if is_buy { Side::Buy } else { Side::Sell }, 1));
                let s = est.state();
                prop_assert!(s.state_buy >= 0.0 && s.state_sell >= 0.0);
                prop_assert!(est.buy_intensity() >= config.baseline_buy);
                prop_assert!(est.sell_intensity() >= config.baseline_sell);
                prop_assert!(est.buy_intensity().is_finite());
            }
        }
    }
}
