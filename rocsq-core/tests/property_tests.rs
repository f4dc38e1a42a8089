//! Property tests for scorer and simulator invariants.
//!
//! 1. Scale invariance: multiplying every close by k > 0 leaves the score unchanged
//! 2. Strictly decreasing closes always score negative
//! 3. Log-linear closes fit perfectly
//! 4. Fit quality is always in [0, 1]
//! 5. Simulated trades never overlap, are all closed and hold at most `holding_period`

use chrono::NaiveDate;
use proptest::prelude::*;
use rocsq_core::scoring::score;
use rocsq_core::{ParameterCombination, PriceSeries, TradeSimulator};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_closes(min: usize, max: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..500.0_f64, min..max)
}

fn arb_returns(min: usize, max: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.05..0.05_f64, min..max)
}

fn walk(returns: &[f64]) -> Vec<f64> {
    let mut price = 100.0;
    let mut closes = vec![price];
    for r in returns {
        price *= 1.0 + r;
        closes.push(price);
    }
    closes
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

// ── 1. Scale invariance ──────────────────────────────────────────────

proptest! {
    #[test]
    fn score_is_scale_invariant(closes in arb_closes(2, 80), k in 0.01..1000.0_f64) {
        let base = score(&closes).unwrap();
        let scaled: Vec<f64> = closes.iter().map(|c| c * k).collect();
        let other = score(&scaled).unwrap();
        prop_assert!((base.score - other.score).abs() < 1e-9);
        prop_assert!((base.slope - other.slope).abs() < 1e-9);
    }
}

// ── 2. Decreasing series ─────────────────────────────────────────────

proptest! {
    #[test]
    fn strictly_decreasing_scores_negative(drops in prop::collection::vec(0.001..0.05_f64, 1..60)) {
        let mut price = 100.0;
        let mut closes = vec![price];
        for d in &drops {
            price *= 1.0 - d;
            closes.push(price);
        }
        let r = score(&closes).unwrap();
        prop_assert!(r.slope < 0.0);
        prop_assert!(r.score < 0.0);
    }
}

// ── 3. Log-linear fit ────────────────────────────────────────────────

proptest! {
    #[test]
    fn log_linear_fits_perfectly(n in 3usize..200, growth in 0.0005..0.05_f64, start_price in 1.0..1000.0_f64) {
        let closes: Vec<f64> = (0..n).map(|i| start_price * (growth * i as f64).exp()).collect();
        let r = score(&closes).unwrap();
        prop_assert!((r.fit_quality - 1.0).abs() < 1e-8);
        prop_assert!((r.slope - growth).abs() < 1e-9);
    }
}

// ── 4. Fit quality bounds ────────────────────────────────────────────

proptest! {
    #[test]
    fn fit_quality_is_bounded(closes in arb_closes(2, 120)) {
        let r = score(&closes).unwrap();
        prop_assert!((0.0..=1.0).contains(&r.fit_quality));
        prop_assert!(r.score.is_finite());
        prop_assert!(r.score.abs() <= r.slope.abs() + 1e-15);
    }
}

// ── 5. Simulator invariants ──────────────────────────────────────────

proptest! {
    #[test]
    fn trades_never_overlap(
        returns in arb_returns(5, 250),
        lookback in 1usize..30,
        holding in 1usize..20,
    ) {
        let closes = walk(&returns);
        let series = PriceSeries::from_closes("PROP", start(), &closes);
        let params = ParameterCombination::new(lookback, holding).unwrap();
        let trades = TradeSimulator::new(params).simulate(&series).unwrap();

        for trade in &trades {
            prop_assert!(trade.is_closed());
            prop_assert!(trade.entry_bar >= lookback);
            prop_assert!(trade.holding_days <= holding);
            prop_assert!(trade.holding_days >= 1);
            prop_assert_eq!(trade.entry_price, closes[trade.entry_bar]);
            prop_assert_eq!(trade.exit_price, Some(closes[trade.exit_bar.unwrap()]));
            if !trade.truncated {
                prop_assert_eq!(trade.holding_days, holding);
            } else {
                prop_assert_eq!(trade.exit_bar, Some(closes.len() - 1));
            }
        }
        for pair in trades.windows(2) {
            prop_assert!(pair[1].entry_bar >= pair[0].exit_bar.unwrap());
        }
    }
}
