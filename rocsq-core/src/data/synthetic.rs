//! Synthetic price histories for development and tests.
//!
//! Produces a trending random walk per symbol: alternating up/down regimes of
//! random length with small daily noise, so the momentum signal has something
//! to find. Weekends are skipped. The RNG is seeded from a BLAKE3 hash of the
//! symbol, so the same symbol and date range always give the same series.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::universe::Universe;
use crate::domain::{PricePoint, PriceSeries};

/// Starting close for every synthetic series.
pub const SYNTHETIC_START_PRICE: f64 = 100.0;

/// Generate a deterministic synthetic series between `start` and `end` inclusive.
pub fn generate_synthetic_series(symbol: &str, start: NaiveDate, end: NaiveDate) -> PriceSeries {
    let seed_bytes = blake3::hash(symbol.as_bytes());
    let seed: [u8; 32] = *seed_bytes.as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut points = Vec::new();
    let mut price = SYNTHETIC_START_PRICE;
    let mut drift = 0.0_f64;
    let mut regime_left = 0_u32;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == Weekday::Sat || weekday == Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        if regime_left == 0 {
            drift = rng.gen_range(-0.004..0.006);
            regime_left = rng.gen_range(10..40);
        }
        regime_left -= 1;

        let noise: f64 = rng.gen_range(-0.02..0.02);
        price *= 1.0 + drift + noise;
        points.push(PricePoint::new(current, price));

        current += chrono::Duration::days(1);
    }

    // Dates are generated strictly increasing.
    PriceSeries::from_points_unchecked(symbol, points)
}

/// Synthetic universe over a shared date range.
pub fn synthetic_universe(symbols: &[String], start: NaiveDate, end: NaiveDate) -> Universe {
    symbols
        .iter()
        .map(|s| generate_synthetic_series(s, start, end))
        .collect()
}
