//! Trend quality ("ROC squared") — momentum weighted by smoothness.
//!
//! Fits an ordinary least-squares line to log closes against a 0-based bar index:
//!
//!   y[i] = ln(close[i]),  x[i] = i
//!   slope = Sxy / Sxx
//!   fit_quality = r² = Sxy² / (Sxx · Syy), clamped to [0, 1]
//!   score = slope · fit_quality
//!
//! Steep and smooth uptrends score high; noisy or flat series score near zero.
//! Sums are taken over mean-centred values so long windows stay stable.

use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;

/// Minimum number of closes for a regression.
pub const MIN_POINTS: usize = 2;

/// Relative tolerance below which the log series is treated as flat.
const FLAT_TOLERANCE: f64 = 1e-12;

/// Output of one scoring call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    /// Log-price slope per bar.
    pub slope: f64,
    /// Coefficient of determination of the fit, in [0, 1].
    pub fit_quality: f64,
}

impl ScoreResult {
    pub const FLAT: ScoreResult = ScoreResult {
        score: 0.0,
        slope: 0.0,
        fit_quality: 0.0,
    };
}

/// Score a window of closes.
///
/// Fails if there are fewer than two closes or any close is non-finite or
/// not strictly positive.
pub fn score(closes: &[f64]) -> Result<ScoreResult, InvalidInputError> {
    let n = closes.len();
    if n < MIN_POINTS {
        return Err(InvalidInputError::TooFewPoints {
            len: n,
            required: MIN_POINTS,
        });
    }
    validate_closes(closes)?;

    let logs: Vec<f64> = closes.iter().map(|p| p.ln()).collect();

    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = logs.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (i, &y) in logs.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    // Constant closes leave only rounding residue in Syy.
    let scale = y_mean.abs().max(1.0);
    if syy.sqrt() <= FLAT_TOLERANCE * scale * nf.sqrt() {
        return Ok(ScoreResult::FLAT);
    }

    let slope = sxy / sxx;
    let fit_quality = ((sxy * sxy) / (sxx * syy)).clamp(0.0, 1.0);

    Ok(ScoreResult {
        score: slope * fit_quality,
        slope,
        fit_quality,
    })
}

/// Check that every close can enter log space.
pub fn validate_closes(closes: &[f64]) -> Result<(), InvalidInputError> {
    for (index, &price) in closes.iter().enumerate() {
        if !price.is_finite() {
            return Err(InvalidInputError::NonFinitePrice { index });
        }
        if price <= 0.0 {
            return Err(InvalidInputError::NonPositivePrice { index, price });
        }
    }
    Ok(())
}

/// Score the trailing window `closes[end - lookback ..= end]`.
///
/// The window spans `lookback` bar-to-bar moves ending at (and including) bar
/// `end`, so it needs `end >= lookback`.
pub fn score_trailing(
    closes: &[f64],
    end: usize,
    lookback: usize,
) -> Result<ScoreResult, InvalidInputError> {
    if end >= closes.len() || end < lookback {
        return Err(InvalidInputError::TooFewPoints {
            len: end.min(closes.len().saturating_sub(1)) + 1,
            required: lookback + 1,
        });
    }
    score(&closes[end - lookback..=end])
}
