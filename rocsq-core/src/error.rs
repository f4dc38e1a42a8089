//! Input validation errors raised by the scorer and price series constructors.

use chrono::NaiveDate;
use thiserror::Error;

/// Malformed price data.
///
/// Raised by `PriceSeries::new` and the trend scorer, and propagated unmodified
/// through the trade simulator. Never retried: it signals a data-quality
/// problem upstream of the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInputError {
    #[error("need at least {required} prices to score, got {len}")]
    TooFewPoints { len: usize, required: usize },

    #[error("price at index {index} is not positive: {price}")]
    NonPositivePrice { index: usize, price: f64 },

    #[error("price at index {index} is not finite")]
    NonFinitePrice { index: usize },

    #[error("dates must be strictly increasing: {date} at index {index} follows {previous}")]
    UnorderedDates {
        index: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("lookback window and holding period must be >= 1 (got lookback={lookback}, holding={holding})")]
    ZeroWindow { lookback: usize, holding: usize },
}
