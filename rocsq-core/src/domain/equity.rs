//! Equity curve points.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Portfolio value after a realized close (or the opening capital).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub portfolio_value: f64,
}

impl EquityPoint {
    pub fn new(date: NaiveDate, portfolio_value: f64) -> Self {
        Self {
            date,
            portfolio_value,
        }
    }
}

/// Strip dates for the metric functions, which operate on plain values.
pub fn curve_values(curve: &[EquityPoint]) -> Vec<f64> {
    curve.iter().map(|p| p.portfolio_value).collect()
}
