//! The set of instruments a backtest trades, keyed by symbol.
//!
//! Series are keyed by symbol in a `BTreeMap`, so iteration order is the
//! symbol order and every downstream reduction is deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::PriceSeries;

/// Read-only price histories keyed by instrument identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Universe {
    series: BTreeMap<String, PriceSeries>,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a series under its own symbol. Returns the replaced series, if any.
    pub fn insert(&mut self, series: PriceSeries) -> Option<PriceSeries> {
        self.series.insert(series.symbol().to_string(), series)
    }

    pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series.get(symbol)
    }

    /// Symbols in sorted order.
    pub fn symbols(&self) -> Vec<&str> {
        self.series.keys().map(|s| s.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceSeries> {
        self.series.values()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Total number of price points across all instruments.
    pub fn point_count(&self) -> usize {
        self.series.values().map(|s| s.len()).sum()
    }
}

impl FromIterator<PriceSeries> for Universe {
    fn from_iter<I: IntoIterator<Item = PriceSeries>>(iter: I) -> Self {
        let mut universe = Universe::new();
        for series in iter {
            universe.insert(series);
        }
        universe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(symbol: &str, n: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        PriceSeries::from_closes(symbol, start, &closes)
    }

    #[test]
    fn symbols_are_sorted() {
        let universe: Universe = vec![series("NVDA", 3), series("AAPL", 3), series("MSFT", 3)]
            .into_iter()
            .collect();
        assert_eq!(universe.symbols(), vec!["AAPL", "MSFT", "NVDA"]);
        assert_eq!(universe.len(), 3);
        assert_eq!(universe.point_count(), 9);
    }

    #[test]
    fn insert_replaces_same_symbol() {
        let mut universe = Universe::new();
        assert!(universe.insert(series("SPY", 3)).is_none());
        let old = universe.insert(series("SPY", 5)).unwrap();
        assert_eq!(old.len(), 3);
        assert_eq!(universe.get("SPY").unwrap().len(), 5);
    }

    #[test]
    fn empty_universe() {
        let universe = Universe::new();
        assert!(universe.is_empty());
        assert!(universe.get("SPY").is_none());
    }
}
