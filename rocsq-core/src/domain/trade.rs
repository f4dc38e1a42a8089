//! TradeEvent — one long round trip opened by the simulator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single entry/exit pair for one instrument.
///
/// Field order is the serialized column order: the leading six fields are the
/// external record layout, the rest are traceability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub instrument: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: Option<NaiveDate>,
    pub exit_price: Option<f64>,
    /// Bars actually held (equal to the holding period unless truncated).
    pub holding_days: usize,

    pub entry_bar: usize,
    pub exit_bar: Option<usize>,
    /// Score that triggered the entry.
    pub entry_score: f64,
    /// Closed by the end of the series before the holding period elapsed.
    pub truncated: bool,
}

impl TradeEvent {
    pub fn open(
        instrument: impl Into<String>,
        entry_bar: usize,
        entry_date: NaiveDate,
        entry_price: f64,
        entry_score: f64,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            entry_date,
            entry_price,
            exit_date: None,
            exit_price: None,
            holding_days: 0,
            entry_bar,
            exit_bar: None,
            entry_score,
            truncated: false,
        }
    }

    /// Close the trade. `truncated` marks an end-of-series forced close.
    pub fn close(&mut self, exit_bar: usize, exit_date: NaiveDate, exit_price: f64, truncated: bool) {
        self.exit_bar = Some(exit_bar);
        self.exit_date = Some(exit_date);
        self.exit_price = Some(exit_price);
        self.holding_days = exit_bar.saturating_sub(self.entry_bar);
        self.truncated = truncated;
    }

    pub fn is_closed(&self) -> bool {
        self.exit_price.is_some()
    }

    /// Price return of the round trip, 0.0 while open.
    pub fn return_pct(&self) -> f64 {
        match self.exit_price {
            Some(exit) if self.entry_price > 0.0 => (exit - self.entry_price) / self.entry_price,
            _ => 0.0,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.return_pct() > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade() -> TradeEvent {
        let mut trade = TradeEvent::open(
            "SPY",
            4,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            100.0,
            0.002,
        );
        trade.close(9, NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(), 110.0, false);
        trade
    }

    #[test]
    fn open_trade_has_no_exit() {
        let trade = TradeEvent::open(
            "SPY",
            0,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            50.0,
            0.01,
        );
        assert!(!trade.is_closed());
        assert_eq!(trade.return_pct(), 0.0);
        assert_eq!(trade.holding_days, 0);
    }

    #[test]
    fn close_sets_holding_days() {
        let trade = sample_trade();
        assert!(trade.is_closed());
        assert_eq!(trade.holding_days, 5);
        assert_eq!(trade.exit_bar, Some(9));
        assert!(!trade.truncated);
    }

    #[test]
    fn return_pct_calculation() {
        let trade = sample_trade();
        assert!((trade.return_pct() - 0.1).abs() < 1e-12);
        assert!(trade.is_winner());
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let trade = sample_trade();
        let json = serde_json::to_string(&trade).unwrap();
        let deser: TradeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deser);
    }
}
