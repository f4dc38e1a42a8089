//! Shared capital pool: replays every instrument's trades against one cash balance.
//!
//! Runs after all per-instrument simulations have finished and is strictly
//! single-threaded. Trades become open/close events which are processed in
//! date order; on the same date closes come before opens, then instrument
//! order, so capital freed by an exit is available to an entry that day. A
//! trade that enters and exits on one date closes after that date's opens.
//! Trades dated to exit before they enter are ignored.
//!
//! Quantities are fractional (`allocation / entry_price`). Equity is valued at
//! cost: open positions count at their allocation until they are closed, so
//! the curve only moves when a trade realizes its P&L.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use rocsq_core::{EquityPoint, TradeEvent};

use crate::config::AllocationPolicy;

/// Allocations below this are rounding residue, not capital.
const MIN_ALLOCATION: f64 = 1e-6;

/// A trade that received capital, with its realized outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedTrade {
    pub trade: TradeEvent,
    pub allocation: f64,
    pub quantity: f64,
    pub pnl: f64,
}

impl RealizedTrade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Everything the replay produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolOutcome {
    pub equity_curve: Vec<EquityPoint>,
    /// Funded trades in exit order.
    pub realized: Vec<RealizedTrade>,
    pub final_value: f64,
    /// Entries dropped because no cash was free.
    pub skipped_entries: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    Close,
    Open,
    /// Exit of a trade opened the same date; runs after that date's opens.
    SameDayClose,
}

#[derive(Debug, Clone, Copy)]
struct Event<'a> {
    date: NaiveDate,
    kind: EventKind,
    trade_idx: usize,
    instrument: &'a str,
}

impl Event<'_> {
    fn order(&self, other: &Self) -> Ordering {
        self.date
            .cmp(&other.date)
            .then(self.kind.cmp(&other.kind))
            .then_with(|| self.instrument.cmp(other.instrument))
            .then(self.trade_idx.cmp(&other.trade_idx))
    }
}

/// Cash balance and open allocations for one run.
#[derive(Debug, Clone)]
pub struct CapitalPool {
    policy: AllocationPolicy,
    universe_size: usize,
    cash: f64,
    /// Cash plus open allocations at cost.
    equity: f64,
    open: BTreeMap<usize, f64>,
}

impl CapitalPool {
    pub fn new(initial_capital: f64, policy: AllocationPolicy, universe_size: usize) -> Self {
        Self {
            policy,
            universe_size,
            cash: initial_capital,
            equity: initial_capital,
            open: BTreeMap::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn open_positions(&self) -> usize {
        self.open.len()
    }

    /// Commit cash to trade `trade_idx`. Returns the allocation, or `None` if
    /// there was nothing to commit.
    pub fn open(&mut self, trade_idx: usize) -> Option<f64> {
        let allocation = self
            .policy
            .allocation(self.cash, self.equity, self.universe_size);
        if !(allocation.is_finite() && allocation > MIN_ALLOCATION) {
            return None;
        }
        self.cash -= allocation;
        self.open.insert(trade_idx, allocation);
        Some(allocation)
    }

    /// Realize trade `trade_idx` at `exit_price`. Returns `(allocation, pnl)`,
    /// or `None` if the trade was never funded.
    pub fn close(&mut self, trade_idx: usize, entry_price: f64, exit_price: f64) -> Option<(f64, f64)> {
        let allocation = self.open.remove(&trade_idx)?;
        let proceeds = allocation / entry_price * exit_price;
        let pnl = proceeds - allocation;
        self.cash += proceeds;
        self.equity += pnl;
        Some((allocation, pnl))
    }

    /// Replay a merged trade log. `start` dates the opening equity point.
    pub fn replay(
        mut self,
        trades: &[TradeEvent],
        start: Option<NaiveDate>,
    ) -> PoolOutcome {
        let mut events = Vec::with_capacity(trades.len() * 2);
        for (trade_idx, trade) in trades.iter().enumerate() {
            let Some(exit_date) = trade.exit_date else {
                trace!(instrument = %trade.instrument, "skipping unclosed trade");
                continue;
            };
            if exit_date < trade.entry_date {
                warn!(
                    instrument = %trade.instrument,
                    entry = %trade.entry_date,
                    exit = %exit_date,
                    "skipping trade that exits before it enters"
                );
                continue;
            }
            let close_kind = if exit_date == trade.entry_date {
                EventKind::SameDayClose
            } else {
                EventKind::Close
            };
            events.push(Event {
                date: trade.entry_date,
                kind: EventKind::Open,
                trade_idx,
                instrument: &trade.instrument,
            });
            events.push(Event {
                date: exit_date,
                kind: close_kind,
                trade_idx,
                instrument: &trade.instrument,
            });
        }
        events.sort_by(|a, b| a.order(b));

        let mut equity_curve = Vec::new();
        if let Some(start) = start {
            equity_curve.push(EquityPoint::new(start, self.equity));
        }
        let mut realized = Vec::new();
        let mut skipped_entries = 0;

        for event in events {
            let trade = &trades[event.trade_idx];
            match event.kind {
                EventKind::Open => {
                    if self.open(event.trade_idx).is_none() {
                        skipped_entries += 1;
                        warn!(
                            instrument = %trade.instrument,
                            date = %trade.entry_date,
                            cash = self.cash,
                            "no free cash, entry skipped"
                        );
                    }
                }
                EventKind::Close | EventKind::SameDayClose => {
                    let Some(exit_price) = trade.exit_price else {
                        continue;
                    };
                    let Some((allocation, pnl)) =
                        self.close(event.trade_idx, trade.entry_price, exit_price)
                    else {
                        continue;
                    };
                    realized.push(RealizedTrade {
                        trade: trade.clone(),
                        allocation,
                        quantity: allocation / trade.entry_price,
                        pnl,
                    });
                    push_point(&mut equity_curve, event.date, self.equity);
                }
            }
        }

        PoolOutcome {
            equity_curve,
            realized,
            final_value: self.equity,
            skipped_entries,
        }
    }
}

/// One point per date: later closes on the same date overwrite the value.
fn push_point(curve: &mut Vec<EquityPoint>, date: NaiveDate, value: f64) {
    match curve.last_mut() {
        Some(last) if last.date == date => last.portfolio_value = value,
        _ => curve.push(EquityPoint::new(date, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn trade(symbol: &str, entry: u32, entry_price: f64, exit: u32, exit_price: f64) -> TradeEvent {
        let mut t = TradeEvent::open(symbol, entry as usize, d(entry), entry_price, 0.01);
        t.close(exit as usize, d(exit), exit_price, false);
        t
    }

    #[test]
    fn no_trades_keeps_initial_capital() {
        let pool = CapitalPool::new(10_000.0, AllocationPolicy::EqualWeight, 2);
        let outcome = pool.replay(&[], Some(d(1)));
        assert_eq!(outcome.final_value, 10_000.0);
        assert_eq!(outcome.equity_curve, vec![EquityPoint::new(d(1), 10_000.0)]);
        assert!(outcome.realized.is_empty());
    }

    #[test]
    fn equal_weight_splits_capital() {
        let pool = CapitalPool::new(10_000.0, AllocationPolicy::EqualWeight, 2);
        let trades = vec![
            trade("AAA", 2, 100.0, 5, 110.0),
            trade("BBB", 2, 50.0, 6, 45.0),
        ];
        let outcome = pool.replay(&trades, Some(d(1)));

        assert_eq!(outcome.realized.len(), 2);
        assert_eq!(outcome.realized[0].allocation, 5_000.0);
        assert!((outcome.realized[0].pnl - 500.0).abs() < 1e-9);
        assert!((outcome.realized[1].pnl + 500.0).abs() < 1e-9);
        assert!((outcome.final_value - 10_000.0).abs() < 1e-9);

        let values: Vec<f64> = outcome.equity_curve.iter().map(|p| p.portfolio_value).collect();
        assert_eq!(values.len(), 3);
        assert!((values[1] - 10_500.0).abs() < 1e-9);
        assert!((values[2] - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn close_before_open_on_same_date() {
        // Single instrument universe: all equity goes to each trade in turn.
        let pool = CapitalPool::new(1_000.0, AllocationPolicy::EqualWeight, 1);
        let trades = vec![
            trade("AAA", 2, 100.0, 4, 120.0),
            trade("AAA", 4, 120.0, 6, 132.0),
        ];
        let outcome = pool.replay(&trades, Some(d(1)));
        assert_eq!(outcome.skipped_entries, 0);
        assert!((outcome.realized[1].allocation - 1_200.0).abs() < 1e-9);
        assert!((outcome.final_value - 1_320.0).abs() < 1e-9);
    }

    #[test]
    fn entry_without_cash_is_skipped() {
        // One instrument, universe of one: the first trade takes all cash, so a
        // second overlapping trade on another symbol cannot be funded.
        let pool = CapitalPool::new(1_000.0, AllocationPolicy::EqualWeight, 1);
        let trades = vec![
            trade("AAA", 2, 10.0, 8, 11.0),
            trade("BBB", 3, 10.0, 6, 20.0),
        ];
        let outcome = pool.replay(&trades, Some(d(1)));
        assert_eq!(outcome.skipped_entries, 1);
        assert_eq!(outcome.realized.len(), 1);
        assert_eq!(outcome.realized[0].trade.instrument, "AAA");
        assert!((outcome.final_value - 1_100.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_fraction_uses_free_cash() {
        let pool = CapitalPool::new(10_000.0, AllocationPolicy::FixedFraction { fraction: 0.5 }, 5);
        let trades = vec![
            trade("AAA", 2, 10.0, 8, 10.0),
            trade("BBB", 3, 10.0, 8, 10.0),
        ];
        let outcome = pool.replay(&trades, None);
        let allocations: Vec<f64> = outcome.realized.iter().map(|r| r.allocation).collect();
        assert_eq!(allocations, vec![5_000.0, 2_500.0]);
        assert!(outcome.equity_curve.len() == 1);
    }

    #[test]
    fn same_date_closes_collapse_to_one_point() {
        let pool = CapitalPool::new(10_000.0, AllocationPolicy::EqualWeight, 2);
        let trades = vec![
            trade("AAA", 2, 100.0, 5, 110.0),
            trade("BBB", 2, 100.0, 5, 110.0),
        ];
        let outcome = pool.replay(&trades, Some(d(1)));
        assert_eq!(outcome.equity_curve.len(), 2);
        assert!((outcome.equity_curve[1].portfolio_value - 11_000.0).abs() < 1e-9);
    }

    #[test]
    fn same_day_round_trip_returns_its_cash() {
        let pool = CapitalPool::new(1_000.0, AllocationPolicy::EqualWeight, 1);
        let mut intraday = TradeEvent::open("AAA", 2, d(2), 10.0, 0.01);
        intraday.close(2, d(2), 11.0, false);
        let trades = vec![intraday, trade("AAA", 3, 10.0, 5, 12.0)];
        let outcome = pool.replay(&trades, Some(d(1)));

        assert_eq!(outcome.skipped_entries, 0);
        assert_eq!(outcome.realized.len(), 2);
        assert!((outcome.realized[0].pnl - 100.0).abs() < 1e-9);
        assert!((outcome.realized[1].allocation - 1_100.0).abs() < 1e-9);
        assert!((outcome.final_value - 1_320.0).abs() < 1e-9);
    }

    #[test]
    fn exit_before_entry_is_ignored() {
        let pool = CapitalPool::new(1_000.0, AllocationPolicy::EqualWeight, 1);
        let mut backwards = TradeEvent::open("AAA", 5, d(5), 10.0, 0.01);
        backwards.close(3, d(3), 20.0, false);
        let trades = vec![backwards, trade("BBB", 6, 10.0, 8, 11.0)];
        let outcome = pool.replay(&trades, None);

        assert_eq!(outcome.skipped_entries, 0);
        assert_eq!(outcome.realized.len(), 1);
        assert_eq!(outcome.realized[0].trade.instrument, "BBB");
        assert!((outcome.final_value - 1_100.0).abs() < 1e-9);
    }

    #[test]
    fn cash_and_equity_accessors() {
        let mut pool = CapitalPool::new(1_000.0, AllocationPolicy::EqualWeight, 4);
        assert_eq!(pool.open(0), Some(250.0));
        assert_eq!(pool.cash(), 750.0);
        assert_eq!(pool.equity(), 1_000.0);
        assert_eq!(pool.open_positions(), 1);
        assert_eq!(pool.close(0, 10.0, 12.0), Some((250.0, 50.0)));
        assert_eq!(pool.close(0, 10.0, 12.0), None);
        assert_eq!(pool.equity(), 1_050.0);
    }
}
