//! Trade simulator — per-instrument Flat/Held state machine.
//!
//! Walks a price series bar by bar starting at `lookback_window`, the first bar
//! with a full trailing window. Transitions:
//!
//! - `Flat → Held`: trailing score > entry threshold and at least one bar remains
//!   after the current one. Entry at the current close (no look-ahead).
//! - `Held → Flat`: `holding_period` bars after entry, exit at that close. The
//!   score is not consulted while held.
//! - `Held → Flat (truncated)`: the series ends first; exit at the last close.
//!
//! An exit and a new entry may happen on the same bar: the exit is applied
//! first, then the freed instrument is re-scored.

use tracing::trace;

use crate::domain::{ParameterCombination, PriceSeries, TradeEvent};
use crate::error::InvalidInputError;
use crate::scoring::{score_trailing, validate_closes, ScoreResult};

/// Default entry guard: any positive trend quality.
pub const DEFAULT_ENTRY_THRESHOLD: f64 = 0.0;

/// Position state for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionState {
    Flat,
    Held {
        trade: TradeEvent,
        /// Bar on which the holding period completes.
        exit_bar: usize,
    },
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Flat)
    }
}

/// What happened on a single bar.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// No state change.
    Stay,
    /// Flat → Held.
    Enter(ScoreResult),
    /// Held → Flat after the full holding period.
    Exit(TradeEvent),
    /// Held → Flat, then Flat → Held on the same bar.
    ExitAndEnter(TradeEvent, ScoreResult),
}

/// Fixed-holding-period momentum simulator for a single instrument.
#[derive(Debug, Clone)]
pub struct TradeSimulator {
    params: ParameterCombination,
    entry_threshold: f64,
}

impl TradeSimulator {
    pub fn new(params: ParameterCombination) -> Self {
        Self {
            params,
            entry_threshold: DEFAULT_ENTRY_THRESHOLD,
        }
    }

    /// Entry requires `score > entry_threshold`.
    pub fn with_entry_threshold(mut self, entry_threshold: f64) -> Self {
        self.entry_threshold = entry_threshold;
        self
    }

    pub fn params(&self) -> ParameterCombination {
        self.params
    }

    pub fn entry_threshold(&self) -> f64 {
        self.entry_threshold
    }

    /// Run the state machine over a full series.
    ///
    /// Returns every trade, all closed, in entry order. A series without a full
    /// trailing window yields no trades. Unusable closes are reported as
    /// `InvalidInputError`.
    pub fn simulate(&self, series: &PriceSeries) -> Result<Vec<TradeEvent>, InvalidInputError> {
        let lookback = self.params.lookback_window;
        let holding = self.params.holding_period;
        if lookback == 0 || holding == 0 {
            return Err(InvalidInputError::ZeroWindow { lookback, holding });
        }
        if !series.supports_lookback(lookback) {
            return Ok(Vec::new());
        }

        let closes = series.closes();
        validate_closes(&closes)?;

        let mut state = PositionState::Flat;
        let mut trades = Vec::new();

        for bar in lookback..closes.len() {
            match self.step(&mut state, series, &closes, bar)? {
                Transition::Stay | Transition::Enter(_) => {}
                Transition::Exit(trade) | Transition::ExitAndEnter(trade, _) => trades.push(trade),
            }
        }

        if let Some(trade) = self.finish(state, series) {
            trades.push(trade);
        }

        trace!(
            symbol = series.symbol(),
            trades = trades.len(),
            params = %self.params,
            "simulation complete"
        );
        Ok(trades)
    }

    /// Apply one bar to the state machine. A bar past the end of the series
    /// leaves the state untouched.
    pub fn step(
        &self,
        state: &mut PositionState,
        series: &PriceSeries,
        closes: &[f64],
        bar: usize,
    ) -> Result<Transition, InvalidInputError> {
        let Some(point) = series.points().get(bar).copied() else {
            return Ok(Transition::Stay);
        };
        let mut exited = None;

        let due = matches!(state, PositionState::Held { exit_bar, .. } if bar >= *exit_bar);
        if due {
            if let PositionState::Held { mut trade, .. } =
                std::mem::replace(state, PositionState::Flat)
            {
                trade.close(bar, point.date, point.close, false);
                exited = Some(trade);
            }
        }

        let mut entered = None;
        if state.is_flat() && self.can_enter(bar, closes.len()) {
            let result = score_trailing(closes, bar, self.params.lookback_window)?;
            if result.score > self.entry_threshold {
                let trade = TradeEvent::open(
                    series.symbol(),
                    bar,
                    point.date,
                    point.close,
                    result.score,
                );
                *state = PositionState::Held {
                    trade,
                    exit_bar: bar + self.params.holding_period,
                };
                entered = Some(result);
            }
        }

        Ok(match (exited, entered) {
            (None, None) => Transition::Stay,
            (None, Some(r)) => Transition::Enter(r),
            (Some(t), None) => Transition::Exit(t),
            (Some(t), Some(r)) => Transition::ExitAndEnter(t, r),
        })
    }

    /// End-of-series transition: force-close a held position at the last close.
    /// An empty series has no close to exit at and yields `None`.
    pub fn finish(&self, state: PositionState, series: &PriceSeries) -> Option<TradeEvent> {
        match state {
            PositionState::Flat => None,
            PositionState::Held { mut trade, .. } => {
                let point = series.points().last().copied()?;
                trade.close(series.len() - 1, point.date, point.close, true);
                Some(trade)
            }
        }
    }

    /// Entries need a full trailing window and a later bar to hold into.
    fn can_enter(&self, bar: usize, len: usize) -> bool {
        bar >= self.params.lookback_window && bar + 1 < len
    }
}
