//! Backtest runner — wires together simulation, the capital pool and metrics.
//!
//! One run is one `ParameterCombination` over a whole universe:
//! 1. Each instrument is simulated independently (in parallel by default).
//! 2. Per-instrument trade lists are merged by entry date, then instrument.
//! 3. The merged log is replayed against a single `CapitalPool`.
//! 4. Metrics are computed from the resulting equity curve.
//!
//! An instrument whose data fails validation contributes no trades and takes no
//! share of capital; the run carries on and records it in
//! `RunResult::failed_instruments`.

use rayon::prelude::*;
use tracing::{debug, warn};

use rocsq_core::{
    DatasetHash, InvalidInputError, ParameterCombination, PriceSeries, RunId, TradeEvent,
    TradeSimulator, Universe,
};

use crate::config::{BacktestConfig, ConfigError};
use crate::metrics::PerformanceMetrics;
use crate::portfolio::CapitalPool;
use crate::result::{FailedInstrument, RunResult, SCHEMA_VERSION};

/// Runs one parameter combination over a universe with a fixed config.
#[derive(Debug, Clone)]
pub struct BacktestRunner {
    config: BacktestConfig,
    config_fingerprint: String,
    parallel: bool,
    has_synthetic: bool,
}

impl BacktestRunner {
    /// Validates the config up front so `run` cannot fail on it.
    pub fn new(config: BacktestConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let config_fingerprint = config.fingerprint();
        Ok(Self {
            config,
            config_fingerprint,
            parallel: true,
            has_synthetic: false,
        })
    }

    /// Enables or disables parallel per-instrument simulation.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Tag every result as produced on synthetic data.
    pub fn with_synthetic_data(mut self, has_synthetic: bool) -> Self {
        self.has_synthetic = has_synthetic;
        self
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn config_fingerprint(&self) -> &str {
        &self.config_fingerprint
    }

    /// Run one combination. Hashes the universe; use `run_with_dataset` when
    /// the hash is already known.
    pub fn run(&self, universe: &Universe, parameters: ParameterCombination) -> RunResult {
        let dataset_hash = DatasetHash::of(universe);
        self.run_with_dataset(universe, parameters, &dataset_hash)
    }

    pub fn run_with_dataset(
        &self,
        universe: &Universe,
        parameters: ParameterCombination,
        dataset_hash: &DatasetHash,
    ) -> RunResult {
        let simulator =
            TradeSimulator::new(parameters).with_entry_threshold(self.config.entry_threshold);

        let series: Vec<&PriceSeries> = universe.iter().collect();
        let outcomes: Vec<(&str, Result<Vec<TradeEvent>, InvalidInputError>)> = if self.parallel {
            series
                .par_iter()
                .map(|s| (s.symbol(), simulator.simulate(s)))
                .collect()
        } else {
            series
                .iter()
                .map(|s| (s.symbol(), simulator.simulate(s)))
                .collect()
        };

        let mut trades = Vec::new();
        let mut failed_instruments = Vec::new();
        let mut tradable: Vec<&str> = Vec::with_capacity(series.len());
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(instrument_trades) => {
                    tradable.push(symbol);
                    trades.extend(instrument_trades);
                }
                Err(err) => {
                    warn!(instrument = symbol, params = %parameters, error = %err, "instrument skipped");
                    failed_instruments.push(FailedInstrument {
                        instrument: symbol.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        sort_trade_log(&mut trades);

        // Failed instruments take no share of capital and do not date the curve.
        let start = series
            .iter()
            .filter(|s| tradable.contains(&s.symbol()))
            .filter_map(|s| s.first_date())
            .min();
        let pool = CapitalPool::new(
            self.config.initial_capital,
            self.config.allocation,
            tradable.len(),
        );
        let outcome = pool.replay(&trades, start);

        let curve: Vec<f64> = rocsq_core::domain::curve_values(&outcome.equity_curve);
        let curve = if curve.is_empty() {
            vec![self.config.initial_capital]
        } else {
            curve
        };
        let metrics = PerformanceMetrics::compute(
            &curve,
            &outcome.realized,
            self.config.initial_capital,
            self.config.trading_days_per_year,
        );

        let mut trade_log: Vec<TradeEvent> =
            outcome.realized.into_iter().map(|r| r.trade).collect();
        sort_trade_log(&mut trade_log);

        debug!(
            params = %parameters,
            trades = trade_log.len(),
            total_return = metrics.total_return,
            sharpe = metrics.sharpe_ratio,
            skipped_entries = outcome.skipped_entries,
            "run complete"
        );

        RunResult {
            schema_version: SCHEMA_VERSION,
            run_id: RunId::derive(&parameters, &self.config_fingerprint, dataset_hash),
            parameters,
            metrics,
            equity_curve: outcome.equity_curve,
            trade_log,
            initial_capital: self.config.initial_capital,
            dataset_hash: dataset_hash.clone(),
            has_synthetic: self.has_synthetic,
            failed_instruments,
            skipped_entries: outcome.skipped_entries,
        }
    }
}

/// Chronological by entry date, ties by instrument, then entry bar.
fn sort_trade_log(trades: &mut [TradeEvent]) {
    trades.sort_by(|a, b| {
        a.entry_date
            .cmp(&b.entry_date)
            .then_with(|| a.instrument.cmp(&b.instrument))
            .then(a.entry_bar.cmp(&b.entry_bar))
    });
}
