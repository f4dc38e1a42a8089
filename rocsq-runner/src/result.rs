//! RunResult — the immutable record of one backtest run.

use serde::{Deserialize, Serialize};

use rocsq_core::{DatasetHash, EquityPoint, ParameterCombination, RunId, TradeEvent};

use crate::metrics::PerformanceMetrics;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// An instrument whose simulation failed and contributed no trades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedInstrument {
    pub instrument: String,
    pub reason: String,
}

/// Complete result of running one parameter combination over a universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub parameters: ParameterCombination,
    #[serde(flatten)]
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<EquityPoint>,
    /// Funded trades, ordered by entry date then instrument.
    pub trade_log: Vec<TradeEvent>,
    pub initial_capital: f64,
    pub dataset_hash: DatasetHash,
    pub has_synthetic: bool,
    #[serde(default)]
    pub failed_instruments: Vec<FailedInstrument>,
    #[serde(default)]
    pub skipped_entries: usize,
}

impl RunResult {
    pub fn total_return(&self) -> f64 {
        self.metrics.total_return
    }

    pub fn sharpe_ratio(&self) -> f64 {
        self.metrics.sharpe_ratio
    }

    pub fn max_drawdown(&self) -> f64 {
        self.metrics.max_drawdown
    }

    pub fn num_trades(&self) -> usize {
        self.metrics.num_trades
    }

    /// True when the run completed without dropping any instrument.
    pub fn is_clean(&self) -> bool {
        self.failed_instruments.is_empty()
    }
}
