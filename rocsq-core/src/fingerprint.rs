//! Deterministic identification of datasets and runs.
//!
//! - `DatasetHash`: BLAKE3 over every (symbol, date, close) in symbol order.
//! - `RunId`: BLAKE3 over the parameter combination, a canonical config string
//!   and the dataset hash. Two runs with the same id produce the same result.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::Universe;
use crate::domain::ParameterCombination;

/// Content hash of a universe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn of(universe: &Universe) -> Self {
        let mut hasher = blake3::Hasher::new();
        for series in universe.iter() {
            hasher.update(series.symbol().as_bytes());
            hasher.update(&(series.len() as u64).to_le_bytes());
            for point in series.points() {
                hasher.update(point.date.to_string().as_bytes());
                hasher.update(&point.close.to_le_bytes());
            }
        }
        Self(hasher.finalize().to_hex().to_string())
    }

    /// First 12 hex characters, for directory names and log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic identity of one backtest run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn derive(
        params: &ParameterCombination,
        config_fingerprint: &str,
        dataset: &DatasetHash,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(params.lookback_window as u64).to_le_bytes());
        hasher.update(&(params.holding_period as u64).to_le_bytes());
        hasher.update(config_fingerprint.as_bytes());
        hasher.update(dataset.0.as_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
