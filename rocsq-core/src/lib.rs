//! RocSq Core: price domain types, trend-quality scoring, trade simulation.
//!
//! This crate is the pure part of the backtester:
//! - Domain types (price points and series, trades, equity points, parameters)
//! - The "ROC squared" scorer: log-price slope weighted by fit quality
//! - A per-instrument Flat/Held state machine with a fixed holding period
//! - Universes, synthetic price generation and dataset/run fingerprints
//!
//! Nothing here touches the filesystem or shares mutable state, so every
//! entry point is safe to call from parallel workers.

pub mod data;
pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod scoring;
pub mod simulator;

pub use data::Universe;
pub use domain::{EquityPoint, ParameterCombination, PricePoint, PriceSeries, TradeEvent};
pub use error::InvalidInputError;
pub use fingerprint::{DatasetHash, RunId};
pub use scoring::{score, ScoreResult};
pub use simulator::TradeSimulator;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a grid-search worker touches is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<PricePoint>();
        require_sync::<PricePoint>();
        require_send::<PriceSeries>();
        require_sync::<PriceSeries>();
        require_send::<TradeEvent>();
        require_sync::<TradeEvent>();
        require_send::<EquityPoint>();
        require_sync::<EquityPoint>();
        require_send::<ParameterCombination>();
        require_sync::<ParameterCombination>();
        require_send::<Universe>();
        require_sync::<Universe>();

        require_send::<ScoreResult>();
        require_sync::<ScoreResult>();
        require_send::<TradeSimulator>();
        require_sync::<TradeSimulator>();
        require_send::<simulator::PositionState>();
        require_sync::<simulator::PositionState>();

        require_send::<DatasetHash>();
        require_sync::<DatasetHash>();
        require_send::<RunId>();
        require_sync::<RunId>();
        require_send::<InvalidInputError>();
        require_sync::<InvalidInputError>();
    }

    /// Scoring and simulation take only borrowed, immutable inputs.
    #[test]
    fn engine_entry_points_are_pure() {
        fn _score(closes: &[f64]) -> Result<ScoreResult, InvalidInputError> {
            score(closes)
        }
        fn _simulate(
            sim: &TradeSimulator,
            series: &PriceSeries,
        ) -> Result<Vec<TradeEvent>, InvalidInputError> {
            sim.simulate(series)
        }
    }
}
