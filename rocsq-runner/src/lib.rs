//! RocSq Runner — backtest orchestration, grid search, metrics, exports.
//!
//! This crate builds on `rocsq-core` to provide:
//! - TOML search configuration with up-front validation
//! - Single-run backtests over a universe with a shared capital pool
//! - Parallel grid search with ranking, progress reporting and cancellation
//! - Caller-supplied promotion rules for the winning parameters
//! - CSV price loading and synthetic data
//! - JSON/CSV/TOML artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod portfolio;
pub mod promotion;
pub mod result;
pub mod runner;
pub mod sweep;

pub use config::{AllocationPolicy, BacktestConfig, ConfigError, SearchConfig, UniverseConfig};
pub use data_loader::{load_synthetic, load_universe, LoadError, LoadedUniverse};
pub use export::{save_artifacts, save_search_artifacts, WinnerHandoff};
pub use metrics::PerformanceMetrics;
pub use portfolio::{CapitalPool, PoolOutcome, RealizedTrade};
pub use promotion::{PromotionDecision, PromotionRule, RejectReason, ThresholdBound};
pub use result::{FailedInstrument, RunResult, SCHEMA_VERSION};
pub use runner::BacktestRunner;
pub use sweep::{CancelFlag, GridSearch, ParamGrid, SearchResults};
