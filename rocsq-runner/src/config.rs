//! Serializable search and backtest configuration.
//!
//! A search is described by one TOML document:
//!
//! ```toml
//! [grid]
//! lookback_candidates = [10, 20, 30]
//! holding_candidates = [5, 10, 15]
//!
//! [backtest]
//! initial_capital = 10000.0
//! entry_threshold = 0.0
//! trading_days_per_year = 252
//! allocation = { type = "equal_weight" }
//!
//! [universe]
//! symbols = ["AAPL", "MSFT"]
//!
//! [promotion]
//! min_total_return = 0.20
//! bound = "exclusive"
//! ```
//!
//! Every section is optional and falls back to its defaults. Validation is a
//! separate step so callers can build configs in code and still fail fast
//! before any simulation starts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::promotion::PromotionRule;
use crate::sweep::ParamGrid;

/// Capital used when a config does not set one.
pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;

/// Annualization factor for daily data.
pub const DEFAULT_TRADING_DAYS_PER_YEAR: u32 = 252;

/// Errors raised while building or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{axis} candidates must not be empty")]
    EmptyCandidates { axis: &'static str },

    #[error("{axis} candidates must be >= 1 (got {value})")]
    NonPositiveCandidate { axis: &'static str, value: usize },

    #[error("initial capital must be positive and finite (got {0})")]
    NonPositiveCapital(f64),

    #[error("allocation fraction must be in (0, 1] (got {0})")]
    InvalidFraction(f64),

    #[error("trading days per year must be >= 1")]
    ZeroTradingDays,

    #[error("entry threshold must be finite (got {0})")]
    NonFiniteThreshold(f64),

    #[error("promotion threshold must be finite (got {0})")]
    NonFinitePromotionThreshold(f64),

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ─── Backtest ────────────────────────────────────────────────────────

/// How much cash a new position receives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AllocationPolicy {
    /// Current equity divided by the number of instruments, capped at free cash.
    #[default]
    EqualWeight,
    /// A fixed fraction of free cash.
    FixedFraction { fraction: f64 },
}

impl AllocationPolicy {
    /// Cash to commit to one new position. Never exceeds `cash`, never negative.
    pub fn allocation(&self, cash: f64, equity: f64, universe_size: usize) -> f64 {
        let target = match *self {
            AllocationPolicy::EqualWeight => {
                if universe_size == 0 {
                    0.0
                } else {
                    equity / universe_size as f64
                }
            }
            AllocationPolicy::FixedFraction { fraction } => cash * fraction,
        };
        target.min(cash).max(0.0)
    }
}

/// Immutable settings for every run in a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub allocation: AllocationPolicy,
    /// Entries require `score > entry_threshold`.
    pub entry_threshold: f64,
    pub trading_days_per_year: u32,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            allocation: AllocationPolicy::default(),
            entry_threshold: 0.0,
            trading_days_per_year: DEFAULT_TRADING_DAYS_PER_YEAR,
        }
    }
}

impl BacktestConfig {
    pub fn with_initial_capital(mut self, initial_capital: f64) -> Self {
        self.initial_capital = initial_capital;
        self
    }

    pub fn with_allocation(mut self, allocation: AllocationPolicy) -> Self {
        self.allocation = allocation;
        self
    }

    pub fn with_entry_threshold(mut self, entry_threshold: f64) -> Self {
        self.entry_threshold = entry_threshold;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }
        if let AllocationPolicy::FixedFraction { fraction } = self.allocation {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(ConfigError::InvalidFraction(fraction));
            }
        }
        if !self.entry_threshold.is_finite() {
            return Err(ConfigError::NonFiniteThreshold(self.entry_threshold));
        }
        if self.trading_days_per_year == 0 {
            return Err(ConfigError::ZeroTradingDays);
        }
        Ok(())
    }

    /// Canonical string used in run ids. `{:?}` on f64 round-trips exactly.
    pub fn fingerprint(&self) -> String {
        let allocation = match self.allocation {
            AllocationPolicy::EqualWeight => "equal_weight".to_string(),
            AllocationPolicy::FixedFraction { fraction } => format!("fixed_fraction:{fraction:?}"),
        };
        format!(
            "initial_capital={:?};allocation={};entry_threshold={:?};trading_days_per_year={}",
            self.initial_capital, allocation, self.entry_threshold, self.trading_days_per_year
        )
    }
}

// ─── Search ──────────────────────────────────────────────────────────

/// Instruments to include. Empty means every instrument the loader finds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    pub symbols: Vec<String>,
}

/// Top-level TOML document for `rocsq search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub grid: ParamGrid,
    pub backtest: BacktestConfig,
    pub universe: UniverseConfig,
    /// No promotion is evaluated unless a rule is supplied.
    pub promotion: Option<PromotionRule>,
}

impl SearchConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SearchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.backtest.validate()?;
        if let Some(rule) = &self.promotion {
            rule.validate()?;
        }
        Ok(())
    }
}
