//! Grid search over lookback × holding combinations.
//!
//! Every combination is an independent `BacktestRunner` invocation reading the
//! same immutable universe, dispatched on rayon (or sequentially). Ranking
//! happens once all combinations have finished:
//! total_return desc, sharpe_ratio desc, lookback asc, holding asc.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rocsq_core::{DatasetHash, ParameterCombination, Universe};

use crate::config::ConfigError;
use crate::result::RunResult;
use crate::runner::BacktestRunner;

/// Candidate lists for the two grid axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub lookback_candidates: Vec<usize>,
    pub holding_candidates: Vec<usize>,
}

impl Default for ParamGrid {
    /// Lookbacks 10, 20, 30 × holdings 5, 10, 15.
    fn default() -> Self {
        Self {
            lookback_candidates: vec![10, 20, 30],
            holding_candidates: vec![5, 10, 15],
        }
    }
}

impl ParamGrid {
    pub fn new(lookback_candidates: Vec<usize>, holding_candidates: Vec<usize>) -> Self {
        Self {
            lookback_candidates,
            holding_candidates,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_axis("lookback", &self.lookback_candidates)?;
        check_axis("holding", &self.holding_candidates)
    }

    /// Number of distinct combinations.
    pub fn size(&self) -> usize {
        let lookbacks: BTreeSet<_> = self.lookback_candidates.iter().collect();
        let holdings: BTreeSet<_> = self.holding_candidates.iter().collect();
        lookbacks.len() * holdings.len()
    }

    /// Distinct combinations in (lookback, holding) order.
    pub fn combinations(&self) -> Result<Vec<ParameterCombination>, ConfigError> {
        self.validate()?;
        let lookbacks: BTreeSet<usize> = self.lookback_candidates.iter().copied().collect();
        let holdings: BTreeSet<usize> = self.holding_candidates.iter().copied().collect();

        let mut combos = Vec::with_capacity(lookbacks.len() * holdings.len());
        for &lookback_window in &lookbacks {
            for &holding_period in &holdings {
                combos.push(ParameterCombination {
                    lookback_window,
                    holding_period,
                });
            }
        }
        Ok(combos)
    }
}

fn check_axis(axis: &'static str, candidates: &[usize]) -> Result<(), ConfigError> {
    if candidates.is_empty() {
        return Err(ConfigError::EmptyCandidates { axis });
    }
    if let Some(&value) = candidates.iter().find(|&&v| v == 0) {
        return Err(ConfigError::NonPositiveCandidate { axis, value });
    }
    Ok(())
}

/// Shared cancellation signal for a running search.
///
/// Checked before each combination starts. In-flight combinations finish. A
/// search counts as cancelled only if some combination never ran.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }
}

/// Grid search executor.
pub struct GridSearch {
    runner: BacktestRunner,
    parallel: bool,
    cancel: Option<CancelFlag>,
}

impl GridSearch {
    pub fn new(runner: BacktestRunner) -> Self {
        Self {
            runner,
            parallel: true,
            cancel: None,
        }
    }

    /// Enables or disables parallel execution across combinations.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn runner(&self) -> &BacktestRunner {
        &self.runner
    }

    /// Run every combination in the grid and rank the results.
    ///
    /// Fails only on an invalid grid, before any simulation starts.
    pub fn search(&self, universe: &Universe, grid: &ParamGrid) -> Result<SearchResults, ConfigError> {
        self.search_with_progress(universe, grid, |_, _, _| {})
    }

    /// Like `search`, invoking `progress(completed, total, result)` after each
    /// combination finishes. `completed` counts from 1.
    pub fn search_with_progress<F>(
        &self,
        universe: &Universe,
        grid: &ParamGrid,
        progress: F,
    ) -> Result<SearchResults, ConfigError>
    where
        F: Fn(usize, usize, &RunResult) + Send + Sync,
    {
        let combos = grid.combinations()?;
        let total = combos.len();
        let dataset_hash = DatasetHash::of(universe);
        info!(
            combinations = total,
            instruments = universe.len(),
            dataset = dataset_hash.short(),
            parallel = self.parallel,
            "grid search started"
        );

        let completed = AtomicUsize::new(0);
        let run_one = |params: &ParameterCombination| -> Option<RunResult> {
            if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                return None;
            }
            let result = self.runner.run_with_dataset(universe, *params, &dataset_hash);
            let done = completed.fetch_add(1, AtomicOrdering::SeqCst) + 1;
            debug!(
                params = %params,
                total_return = result.metrics.total_return,
                num_trades = result.metrics.num_trades,
                done,
                total,
                "combination finished"
            );
            progress(done, total, &result);
            Some(result)
        };

        let results: Vec<RunResult> = if self.parallel {
            combos.par_iter().filter_map(run_one).collect()
        } else {
            combos.iter().filter_map(run_one).collect()
        };

        // Only cancellation leaves combinations unrun.
        let skipped = total - results.len();
        let cancelled = skipped > 0;
        let search = SearchResults::new(results, dataset_hash, cancelled, skipped);

        match search.winner() {
            Some(best) => info!(
                winner = %best.parameters,
                total_return = best.metrics.total_return,
                sharpe = best.metrics.sharpe_ratio,
                cancelled,
                skipped,
                "grid search finished"
            ),
            None => info!(cancelled, skipped, "grid search finished without results"),
        }
        Ok(search)
    }
}

/// Ranking order for run results.
pub fn rank_cmp(a: &RunResult, b: &RunResult) -> Ordering {
    b.metrics
        .total_return
        .total_cmp(&a.metrics.total_return)
        .then_with(|| b.metrics.sharpe_ratio.total_cmp(&a.metrics.sharpe_ratio))
        .then_with(|| a.parameters.cmp(&b.parameters))
}

/// Ranked output of a grid search.
#[derive(Debug, Clone)]
pub struct SearchResults {
    ranked: Vec<RunResult>,
    dataset_hash: DatasetHash,
    cancelled: bool,
    skipped: usize,
}

impl SearchResults {
    pub fn new(
        mut results: Vec<RunResult>,
        dataset_hash: DatasetHash,
        cancelled: bool,
        skipped: usize,
    ) -> Self {
        results.sort_by(rank_cmp);
        Self {
            ranked: results,
            dataset_hash,
            cancelled,
            skipped,
        }
    }

    /// All results, best first.
    pub fn ranked(&self) -> &[RunResult] {
        &self.ranked
    }

    pub fn winner(&self) -> Option<&RunResult> {
        self.ranked.first()
    }

    pub fn best_parameters(&self) -> Option<ParameterCombination> {
        self.winner().map(|r| r.parameters)
    }

    pub fn top_n(&self, n: usize) -> &[RunResult] {
        &self.ranked[..n.min(self.ranked.len())]
    }

    pub fn get(&self, parameters: ParameterCombination) -> Option<&RunResult> {
        self.ranked.iter().find(|r| r.parameters == parameters)
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn dataset_hash(&self) -> &DatasetHash {
        &self.dataset_hash
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Combinations never started because of cancellation.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
