//! JSON, CSV and TOML artifacts for runs and searches.
//!
//! - **JSON**: full `RunResult` round trip with schema versioning
//! - **CSV**: trade log, equity curve and the grid leaderboard
//! - **TOML**: `winner.toml`, the parameter hand-off for production
//!
//! Persisted artifacts carry a `schema_version`; newer versions are rejected
//! on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use rocsq_core::{EquityPoint, TradeEvent};

use crate::promotion::PromotionDecision;
use crate::result::{RunResult, SCHEMA_VERSION};
use crate::sweep::SearchResults;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunResult` to pretty JSON.
pub fn export_json(result: &RunResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize RunResult to JSON")
}

/// Deserialize a `RunResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunResult> {
    let result: RunResult =
        serde_json::from_str(json).context("failed to deserialize RunResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade log as CSV.
///
/// Columns: instrument, entry_date, entry_price, exit_date, exit_price,
/// holding_days, entry_bar, exit_bar, entry_score, truncated.
/// Open fields are written empty.
pub fn export_trades_csv(trades: &[TradeEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "instrument",
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "holding_days",
        "entry_bar",
        "exit_bar",
        "entry_score",
        "truncated",
    ])?;

    for t in trades {
        wtr.write_record([
            t.instrument.clone(),
            t.entry_date.to_string(),
            format!("{:.6}", t.entry_price),
            t.exit_date.map(|d| d.to_string()).unwrap_or_default(),
            t.exit_price.map(|p| format!("{p:.6}")).unwrap_or_default(),
            t.holding_days.to_string(),
            t.entry_bar.to_string(),
            t.exit_bar.map(|b| b.to_string()).unwrap_or_default(),
            format!("{:.8}", t.entry_score),
            t.truncated.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV with date and portfolio_value columns.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "portfolio_value"])?;
    for p in equity_curve {
        wtr.write_record([p.date.to_string(), format!("{:.2}", p.portfolio_value)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the ranked grid as CSV, one row per combination, best first.
pub fn export_leaderboard_csv(results: &SearchResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "lookback_window",
        "holding_period",
        "total_return",
        "sharpe_ratio",
        "max_drawdown",
        "num_trades",
        "final_value",
        "win_rate",
        "profit_factor",
        "run_id",
    ])?;
    for (i, r) in results.ranked().iter().enumerate() {
        let m = &r.metrics;
        wtr.write_record([
            (i + 1).to_string(),
            r.parameters.lookback_window.to_string(),
            r.parameters.holding_period.to_string(),
            format!("{:.6}", m.total_return),
            format!("{:.4}", m.sharpe_ratio),
            format!("{:.6}", m.max_drawdown),
            m.num_trades.to_string(),
            format!("{:.2}", m.final_value),
            format!("{:.4}", m.win_rate),
            format!("{:.4}", m.profit_factor),
            r.run_id.0.clone(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Winner hand-off ────────────────────────────────────────────────

/// Parameters handed to the production system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerHandoff {
    pub schema_version: u32,
    pub lookback_window: usize,
    pub holding_period: usize,
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub run_id: String,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    /// Present only when a promotion rule was evaluated.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub promoted: Option<bool>,
}

impl WinnerHandoff {
    pub fn from_result(result: &RunResult, decision: Option<&PromotionDecision>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            lookback_window: result.parameters.lookback_window,
            holding_period: result.parameters.holding_period,
            total_return: result.metrics.total_return,
            sharpe_ratio: result.metrics.sharpe_ratio,
            run_id: result.run_id.0.clone(),
            dataset_hash: result.dataset_hash.0.clone(),
            has_synthetic: result.has_synthetic,
            promoted: decision.map(|d| d.is_promote()),
        }
    }
}

pub fn export_winner_toml(handoff: &WinnerHandoff) -> Result<String> {
    toml::to_string_pretty(handoff).context("failed to serialize winner to TOML")
}

pub fn import_winner_toml(content: &str) -> Result<WinnerHandoff> {
    let handoff: WinnerHandoff =
        toml::from_str(content).context("failed to parse winner TOML")?;
    if handoff.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            handoff.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(handoff)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for a single run.
///
/// Creates `{label}_{run_id}/` under `output_dir` (the run id truncated to
/// 12 characters) containing:
/// - `manifest.json` — the full `RunResult`
/// - `trades.csv` — trade log
/// - `equity.csv` — equity curve
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &RunResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("{}_{}", result.parameters.label(), result.run_id.short());
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write_file(&run_dir.join("manifest.json"), &export_json(result)?)?;
    write_file(&run_dir.join("trades.csv"), &export_trades_csv(&result.trade_log)?)?;
    write_file(&run_dir.join("equity.csv"), &export_equity_csv(&result.equity_curve)?)?;

    Ok(run_dir)
}

/// Save the artifact set for a whole search.
///
/// Writes `leaderboard.csv`, `winner.toml` (when there is a winner) and one
/// run directory per combination under `runs/`.
pub fn save_search_artifacts(
    results: &SearchResults,
    decision: Option<&PromotionDecision>,
    output_dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    write_file(
        &output_dir.join("leaderboard.csv"),
        &export_leaderboard_csv(results)?,
    )?;

    if let Some(winner) = results.winner() {
        let handoff = WinnerHandoff::from_result(winner, decision);
        write_file(&output_dir.join("winner.toml"), &export_winner_toml(&handoff)?)?;
    }

    let runs_dir = output_dir.join("runs");
    for result in results.ranked() {
        save_artifacts(result, &runs_dir)?;
    }

    Ok(output_dir.to_path_buf())
}

/// Load a `RunResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<RunResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
