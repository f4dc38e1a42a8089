//! RocSq CLI: grid search and single-run commands.
//!
//! Commands:
//! - `search` — run the lookback × holding grid from a TOML config and write
//!   the leaderboard, winner hand-off and per-run artifacts
//! - `run` — backtest one parameter combination and write its artifacts

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rocsq_core::ParameterCombination;
use rocsq_runner::{
    load_synthetic, load_universe, save_artifacts, save_search_artifacts, BacktestRunner,
    GridSearch, LoadedUniverse, PromotionDecision, RunResult, SearchConfig, SearchResults,
};

/// Symbols used for synthetic runs when neither the config nor `--symbols` names any.
const DEFAULT_SYNTHETIC_SYMBOLS: [&str; 3] = ["SPY", "QQQ", "IWM"];

#[derive(Parser)]
#[command(
    name = "rocsq",
    about = "Trend-quality momentum backtester"
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grid search over lookback and holding candidates.
    Search {
        #[command(flatten)]
        data: DataArgs,

        /// Show this many leaderboard rows.
        #[arg(long, default_value_t = 5)]
        top: usize,

        /// Run combinations sequentially.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Backtest a single parameter combination.
    Run {
        #[command(flatten)]
        data: DataArgs,

        /// Lookback window in bars.
        #[arg(long)]
        lookback: usize,

        /// Holding period in bars.
        #[arg(long)]
        holding: usize,
    },
}

#[derive(Args)]
struct DataArgs {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of `{SYMBOL}.csv` files with date,close columns.
    #[arg(long, conflicts_with = "synthetic")]
    data_dir: Option<PathBuf>,

    /// Use deterministic synthetic prices (results are tagged).
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Symbols to trade; overrides the config's universe.
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// Synthetic start date (YYYY-MM-DD).
    #[arg(long, default_value = "2020-01-02")]
    start: String,

    /// Synthetic end date (YYYY-MM-DD).
    #[arg(long, default_value = "2024-12-31")]
    end: String,

    /// Output directory for artifacts.
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Search {
            data,
            top,
            sequential,
        } => run_search_cmd(data, top, sequential),
        Commands::Run {
            data,
            lookback,
            holding,
        } => run_single_cmd(data, lookback, holding),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(data: &DataArgs) -> Result<SearchConfig> {
    let mut config = match &data.config {
        Some(path) => SearchConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SearchConfig::default(),
    };
    if !data.symbols.is_empty() {
        config.universe.symbols = data.symbols.clone();
    }
    Ok(config)
}

fn load_data(data: &DataArgs, config: &SearchConfig) -> Result<LoadedUniverse> {
    if let Some(dir) = &data.data_dir {
        return Ok(load_universe(dir, &config.universe.symbols)?);
    }
    if !data.synthetic {
        bail!("one of --data-dir or --synthetic is required");
    }

    let start = NaiveDate::parse_from_str(&data.start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start date '{}'", data.start))?;
    let end = NaiveDate::parse_from_str(&data.end, "%Y-%m-%d")
        .with_context(|| format!("invalid --end date '{}'", data.end))?;
    if end < start {
        bail!("--end {end} is before --start {start}");
    }

    let symbols: Vec<String> = if config.universe.symbols.is_empty() {
        DEFAULT_SYNTHETIC_SYMBOLS.iter().map(|s| s.to_string()).collect()
    } else {
        config.universe.symbols.clone()
    };
    Ok(load_synthetic(&symbols, start, end))
}

fn run_search_cmd(data: DataArgs, top: usize, sequential: bool) -> Result<()> {
    let config = load_config(&data)?;
    let loaded = load_data(&data, &config)?;

    let runner = BacktestRunner::new(config.backtest.clone())?
        .with_synthetic_data(loaded.has_synthetic);
    let search = GridSearch::new(runner).with_parallelism(!sequential);
    let results = search.search_with_progress(&loaded.universe, &config.grid, |done, total, r| {
        info!(
            "[{done}/{total}] {} total_return={:.2}% trades={}",
            r.parameters.label(),
            r.metrics.total_return * 100.0,
            r.metrics.num_trades
        );
    })?;

    let decision = config
        .promotion
        .as_ref()
        .map(|rule| rule.evaluate(results.winner(), None));

    print_leaderboard(&results, top);
    if let Some(decision) = &decision {
        print_decision(decision);
    }
    if loaded.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    for (symbol, reason) in &loaded.rejected {
        println!("WARNING: {symbol} rejected: {reason}");
    }

    let out = save_search_artifacts(&results, decision.as_ref(), &data.output_dir)?;
    println!("Artifacts saved to: {}", out.display());
    Ok(())
}

fn run_single_cmd(data: DataArgs, lookback: usize, holding: usize) -> Result<()> {
    let params = ParameterCombination::new(lookback, holding)?;
    let config = load_config(&data)?;
    let loaded = load_data(&data, &config)?;

    let runner = BacktestRunner::new(config.backtest.clone())?
        .with_synthetic_data(loaded.has_synthetic);
    let result = runner.run_with_dataset(&loaded.universe, params, &loaded.dataset_hash);

    print_summary(&result);

    let run_dir = save_artifacts(&result, &data.output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn print_leaderboard(results: &SearchResults, top: usize) {
    println!();
    println!("=== Grid Search ===");
    println!("Dataset:        {}", results.dataset_hash().short());
    println!("Combinations:   {}", results.len());
    if results.is_cancelled() {
        println!("Cancelled:      {} combinations not run", results.skipped());
    }
    println!();
    println!(
        "{:>4}  {:>8}  {:>7}  {:>9}  {:>7}  {:>8}  {:>6}",
        "rank", "lookback", "holding", "return", "sharpe", "max_dd", "trades"
    );
    for (i, r) in results.top_n(top).iter().enumerate() {
        let m = &r.metrics;
        println!(
            "{:>4}  {:>8}  {:>7}  {:>8.2}%  {:>7.3}  {:>7.2}%  {:>6}",
            i + 1,
            r.parameters.lookback_window,
            r.parameters.holding_period,
            m.total_return * 100.0,
            m.sharpe_ratio,
            m.max_drawdown * 100.0,
            m.num_trades
        );
    }
    if let Some(best) = results.winner() {
        println!();
        println!("Winner:         {}", best.parameters);
    }
}

fn print_decision(decision: &PromotionDecision) {
    match decision {
        PromotionDecision::Promote {
            parameters,
            total_return,
        } => println!(
            "Promotion:      PROMOTE {parameters} (total return {:.2}%)",
            total_return * 100.0
        ),
        PromotionDecision::Reject { reason } => println!("Promotion:      REJECT {reason:?}"),
    }
}

fn print_summary(result: &RunResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Parameters:     {}", result.parameters);
    println!("Run:            {}", result.run_id.short());
    println!("Trades:         {} ({} truncated)", m.num_trades, m.truncated_trades);
    println!();
    println!("--- Performance ---");
    println!("Initial:        {:.2}", result.initial_capital);
    println!("Final:          {:.2}", m.final_value);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe_ratio);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Avg Trade:      {:.2}%", m.avg_trade_return * 100.0);
    println!("Avg Holding:    {:.1} bars", m.avg_holding_days);
    if result.skipped_entries > 0 {
        println!("Skipped:        {} entries (no free cash)", result.skipped_entries);
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    if !result.is_clean() {
        println!();
        for failed in &result.failed_instruments {
            println!("WARNING: {} skipped: {}", failed.instrument, failed.reason);
        }
    }
}
