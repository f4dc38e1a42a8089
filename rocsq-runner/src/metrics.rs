//! Pure functions that compute run statistics from an equity curve and trades.
//!
//! Every metric is a pure function: equity curve values and/or realized trades
//! in, scalar out. No dependencies on the runner or the grid search.

use serde::{Deserialize, Serialize};

use crate::portfolio::RealizedTrade;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline as a positive fraction.
    pub max_drawdown: f64,
    pub num_trades: usize,
    pub final_value: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_trade_return: f64,
    pub avg_holding_days: f64,
    pub truncated_trades: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve and the funded trades.
    pub fn compute(
        equity_curve: &[f64],
        realized: &[RealizedTrade],
        initial_capital: f64,
        trading_days_per_year: u32,
    ) -> Self {
        Self {
            total_return: total_return(equity_curve),
            sharpe_ratio: sharpe_ratio(equity_curve, trading_days_per_year),
            max_drawdown: max_drawdown(equity_curve),
            num_trades: realized.len(),
            final_value: equity_curve.last().copied().unwrap_or(initial_capital),
            win_rate: win_rate(realized),
            profit_factor: profit_factor(realized),
            avg_trade_return: avg_trade_return(realized),
            avg_holding_days: avg_holding_days(realized),
            truncated_trades: realized.iter().filter(|r| r.trade.truncated).count(),
        }
    }

    /// Metrics of a run that never traded.
    pub fn neutral(initial_capital: f64) -> Self {
        Self::compute(&[initial_capital], &[], initial_capital, 1)
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: final / initial − 1.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&final_eq)) if equity_curve.len() >= 2 && initial > 0.0 => {
            final_eq / initial - 1.0
        }
        _ => 0.0,
    }
}

/// Annualized Sharpe ratio from per-point returns of the curve.
///
/// Sharpe = mean(returns) / std(returns) · sqrt(trading_days_per_year).
/// Returns 0.0 if variance is zero or there are fewer than 2 returns.
pub fn sharpe_ratio(equity_curve: &[f64], trading_days_per_year: u32) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * f64::from(trading_days_per_year).sqrt()
}

/// Maximum drawdown as a positive fraction (0.15 = 15% below the running peak).
///
/// Returns 0.0 if equity never falls below a previous peak.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (peak - eq) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Win rate: fraction of funded trades with positive P&L.
pub fn win_rate(realized: &[RealizedTrade]) -> f64 {
    if realized.is_empty() {
        return 0.0;
    }
    let winners = realized.iter().filter(|r| r.is_winner()).count();
    winners as f64 / realized.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(realized: &[RealizedTrade]) -> f64 {
    if realized.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = realized.iter().filter(|r| r.pnl > 0.0).map(|r| r.pnl).sum();
    let gross_loss: f64 = realized
        .iter()
        .filter(|r| r.pnl < 0.0)
        .map(|r| r.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Mean price return per trade.
pub fn avg_trade_return(realized: &[RealizedTrade]) -> f64 {
    let returns: Vec<f64> = realized.iter().map(|r| r.trade.return_pct()).collect();
    mean_f64(&returns)
}

/// Mean bars held per trade.
pub fn avg_holding_days(realized: &[RealizedTrade]) -> f64 {
    let days: Vec<f64> = realized.iter().map(|r| r.trade.holding_days as f64).collect();
    mean_f64(&days)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive curve points.
pub fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1).
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
