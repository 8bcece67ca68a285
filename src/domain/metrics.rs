//! Performance statistics computed from a finished run.

use super::portfolio::EquityPoint;
use super::trade::TradeRecord;
use chrono::NaiveDate;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Summary of one backtest. `None` marks a statistic that is unavailable
/// for the given inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_equity: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub sells: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown: f64,
    pub total_transaction_costs: f64,
    pub avg_win_pct: Option<f64>,
    pub avg_loss_pct: Option<f64>,
    pub avg_pnl: Option<f64>,
    pub total_pnl: f64,
}

impl PerformanceReport {
    /// Pure function of the trade log and the equity series.
    pub fn compute(trades: &[TradeRecord], equity_curve: &[EquityPoint]) -> Self {
        let initial_equity = equity_curve.first().map(|p| p.equity).unwrap_or(0.0);
        let final_equity = equity_curve.last().map(|p| p.equity).unwrap_or(0.0);
        let total_return = if initial_equity > 0.0 {
            final_equity / initial_equity - 1.0
        } else {
            0.0
        };

        let realized: Vec<_> = trades.iter().filter_map(|t| t.realized.as_ref()).collect();
        let sells = realized.len();

        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut gross_wins = 0.0_f64;
        let mut gross_losses = 0.0_f64;
        let mut win_pct_sum = 0.0_f64;
        let mut loss_pct_sum = 0.0_f64;

        for r in &realized {
            if r.pnl_value > 0.0 {
                wins += 1;
                gross_wins += r.pnl_value;
                win_pct_sum += r.pnl_pct;
            } else {
                losses += 1;
                gross_losses += r.pnl_value;
                loss_pct_sum += r.pnl_pct;
            }
        }

        let total_pnl: f64 = realized.iter().map(|r| r.pnl_value).sum();

        PerformanceReport {
            start_date: equity_curve.first().map(|p| p.date),
            end_date: equity_curve.last().map(|p| p.date),
            initial_equity,
            final_equity,
            total_return,
            sells,
            wins,
            losses,
            win_rate: ratio(wins as f64, sells),
            profit_factor: profit_factor(gross_wins, gross_losses),
            sharpe_ratio: sharpe_ratio(equity_curve),
            max_drawdown: max_drawdown(equity_curve),
            total_transaction_costs: trades.iter().map(|t| t.transaction_cost).sum(),
            avg_win_pct: ratio(win_pct_sum, wins),
            avg_loss_pct: ratio(loss_pct_sum, losses),
            avg_pnl: ratio(total_pnl, sells),
            total_pnl,
        }
    }
}

fn ratio(sum: f64, count: usize) -> Option<f64> {
    (count > 0).then(|| sum / count as f64)
}

/// Σ wins / |Σ losses|; infinite with wins and no losses.
pub fn profit_factor(gross_wins: f64, gross_losses: f64) -> Option<f64> {
    if gross_losses < 0.0 {
        Some(gross_wins / gross_losses.abs())
    } else if gross_wins > 0.0 {
        Some(f64::INFINITY)
    } else {
        None
    }
}

pub fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter(|w| w[0].equity > 0.0)
        .map(|w| w[1].equity / w[0].equity - 1.0)
        .collect()
}

/// Annualized Sharpe of daily equity changes with a zero risk-free rate.
///
/// Uses the sample standard deviation.
pub fn sharpe_ratio(equity_curve: &[EquityPoint]) -> Option<f64> {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return None;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev > 0.0 && stddev.is_finite() {
        Some(mean / stddev * TRADING_DAYS_PER_YEAR.sqrt())
    } else {
        None
    }
}

/// Largest peak-to-trough decline as a fraction of the peak.
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
    }

    max_dd
}
