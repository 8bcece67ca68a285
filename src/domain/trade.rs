//! Trade log records.

use chrono::NaiveDate;
use std::fmt;

use super::execution::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    TimeLimit,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::TakeProfit => write!(f, "Take Profit"),
            ExitReason::StopLoss => write!(f, "Stop Loss"),
            ExitReason::TimeLimit => write!(f, "Time Limit"),
        }
    }
}

/// Realized result of a sell, measured against the originating buy's fill.
#[derive(Debug, Clone, PartialEq)]
pub struct Realized {
    pub reason: ExitReason,
    pub entry_fill_price: f64,
    pub pnl_pct: f64,
    pub pnl_value: f64,
}

/// Immutable entry in the append-only trade log.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub ticker: String,
    pub side: Side,
    pub nominal_price: f64,
    pub fill_price: f64,
    pub quantity: u64,
    pub transaction_cost: f64,
    /// Present on sells only.
    pub realized: Option<Realized>,
}

impl TradeRecord {
    pub fn gross_value(&self) -> f64 {
        self.fill_price * self.quantity as f64
    }

    /// Signed change to cash caused by this trade.
    pub fn cash_delta(&self) -> f64 {
        match self.side {
            Side::Buy => -(self.gross_value() + self.transaction_cost),
            Side::Sell => self.gross_value() - self.transaction_cost,
        }
    }
}

/// Cash left after replaying every trade's cash delta from `initial_capital`.
pub fn replay_cash(initial_capital: f64, trades: &[TradeRecord]) -> f64 {
    trades
        .iter()
        .fold(initial_capital, |cash, t| cash + t.cash_delta())
}
