//! Portfolio state: cash, open positions, trade log and equity curve.
//!
//! Cash only moves through [`Portfolio::enter`] and [`Portfolio::exit`], and
//! each of those appends exactly one [`TradeRecord`].

use chrono::NaiveDate;
use std::fmt;

use super::error::{ExecutionError, PositionError};
use super::execution::{ExecutionModel, Side};
use super::position::PositionBook;
use super::trade::{ExitReason, Realized, TradeRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Why an entry or exit was not executed. Always recovered locally.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    DataUnavailable,
    InvalidPrice(ExecutionError),
    ZeroQuantity,
    InsufficientFunds { required: f64, available: f64 },
    Position(PositionError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DataUnavailable => write!(f, "no price data"),
            SkipReason::InvalidPrice(e) => write!(f, "{e}"),
            SkipReason::ZeroQuantity => write!(f, "target investment buys zero shares"),
            SkipReason::InsufficientFunds {
                required,
                available,
            } => write!(
                f,
                "not enough cash (${available:.2}) for total cost ${required:.2}"
            ),
            SkipReason::Position(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub book: PositionBook,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            book: PositionBook::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Buy as many whole shares as `target_investment` affords at the slipped
    /// fill, provided cash covers shares plus transaction cost.
    ///
    /// Steps:
    /// 1. Apply buy slippage to the nominal price
    /// 2. quantity = floor(target_investment / fill)
    /// 3. total = quantity * fill + cost; reject if it exceeds cash
    /// 4. Debit cash, open the position, log the trade
    pub fn enter(
        &mut self,
        ticker: &str,
        nominal_price: f64,
        date: NaiveDate,
        target_investment: f64,
        model: &ExecutionModel,
    ) -> Result<&TradeRecord, SkipReason> {
        if self.book.contains(ticker) {
            return Err(SkipReason::Position(PositionError::Duplicate {
                ticker: ticker.to_string(),
            }));
        }

        let fill_price = model
            .fill_price(nominal_price, Side::Buy)
            .map_err(SkipReason::InvalidPrice)?;

        let shares = (target_investment / fill_price).floor();
        if shares.is_nan() || shares < 1.0 {
            return Err(SkipReason::ZeroQuantity);
        }
        let quantity = shares as u64;

        let transaction_cost = model.transaction_cost(fill_price, quantity);
        let total_cost = quantity as f64 * fill_price + transaction_cost;
        if self.cash < total_cost {
            return Err(SkipReason::InsufficientFunds {
                required: total_cost,
                available: self.cash,
            });
        }

        self.book
            .open(ticker, fill_price, date, quantity)
            .map_err(SkipReason::Position)?;
        self.cash -= total_cost;

        self.trades.push(TradeRecord {
            date,
            ticker: ticker.to_string(),
            side: Side::Buy,
            nominal_price,
            fill_price,
            quantity,
            transaction_cost,
            realized: None,
        });
        Ok(&self.trades[self.trades.len() - 1])
    }

    /// Sell the whole position at the slipped fill and credit the net proceeds.
    ///
    /// Realized PnL compares the sell fill with the entry fill; each side's
    /// transaction cost is charged to cash once and not folded into PnL.
    pub fn exit(
        &mut self,
        ticker: &str,
        nominal_price: f64,
        date: NaiveDate,
        reason: ExitReason,
        model: &ExecutionModel,
    ) -> Result<&TradeRecord, SkipReason> {
        let fill_price = model
            .fill_price(nominal_price, Side::Sell)
            .map_err(SkipReason::InvalidPrice)?;
        let position = self.book.close(ticker).map_err(SkipReason::Position)?;

        let quantity = position.quantity;
        let gross_value = fill_price * quantity as f64;
        let transaction_cost = model.transaction_cost(fill_price, quantity);
        self.cash += gross_value - transaction_cost;

        let pnl_value = (fill_price - position.entry_price) * quantity as f64;
        let pnl_pct = position.trigger_pct(fill_price);

        self.trades.push(TradeRecord {
            date,
            ticker: ticker.to_string(),
            side: Side::Sell,
            nominal_price,
            fill_price,
            quantity,
            transaction_cost,
            realized: Some(Realized {
                reason,
                entry_fill_price: position.entry_price,
                pnl_pct,
                pnl_value,
            }),
        });
        Ok(&self.trades[self.trades.len() - 1])
    }

    pub fn record_equity(&mut self, date: NaiveDate, equity: f64) {
        self.equity_curve.push(EquityPoint { date, equity });
    }

    pub fn last_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_capital)
    }
}
