//! Backtest engine and daily event loop.
//!
//! A run walks every business day in `[start_date, end_date]`:
//! 1. Data presence: with no universe ticker priced today, equity is carried forward
//! 2. Exits: take profit, stop loss, then time limit at today's open
//! 3. Entries: rank unheld tickers by forecast over rows strictly before today,
//!    fill the top open slots at today's open while cash allows
//! 4. Mark-to-market at today's close and record equity

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use super::calendar::business_days;
use super::error::{MomtraderError, PredictorError};
use super::execution::ExecutionModel;
use super::market_data::MarketData;
use super::portfolio::{EquityPoint, Portfolio, SkipReason};
use super::trade::{ExitReason, TradeRecord};
use crate::ports::predictor_port::Predictor;

/// Immutable parameters of one backtest run. Rates are fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub universe: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub portfolio_size: usize,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub max_hold_days: i64,
    pub lookback_window: usize,
    pub transaction_cost_pct: f64,
    pub slippage_pct: f64,
    pub initial_capital: f64,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), MomtraderError> {
        let invalid = |key: &str, reason: &str| MomtraderError::invalid("backtest", key, reason);

        if self.universe.is_empty() {
            return Err(invalid("universe", "universe must contain at least one ticker"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.universe.iter().find(|t| !seen.insert(t.as_str())) {
            return Err(invalid("universe", &format!("duplicate ticker {dup}")));
        }
        if self.end_date < self.start_date {
            return Err(invalid("end_date", "end_date must not be before start_date"));
        }
        if self.portfolio_size == 0 {
            return Err(invalid("portfolio_size", "portfolio_size must be at least 1"));
        }
        if self.lookback_window == 0 {
            return Err(invalid("lookback_window", "lookback_window must be at least 1"));
        }
        if self.max_hold_days < 1 {
            return Err(invalid("max_hold_days", "max_hold_days must be at least 1"));
        }
        for (key, value) in [
            ("take_profit_pct", self.take_profit_pct),
            ("stop_loss_pct", self.stop_loss_pct),
            ("transaction_cost_pct", self.transaction_cost_pct),
            ("slippage_pct", self.slippage_pct),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(key, &format!("{key} must be a non-negative number")));
            }
        }
        if self.slippage_pct >= 1.0 {
            return Err(invalid("slippage_pct", "slippage_pct must be below 1"));
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(invalid("initial_capital", "initial_capital must be positive"));
        }
        Ok(())
    }

    /// Capital allotted to each position slot.
    pub fn target_investment_per_slot(&self) -> f64 {
        self.initial_capital / self.portfolio_size as f64
    }

    pub fn execution_model(&self) -> ExecutionModel {
        ExecutionModel::new(self.slippage_pct, self.transaction_cost_pct)
    }
}

/// The two artifacts a run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { day: NaiveDate },
    Finished,
}

/// What happened on one processed day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayReport {
    pub date: NaiveDate,
    pub carried_forward: bool,
    pub exits: usize,
    pub entries: usize,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub ticker: String,
    pub forecast: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
    execution: ExecutionModel,
}

impl BacktestEngine {
    /// Fails with a configuration error before any day is processed.
    pub fn new(config: BacktestConfig) -> Result<Self, MomtraderError> {
        config.validate()?;
        let execution = config.execution_model();
        Ok(Self { config, execution })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn start<'a>(
        &'a self,
        data: &'a MarketData,
        predictor: &'a dyn Predictor,
    ) -> Result<BacktestRun<'a>, MomtraderError> {
        if predictor.lookback_window() != self.config.lookback_window {
            return Err(MomtraderError::invalid(
                "backtest",
                "lookback_window",
                format!(
                    "predictor expects {} rows, config has {}",
                    predictor.lookback_window(),
                    self.config.lookback_window
                ),
            ));
        }
        Ok(BacktestRun {
            engine: self,
            data,
            predictor,
            days: business_days(self.config.start_date, self.config.end_date),
            next_day: 0,
            state: RunState::Idle,
            portfolio: Portfolio::new(self.config.initial_capital),
        })
    }

    pub fn run(
        &self,
        data: &MarketData,
        predictor: &dyn Predictor,
    ) -> Result<BacktestResult, MomtraderError> {
        let mut run = self.start(data, predictor)?;
        info!(
            start = %self.config.start_date,
            end = %self.config.end_date,
            days = run.days.len(),
            txn_cost_pct = self.config.transaction_cost_pct * 100.0,
            slippage_pct = self.config.slippage_pct * 100.0,
            "starting backtest"
        );
        while run.step().is_some() {}
        Ok(run.finish())
    }
}

pub struct BacktestRun<'a> {
    engine: &'a BacktestEngine,
    data: &'a MarketData,
    predictor: &'a dyn Predictor,
    days: Vec<NaiveDate>,
    next_day: usize,
    state: RunState,
    portfolio: Portfolio,
}

impl<'a> BacktestRun<'a> {
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    /// Process the next business day. `None` once every day has been processed.
    pub fn step(&mut self) -> Option<DayReport> {
        let Some(&today) = self.days.get(self.next_day) else {
            if self.state != RunState::Finished {
                info!(
                    trades = self.portfolio.trades.len(),
                    equity = self.portfolio.last_equity(),
                    "backtest finished"
                );
            }
            self.state = RunState::Finished;
            return None;
        };
        self.next_day += 1;
        self.state = RunState::Running { day: today };
        debug!(day = %today, "processing day");

        let config = &self.engine.config;
        if !self.data.has_any_on(&config.universe, today) {
            let equity = self.portfolio.last_equity();
            info!(day = %today, "no market data for any ticker, carrying equity forward");
            self.portfolio.record_equity(today, equity);
            return Some(DayReport {
                date: today,
                carried_forward: true,
                exits: 0,
                entries: 0,
                equity,
            });
        }

        let exits = self.process_exits(today);
        let entries = self.process_entries(today);
        let equity = self.mark_to_market(today);

        if self.next_day == self.days.len() {
            info!(
                day = %today,
                cash = self.portfolio.cash,
                holdings = equity - self.portfolio.cash,
                equity,
                "end of day"
            );
        }

        Some(DayReport {
            date: today,
            carried_forward: false,
            exits,
            entries,
            equity,
        })
    }

    pub fn finish(mut self) -> BacktestResult {
        while self.step().is_some() {}
        BacktestResult {
            trades: self.portfolio.trades,
            equity_curve: self.portfolio.equity_curve,
        }
    }

    fn exit_reason(&self, trigger_pct: f64, days_held: i64) -> Option<ExitReason> {
        let config = &self.engine.config;
        if trigger_pct >= config.take_profit_pct {
            Some(ExitReason::TakeProfit)
        } else if trigger_pct <= -config.stop_loss_pct {
            Some(ExitReason::StopLoss)
        } else if days_held >= config.max_hold_days {
            Some(ExitReason::TimeLimit)
        } else {
            None
        }
    }

    fn process_exits(&mut self, today: NaiveDate) -> usize {
        let mut exits = 0;

        for ticker in self.portfolio.book.tickers() {
            let Some(open) = self
                .data
                .day(&ticker, today)
                .map(|d| d.open)
                .filter(|o| !o.is_nan())
            else {
                warn!(ticker = %ticker, day = %today, reason = %SkipReason::DataUnavailable, "cannot evaluate exit, holding");
                continue;
            };
            let Some(position) = self.portfolio.book.get(&ticker) else {
                continue;
            };
            let trigger_pct = position.trigger_pct(open);
            let Some(reason) = self.exit_reason(trigger_pct, position.days_held(today)) else {
                continue;
            };

            match self
                .portfolio
                .exit(&ticker, open, today, reason, &self.engine.execution)
            {
                Ok(trade) => {
                    let trade = trade.clone();
                    exits += 1;
                    let (pnl_pct, pnl_value) = trade
                        .realized
                        .as_ref()
                        .map(|r| (r.pnl_pct, r.pnl_value))
                        .unwrap_or_default();
                    info!(
                        ticker = %ticker,
                        quantity = trade.quantity,
                        nominal = trade.nominal_price,
                        fill = trade.fill_price,
                        reason = %reason,
                        pnl_pct,
                        pnl_value,
                        cost = trade.transaction_cost,
                        cash = self.portfolio.cash,
                        "SELL"
                    );
                }
                Err(skip) => {
                    warn!(ticker = %ticker, day = %today, reason = %skip, "sell skipped, holding");
                }
            }
        }

        exits
    }

    /// Forecast every eligible ticker on rows strictly before `today`, best first.
    ///
    /// Ties keep universe order.
    pub fn rank_candidates(&self, today: NaiveDate) -> Vec<Candidate> {
        let config = &self.engine.config;
        let mut candidates = Vec::new();

        for ticker in &config.universe {
            if self.portfolio.book.contains(ticker) {
                continue;
            }
            let Some(window) = self
                .data
                .series(ticker)
                .and_then(|s| s.window_before(today, config.lookback_window))
            else {
                continue;
            };
            if window.iter().any(|d| d.has_nan()) {
                debug!(ticker = %ticker, day = %today, "window has NaN features, not ranked");
                continue;
            }
            debug_assert!(window.iter().all(|d| d.date < today));

            match self.predictor.predict(window) {
                Ok(forecast) if forecast.is_finite() => candidates.push(Candidate {
                    ticker: ticker.clone(),
                    forecast,
                }),
                Ok(forecast) => {
                    let err = PredictorError::NonFinite { value: forecast };
                    warn!(ticker = %ticker, day = %today, error = %err, "candidate excluded");
                }
                Err(err) => {
                    warn!(ticker = %ticker, day = %today, error = %err, "candidate excluded");
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.forecast
                .partial_cmp(&a.forecast)
                .unwrap_or(Ordering::Equal)
        });
        candidates
    }

    fn process_entries(&mut self, today: NaiveDate) -> usize {
        let config = &self.engine.config;
        let slots = config
            .portfolio_size
            .saturating_sub(self.portfolio.book.len());
        if slots == 0 {
            return 0;
        }

        let target = config.target_investment_per_slot();
        let mut entries = 0;

        for candidate in self.rank_candidates(today).into_iter().take(slots) {
            let ticker = candidate.ticker;
            let Some(day) = self.data.day(&ticker, today) else {
                warn!(ticker = %ticker, day = %today, reason = %SkipReason::DataUnavailable, "buy skipped");
                continue;
            };

            match self
                .portfolio
                .enter(&ticker, day.open, today, target, &self.engine.execution)
            {
                Ok(trade) => {
                    let trade = trade.clone();
                    entries += 1;
                    info!(
                        ticker = %ticker,
                        quantity = trade.quantity,
                        nominal = trade.nominal_price,
                        fill = trade.fill_price,
                        forecast = candidate.forecast,
                        cost = trade.transaction_cost,
                        cash = self.portfolio.cash,
                        "BUY"
                    );
                }
                Err(skip) => {
                    warn!(ticker = %ticker, day = %today, reason = %skip, "buy skipped");
                }
            }
        }

        entries
    }

    fn mark_to_market(&mut self, today: NaiveDate) -> f64 {
        let closes: HashMap<String, f64> = self
            .portfolio
            .book
            .iter()
            .filter_map(|pos| {
                self.data
                    .day(&pos.ticker, today)
                    .map(|d| (pos.ticker.clone(), d.close))
            })
            .collect();

        let holdings = self.portfolio.book.holdings_value(&closes);
        for (ticker, close) in &closes {
            if !close.is_nan() {
                self.portfolio.book.mark(ticker, *close);
            }
        }

        let equity = self.portfolio.cash + holdings;
        self.portfolio.record_equity(today, equity);
        equity
    }
}
