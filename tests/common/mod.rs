#![allow(dead_code)]

use chrono::NaiveDate;
use momtrader::domain::backtest::BacktestConfig;
use momtrader::domain::calendar::business_days;
use momtrader::domain::error::{MomtraderError, PredictorError};
use momtrader::domain::market_data::MarketData;
pub use momtrader::domain::priced_day::{Indicators, PricedDay};
use momtrader::ports::data_port::FeatureProvider;
use momtrader::ports::predictor_port::Predictor;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockFeatureProvider {
    pub data: HashMap<String, Vec<PricedDay>>,
    pub errors: HashMap<String, String>,
}

impl MockFeatureProvider {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_days(mut self, ticker: &str, days: Vec<PricedDay>) -> Self {
        self.data.insert(ticker.to_string(), days);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl FeatureProvider for MockFeatureProvider {
    fn load(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricedDay>, MomtraderError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(MomtraderError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(ticker)
            .map(|days| {
                days.iter()
                    .filter(|d| d.date >= start && d.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, MomtraderError> {
        match self.data.get(ticker) {
            Some(days) if !days.is_empty() => {
                let min = days.iter().map(|d| d.date).min().unwrap();
                let max = days.iter().map(|d| d.date).max().unwrap();
                Ok(Some((min, max, days.len())))
            }
            _ => Ok(None),
        }
    }
}

/// Forecasts keyed by the volume tag of the window's last row.
///
/// Builders tag each ticker's rows with a distinct volume so a window can
/// be traced back to its ticker. Unknown tags forecast 0.
pub struct ScriptedPredictor {
    pub lookback: usize,
    pub forecasts: HashMap<u64, Result<f64, PredictorError>>,
}

impl ScriptedPredictor {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback,
            forecasts: HashMap::new(),
        }
    }

    pub fn forecast(mut self, tag: u64, value: f64) -> Self {
        self.forecasts.insert(tag, Ok(value));
        self
    }

    pub fn failing(mut self, tag: u64) -> Self {
        self.forecasts.insert(
            tag,
            Err(PredictorError::Failed {
                reason: "scripted failure".into(),
            }),
        );
        self
    }
}

impl Predictor for ScriptedPredictor {
    fn lookback_window(&self) -> usize {
        self.lookback
    }

    fn predict(&self, window: &[PricedDay]) -> Result<f64, PredictorError> {
        let tag = window.last().map(|d| d.volume as u64).unwrap_or(0);
        self.forecasts.get(&tag).cloned().unwrap_or(Ok(0.0))
    }
}

/// Records the dates of every window it is asked to score.
pub struct RecordingPredictor {
    pub lookback: usize,
    pub windows: RefCell<Vec<Vec<NaiveDate>>>,
}

impl RecordingPredictor {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback,
            windows: RefCell::new(Vec::new()),
        }
    }

    pub fn take(&self) -> Vec<Vec<NaiveDate>> {
        self.windows.borrow_mut().drain(..).collect()
    }
}

impl Predictor for RecordingPredictor {
    fn lookback_window(&self) -> usize {
        self.lookback
    }

    fn predict(&self, window: &[PricedDay]) -> Result<f64, PredictorError> {
        self.windows
            .borrow_mut()
            .push(window.iter().map(|d| d.date).collect());
        Ok(window.last().map(|d| d.close).unwrap_or(0.0))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_day(date: NaiveDate, open: f64, close: f64) -> PricedDay {
    PricedDay {
        date,
        open,
        high: open.max(close),
        low: open.min(close),
        close,
        volume: 1000.0,
        indicators: Indicators {
            sma_9: close,
            sma_21: close,
            rsi_14: 50.0,
        },
    }
}

/// Rows from `(date, open, close)` triples, tagged through the volume column.
pub fn tagged_days(tag: u64, rows: &[(NaiveDate, f64, f64)]) -> Vec<PricedDay> {
    rows.iter()
        .map(|&(d, open, close)| {
            let mut day = make_day(d, open, close);
            day.volume = tag as f64;
            day
        })
        .collect()
}

/// One row per business day in `[start, end]`, all at `price`.
pub fn flat_days(tag: u64, start: NaiveDate, end: NaiveDate, price: f64) -> Vec<PricedDay> {
    let rows: Vec<_> = business_days(start, end)
        .into_iter()
        .map(|d| (d, price, price))
        .collect();
    tagged_days(tag, &rows)
}

pub fn sample_config(universe: &[&str], start: NaiveDate, end: NaiveDate) -> BacktestConfig {
    BacktestConfig {
        universe: universe.iter().map(|t| t.to_string()).collect(),
        start_date: start,
        end_date: end,
        portfolio_size: 1,
        take_profit_pct: 0.01,
        stop_loss_pct: 0.01,
        max_hold_days: 5,
        lookback_window: 1,
        transaction_cost_pct: 0.0,
        slippage_pct: 0.0,
        initial_capital: 1000.0,
    }
}

pub fn market(series: Vec<(&str, Vec<PricedDay>)>) -> MarketData {
    series
        .into_iter()
        .fold(MarketData::new(), |data, (ticker, days)| {
            data.with_series(ticker, days)
        })
}
