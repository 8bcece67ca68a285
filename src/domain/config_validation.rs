//! Configuration validation.
//!
//! Reads every section through [`ConfigPort`] into typed run configuration.
//! Nothing has a hidden default: a missing key is an error.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::MomtraderError;
use crate::domain::universe::parse_universe;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictorKind {
    Momentum,
    Linear,
}

impl FromStr for PredictorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "momentum" => Ok(PredictorKind::Momentum),
            "linear" => Ok(PredictorKind::Linear),
            other => Err(format!("unknown predictor '{other}', expected momentum or linear")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub kind: PredictorKind,
    pub training_years: u32,
    pub epochs: usize,
    pub learning_rate: f64,
}

impl ModelConfig {
    /// First day of the training window, which ends the day before `start`.
    /// `None` when the window reaches past the earliest representable date.
    pub fn training_start(&self, start: NaiveDate) -> Option<NaiveDate> {
        chrono::Duration::try_days(365 * i64::from(self.training_years))
            .and_then(|span| start.checked_sub_signed(span))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputConfig {
    pub trades_path: Option<PathBuf>,
    pub equity_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub backtest: BacktestConfig,
    pub data_dir: PathBuf,
    pub model: ModelConfig,
    pub output: OutputConfig,
}

pub fn load_run_config(config: &dyn ConfigPort) -> Result<RunConfig, MomtraderError> {
    let backtest = build_backtest_config(config)?;
    let data_dir = PathBuf::from(require(config, "data", "data_dir")?);
    let model = build_model_config(config)?;
    if model.training_start(backtest.start_date).is_none() {
        return Err(MomtraderError::invalid(
            "model",
            "training_years",
            "training window starts before the earliest supported date",
        ));
    }
    let output = OutputConfig {
        trades_path: optional_path(config, "output", "trades_path"),
        equity_path: optional_path(config, "output", "equity_path"),
    };
    Ok(RunConfig {
        backtest,
        data_dir,
        model,
        output,
    })
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, MomtraderError> {
    const S: &str = "backtest";

    let universe = parse_universe(&require(config, S, "universe")?)
        .map_err(|e| MomtraderError::invalid(S, "universe", e.to_string()))?;

    let backtest = BacktestConfig {
        universe,
        start_date: parse_date(config, S, "start_date")?,
        end_date: parse_date(config, S, "end_date")?,
        portfolio_size: parse_key(config, S, "portfolio_size")?,
        take_profit_pct: parse_key(config, S, "take_profit_pct")?,
        stop_loss_pct: parse_key(config, S, "stop_loss_pct")?,
        max_hold_days: parse_key(config, S, "max_hold_days")?,
        lookback_window: parse_key(config, S, "lookback_window")?,
        transaction_cost_pct: parse_key(config, S, "transaction_cost_pct")?,
        slippage_pct: parse_key(config, S, "slippage_pct")?,
        initial_capital: parse_key(config, S, "initial_capital")?,
    };
    backtest.validate()?;
    Ok(backtest)
}

pub fn build_model_config(config: &dyn ConfigPort) -> Result<ModelConfig, MomtraderError> {
    const S: &str = "model";

    let kind: PredictorKind = parse_key(config, S, "predictor")?;
    if kind == PredictorKind::Momentum {
        return Ok(ModelConfig {
            kind,
            training_years: 0,
            epochs: 0,
            learning_rate: 0.0,
        });
    }

    let training_years: u32 = parse_key(config, S, "training_years")?;
    if training_years == 0 {
        return Err(MomtraderError::invalid(S, "training_years", "training_years must be at least 1"));
    }
    let epochs: usize = parse_key(config, S, "epochs")?;
    if epochs == 0 {
        return Err(MomtraderError::invalid(S, "epochs", "epochs must be at least 1"));
    }
    let learning_rate: f64 = parse_key(config, S, "learning_rate")?;
    if !learning_rate.is_finite() || learning_rate <= 0.0 {
        return Err(MomtraderError::invalid(S, "learning_rate", "learning_rate must be positive"));
    }

    Ok(ModelConfig {
        kind,
        training_years,
        epochs,
        learning_rate,
    })
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, MomtraderError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(MomtraderError::missing(section, key)),
    }
}

fn parse_key<T>(config: &dyn ConfigPort, section: &str, key: &str) -> Result<T, MomtraderError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    require(config, section, key)?
        .parse()
        .map_err(|e: T::Err| MomtraderError::invalid(section, key, e.to_string()))
}

fn parse_date(config: &dyn ConfigPort, section: &str, key: &str) -> Result<NaiveDate, MomtraderError> {
    let value = require(config, section, key)?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
        MomtraderError::invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))
    })
}

fn optional_path(config: &dyn ConfigPort, section: &str, key: &str) -> Option<PathBuf> {
    if !config.has_key(section, key) {
        return None;
    }
    require(config, section, key).ok().map(PathBuf::from)
}
