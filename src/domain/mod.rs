//! Core domain types and logic.

pub mod backtest;
pub mod calendar;
pub mod config_validation;
pub mod error;
pub mod execution;
pub mod features;
pub mod indicator;
pub mod market_data;
pub mod metrics;
pub mod portfolio;
pub mod position;
pub mod predictor;
pub mod priced_day;
pub mod trade;
pub mod training;
pub mod universe;
