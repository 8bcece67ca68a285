//! Output artifact port.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MomtraderError;
use std::path::Path;

/// Port for persisting the trade log and the equity curve.
pub trait ReportPort {
    fn write_trades(&self, result: &BacktestResult, path: &Path) -> Result<(), MomtraderError>;

    fn write_equity(&self, result: &BacktestResult, path: &Path) -> Result<(), MomtraderError>;
}
