//! CSV writer for the trade log and the equity curve.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MomtraderError;
use crate::domain::execution::Side;
use crate::domain::portfolio::EquityPoint;
use crate::domain::trade::TradeRecord;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::io;
use std::path::Path;

#[derive(Debug, Serialize)]
struct TradeRow<'a> {
    date: String,
    ticker: &'a str,
    side: Side,
    nominal_price: f64,
    fill_price: f64,
    quantity: u64,
    transaction_cost: f64,
    reason: Option<String>,
    entry_fill_price: Option<f64>,
    pnl_pct: Option<f64>,
    pnl_value: Option<f64>,
}

impl<'a> From<&'a TradeRecord> for TradeRow<'a> {
    fn from(trade: &'a TradeRecord) -> Self {
        let realized = trade.realized.as_ref();
        TradeRow {
            date: trade.date.to_string(),
            ticker: &trade.ticker,
            side: trade.side,
            nominal_price: trade.nominal_price,
            fill_price: trade.fill_price,
            quantity: trade.quantity,
            transaction_cost: trade.transaction_cost,
            reason: realized.map(|r| r.reason.to_string()),
            entry_fill_price: realized.map(|r| r.entry_fill_price),
            pnl_pct: realized.map(|r| r.pnl_pct),
            pnl_value: realized.map(|r| r.pnl_value),
        }
    }
}

#[derive(Debug, Serialize)]
struct EquityRow {
    date: String,
    equity: f64,
}

impl From<&EquityPoint> for EquityRow {
    fn from(point: &EquityPoint) -> Self {
        EquityRow {
            date: point.date.to_string(),
            equity: point.equity,
        }
    }
}

fn write_rows<T, I>(path: &Path, rows: I) -> Result<(), MomtraderError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(path).map_err(io::Error::from)?;
    for row in rows {
        writer.serialize(row).map_err(io::Error::from)?;
    }
    writer.flush()?;
    Ok(())
}

pub struct CsvReportAdapter;

impl ReportPort for CsvReportAdapter {
    fn write_trades(&self, result: &BacktestResult, path: &Path) -> Result<(), MomtraderError> {
        write_rows(path, result.trades.iter().map(TradeRow::from))
    }

    fn write_equity(&self, result: &BacktestResult, path: &Path) -> Result<(), MomtraderError> {
        write_rows(path, result.equity_curve.iter().map(EquityRow::from))
    }
}
