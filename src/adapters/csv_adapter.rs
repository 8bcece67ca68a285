//! CSV file feature adapter.
//!
//! One file per ticker, `<data_dir>/<TICKER>.csv`. Two layouts are accepted:
//! a single header row naming Date/Open/High/Low/Close/Volume in any order and
//! case, or the multi-row export layout whose first line starts with
//! `Price,Close,High` (three header lines, columns fixed as
//! Date,Close,High,Low,Open,Volume).

use crate::domain::error::MomtraderError;
use crate::domain::features::build_priced_days;
use crate::domain::priced_day::{PricedDay, RawBar};
use crate::ports::data_port::FeatureProvider;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

const EXPORT_MARKER: &str = "Price,Close,High";
const EXPORT_HEADER_LINES: usize = 3;

/// Column positions of the OHLCV fields in a record.
#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    const EXPORT: Columns = Columns {
        date: 0,
        close: 1,
        high: 2,
        low: 3,
        open: 4,
        volume: 5,
    };

    fn from_headers(headers: &csv::StringRecord, path: &str) -> Result<Self, MomtraderError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| MomtraderError::DataSource {
                    reason: format!("{path}: missing {name} column"),
                })
        };
        Ok(Columns {
            date: find("date")?,
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume")?,
        })
    }
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{ticker}.csv"))
    }

    /// Raw bars from the ticker's file, `None` when there is no file.
    fn read_bars(&self, ticker: &str) -> Result<Option<Vec<RawBar>>, MomtraderError> {
        let path = self.csv_path(ticker);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let display = path.display().to_string();
        parse_bars(&content, &display).map(Some)
    }

    fn priced_days(&self, ticker: &str) -> Result<Option<Vec<PricedDay>>, MomtraderError> {
        Ok(self.read_bars(ticker)?.map(|bars| build_priced_days(&bars)))
    }
}

fn parse_bars(content: &str, path: &str) -> Result<Vec<RawBar>, MomtraderError> {
    let export_layout = content
        .lines()
        .next()
        .is_some_and(|l| l.trim_start_matches('\u{feff}').starts_with(EXPORT_MARKER));

    let (body, columns) = if export_layout {
        let body: String = content
            .lines()
            .skip(EXPORT_HEADER_LINES)
            .collect::<Vec<_>>()
            .join("\n");
        (body, Some(Columns::EXPORT))
    } else {
        (content.trim_start_matches('\u{feff}').to_string(), None)
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(!export_layout)
        .flexible(true)
        .from_reader(body.as_bytes());

    let columns = match columns {
        Some(c) => c,
        None => {
            let headers = rdr.headers().map_err(|e| MomtraderError::DataSource {
                reason: format!("{path}: CSV header error: {e}"),
            })?;
            Columns::from_headers(headers, path)?
        }
    };

    let mut bars = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| MomtraderError::DataSource {
            reason: format!("{path}: CSV parse error: {e}"),
        })?;

        let date = parse_date(record.get(columns.date).unwrap_or(""), path)?;
        let number = |idx: usize| {
            record
                .get(idx)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .unwrap_or(f64::NAN)
        };

        bars.push(RawBar {
            date,
            open: number(columns.open),
            high: number(columns.high),
            low: number(columns.low),
            close: number(columns.close),
            volume: number(columns.volume),
        });
    }

    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    Ok(bars)
}

/// `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(value: &str, path: &str) -> Result<NaiveDate, MomtraderError> {
    let day_part = value
        .trim()
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or("");
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d").map_err(|e| MomtraderError::DataSource {
        reason: format!("{path}: invalid date '{value}': {e}"),
    })
}

impl FeatureProvider for CsvAdapter {
    fn load(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricedDay>, MomtraderError> {
        let Some(days) = self.priced_days(ticker)? else {
            warn!(ticker = %ticker, path = %self.csv_path(ticker).display(), "no data file");
            return Ok(Vec::new());
        };
        Ok(days
            .into_iter()
            .filter(|d| d.date >= start && d.date <= end)
            .collect())
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, MomtraderError> {
        let days = self.priced_days(ticker)?.unwrap_or_default();
        Ok(match (days.first(), days.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, days.len())),
            _ => None,
        })
    }
}
