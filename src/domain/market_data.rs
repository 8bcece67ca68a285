//! In-memory price/feature store keyed by ticker and date.
//!
//! Everything the engine reads during a run is loaded here up front; a ticker
//! or date that is absent is treated as "no data today".

use crate::domain::priced_day::PricedDay;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct TickerSeries {
    pub ticker: String,
    pub days: Vec<PricedDay>,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl TickerSeries {
    /// Build a series, sorting by date and keeping the first row of any duplicate date.
    pub fn new(ticker: String, mut days: Vec<PricedDay>) -> Self {
        days.sort_by_key(|d| d.date);
        days.dedup_by_key(|d| d.date);
        let date_index = days
            .iter()
            .enumerate()
            .map(|(i, day)| (day.date, i))
            .collect();
        Self {
            ticker,
            days,
            date_index,
        }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn get_day(&self, date: NaiveDate) -> Option<&PricedDay> {
        self.date_index.get(&date).map(|&i| &self.days[i])
    }

    /// All rows dated strictly before `date`.
    pub fn before(&self, date: NaiveDate) -> &[PricedDay] {
        let end = self.days.partition_point(|d| d.date < date);
        &self.days[..end]
    }

    /// The last `count` rows dated strictly before `date`, if that many exist.
    pub fn window_before(&self, date: NaiveDate, count: usize) -> Option<&[PricedDay]> {
        let history = self.before(date);
        if count == 0 || history.len() < count {
            return None;
        }
        Some(&history[history.len() - count..])
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarketData {
    series: HashMap<String, TickerSeries>,
}

impl MarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: TickerSeries) {
        self.series.insert(series.ticker.clone(), series);
    }

    pub fn with_series(mut self, ticker: &str, days: Vec<PricedDay>) -> Self {
        self.insert(TickerSeries::new(ticker.to_string(), days));
        self
    }

    pub fn series(&self, ticker: &str) -> Option<&TickerSeries> {
        self.series.get(ticker)
    }

    pub fn day(&self, ticker: &str, date: NaiveDate) -> Option<&PricedDay> {
        self.series(ticker)?.get_day(date)
    }

    pub fn has_any_on<'a>(
        &self,
        tickers: impl IntoIterator<Item = &'a String>,
        date: NaiveDate,
    ) -> bool {
        tickers
            .into_iter()
            .any(|t| self.day(t, date).is_some())
    }
}
