//! Ticker universe parsing and loading.
//!
//! Parses the ticker list from configuration and loads each ticker's feature
//! rows into the in-memory store the engine reads from.

use crate::domain::error::MomtraderError;
use crate::domain::market_data::{MarketData, TickerSeries};
use crate::ports::data_port::FeatureProvider;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

/// Upper-cased, trimmed tickers in input order.
pub fn parse_universe(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadSkip {
    NoData,
    InsufficientRows { rows: usize },
    SourceError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: LoadSkip,
}

pub struct LoadedUniverse {
    pub data: MarketData,
    pub loaded: Vec<String>,
    pub skipped: Vec<SkippedTicker>,
}

/// Load every ticker over `[start, end]`.
///
/// Tickers with fewer than `min_rows` rows can never fill a prediction
/// window and are skipped, as are tickers whose source is unreadable or
/// malformed. Fails with `NoData` when nothing loads.
pub fn load_universe(
    provider: &dyn FeatureProvider,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
    min_rows: usize,
) -> Result<LoadedUniverse, MomtraderError> {
    let mut data = MarketData::new();
    let mut loaded = Vec::new();
    let mut skipped = Vec::new();

    for ticker in tickers {
        let days = match provider.load(ticker, start, end) {
            Ok(days) => days,
            Err(MomtraderError::DataSource { reason }) => {
                warn!(ticker = %ticker, reason = %reason, "skipping ticker, error loading data");
                skipped.push(SkippedTicker {
                    ticker: ticker.clone(),
                    reason: LoadSkip::SourceError(reason),
                });
                continue;
            }
            Err(MomtraderError::Io(e)) => {
                warn!(ticker = %ticker, error = %e, "skipping ticker, error reading data");
                skipped.push(SkippedTicker {
                    ticker: ticker.clone(),
                    reason: LoadSkip::SourceError(e.to_string()),
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        if days.is_empty() {
            warn!(ticker = %ticker, "skipping ticker, no data found");
            skipped.push(SkippedTicker {
                ticker: ticker.clone(),
                reason: LoadSkip::NoData,
            });
            continue;
        }

        if days.len() < min_rows {
            warn!(
                ticker = %ticker,
                rows = days.len(),
                minimum = min_rows,
                "skipping ticker, not enough rows"
            );
            skipped.push(SkippedTicker {
                ticker: ticker.clone(),
                reason: LoadSkip::InsufficientRows { rows: days.len() },
            });
            continue;
        }

        info!(ticker = %ticker, rows = days.len(), "loaded");
        data.insert(TickerSeries::new(ticker.clone(), days));
        loaded.push(ticker.clone());
    }

    if loaded.is_empty() {
        return Err(MomtraderError::NoData {
            ticker: tickers.join(","),
        });
    }

    Ok(LoadedUniverse {
        data,
        loaded,
        skipped,
    })
}
