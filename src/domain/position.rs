//! Open positions and the position book.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::collections::{BTreeMap, btree_map::Entry};

use super::error::PositionError;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub ticker: String,
    /// Post-slippage fill price of the opening buy.
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub quantity: u64,
    pub last_marked_price: f64,
}

impl Position {
    /// Move of `nominal_price` relative to the actual entry fill.
    pub fn trigger_pct(&self, nominal_price: f64) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        (nominal_price - self.entry_price) / self.entry_price
    }

    /// Calendar days since entry.
    pub fn days_held(&self, today: NaiveDate) -> i64 {
        (today - self.entry_date).num_days()
    }
}

/// Open positions keyed by ticker, at most one per ticker. Iterates in ticker order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionBook {
    positions: BTreeMap<String, Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(
        &mut self,
        ticker: &str,
        fill_price: f64,
        date: NaiveDate,
        quantity: u64,
    ) -> Result<&Position, PositionError> {
        match self.positions.entry(ticker.to_string()) {
            Entry::Occupied(_) => Err(PositionError::Duplicate {
                ticker: ticker.to_string(),
            }),
            Entry::Vacant(slot) => Ok(slot.insert(Position {
                ticker: ticker.to_string(),
                entry_price: fill_price,
                entry_date: date,
                quantity,
                last_marked_price: fill_price,
            })),
        }
    }

    pub fn close(&mut self, ticker: &str) -> Result<Position, PositionError> {
        self.positions
            .remove(ticker)
            .ok_or_else(|| PositionError::NoSuch {
                ticker: ticker.to_string(),
            })
    }

    /// Update the mark; a ticker that is no longer held is ignored.
    pub fn mark(&mut self, ticker: &str, price: f64) {
        if let Some(position) = self.positions.get_mut(ticker) {
            position.last_marked_price = price;
        }
    }

    /// Value of all positions at the supplied prices, falling back to each
    /// position's last mark where a price is missing or NaN.
    pub fn holdings_value(&self, prices_by_ticker: &HashMap<String, f64>) -> f64 {
        self.positions
            .values()
            .map(|pos| {
                let price = prices_by_ticker
                    .get(&pos.ticker)
                    .copied()
                    .filter(|p| !p.is_nan())
                    .unwrap_or(pos.last_marked_price);
                pos.quantity as f64 * price
            })
            .sum()
    }

    pub fn get(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(ticker)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.positions.contains_key(ticker)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn tickers(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }
}
