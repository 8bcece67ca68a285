//! Daily price record with derived indicators.

use chrono::NaiveDate;

/// Number of columns in a feature row.
pub const FEATURE_COUNT: usize = 8;

/// Indicator values computed from the closes up to and including a day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indicators {
    pub sma_9: f64,
    pub sma_21: f64,
    pub rsi_14: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedDay {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub indicators: Indicators,
}

impl PricedDay {
    /// open, high, low, close, volume, sma_9, sma_21, rsi_14
    pub fn feature_row(&self) -> [f64; FEATURE_COUNT] {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.indicators.sma_9,
            self.indicators.sma_21,
            self.indicators.rsi_14,
        ]
    }

    pub fn has_nan(&self) -> bool {
        self.feature_row().iter().any(|v| v.is_nan())
    }
}

/// Raw daily bar as read from a data source, before indicators exist.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl RawBar {
    pub fn has_nan(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .any(|v| v.is_nan())
    }
}
