//! Feature table construction and window scaling.
//!
//! Turns raw daily bars into [`PricedDay`] rows carrying SMA 9, SMA 21 and
//! RSI 14. Rows before every indicator has warmed up are dropped, as are bars
//! with NaN prices.

use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::priced_day::{FEATURE_COUNT, Indicators, PricedDay, RawBar};

pub const SMA_SHORT: usize = 9;
pub const SMA_LONG: usize = 21;
pub const RSI_PERIOD: usize = 14;

/// Number of leading rows consumed by indicator warmup.
pub const WARMUP_ROWS: usize = SMA_LONG - 1;

pub type FeatureRow = [f64; FEATURE_COUNT];

pub fn build_priced_days(bars: &[RawBar]) -> Vec<PricedDay> {
    let clean: Vec<RawBar> = bars.iter().filter(|b| !b.has_nan()).cloned().collect();

    let sma_short = calculate_sma(&clean, SMA_SHORT);
    let sma_long = calculate_sma(&clean, SMA_LONG);
    let rsi = calculate_rsi(&clean, RSI_PERIOD);

    clean
        .iter()
        .enumerate()
        .filter_map(|(i, bar)| {
            let indicators = Indicators {
                sma_9: sma_short.value_at(i)?,
                sma_21: sma_long.value_at(i)?,
                rsi_14: rsi.value_at(i)?,
            };
            Some(PricedDay {
                date: bar.date,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                indicators,
            })
        })
        .collect()
}

/// Min-max scale each feature column of `window` into [0, 1].
///
/// A constant column scales to 0.
pub fn min_max_scale(window: &[FeatureRow]) -> Vec<FeatureRow> {
    let mut mins = [f64::INFINITY; FEATURE_COUNT];
    let mut maxs = [f64::NEG_INFINITY; FEATURE_COUNT];
    for row in window {
        for (col, &v) in row.iter().enumerate() {
            mins[col] = mins[col].min(v);
            maxs[col] = maxs[col].max(v);
        }
    }

    window
        .iter()
        .map(|row| {
            let mut scaled = [0.0; FEATURE_COUNT];
            for (col, &v) in row.iter().enumerate() {
                let range = maxs[col] - mins[col];
                scaled[col] = if range > 0.0 {
                    (v - mins[col]) / range
                } else {
                    0.0
                };
            }
            scaled
        })
        .collect()
}
