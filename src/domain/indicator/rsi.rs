//! RSI as a movement ratio over a rolling window of closes.
//!
//! For each window of `n` closes, the first change is taken as zero and
//! RSI = 100 * sum(positive changes) / sum(|changes|).
//!
//! When the window shows no movement at all the value is [`RSI_NEUTRAL`].
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::priced_day::RawBar;

/// RSI reported for a window whose total absolute movement is zero.
pub const RSI_NEUTRAL: f64 = 50.0;

pub fn calculate_rsi(bars: &[RawBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values: bars
                .iter()
                .map(|b| IndicatorPoint {
                    date: b.date,
                    valid: false,
                    value: 0.0,
                })
                .collect(),
        };
    }

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i + 1 < period {
                return IndicatorPoint {
                    date: bar.date,
                    valid: false,
                    value: 0.0,
                };
            }
            let window = &bars[i + 1 - period..=i];
            IndicatorPoint {
                date: bar.date,
                valid: true,
                value: movement_ratio(window),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn movement_ratio(window: &[RawBar]) -> f64 {
    let (gains, movement) = window
        .windows(2)
        .map(|w| w[1].close - w[0].close)
        .fold((0.0_f64, 0.0_f64), |(gains, movement), change| {
            (gains + change.max(0.0), movement + change.abs())
        });

    if movement == 0.0 {
        RSI_NEUTRAL
    } else {
        gains / movement * 100.0
    }
}
