//! Forecasting port.

use crate::domain::error::PredictorError;
use crate::domain::priced_day::PricedDay;

/// Scores a ticker from its most recent feature rows.
///
/// Implementations are stateless per call; the engine only ever passes rows
/// dated strictly before the decision day.
pub trait Predictor {
    /// Number of rows `predict` expects.
    fn lookback_window(&self) -> usize;

    /// Forecast of next-period return for the ticker the window belongs to.
    fn predict(&self, window: &[PricedDay]) -> Result<f64, PredictorError>;
}

/// Shared input contract: exact length, no NaN anywhere in the window.
pub fn check_window(window: &[PricedDay], lookback_window: usize) -> Result<(), PredictorError> {
    if window.len() != lookback_window {
        return Err(PredictorError::InvalidInput {
            reason: format!(
                "window has {} rows, expected {}",
                window.len(),
                lookback_window
            ),
        });
    }
    if let Some(day) = window.iter().find(|d| d.has_nan()) {
        return Err(PredictorError::InvalidInput {
            reason: format!("NaN feature on {}", day.date),
        });
    }
    Ok(())
}
