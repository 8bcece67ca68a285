//! Built-in predictors.
//!
//! - [`MomentumPredictor`]: trailing return across the window, no training.
//! - [`LinearPredictor`]: linear model over the min-max scaled window, fitted
//!   by [`crate::domain::training`].

use crate::domain::error::PredictorError;
use crate::domain::features::{FeatureRow, min_max_scale};
use crate::domain::priced_day::{FEATURE_COUNT, PricedDay};
use crate::ports::predictor_port::{Predictor, check_window};

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumPredictor {
    pub lookback_window: usize,
}

impl MomentumPredictor {
    pub fn new(lookback_window: usize) -> Self {
        Self { lookback_window }
    }
}

impl Predictor for MomentumPredictor {
    fn lookback_window(&self) -> usize {
        self.lookback_window
    }

    /// last close / first close - 1
    fn predict(&self, window: &[PricedDay]) -> Result<f64, PredictorError> {
        check_window(window, self.lookback_window)?;
        let (first, last) = match (window.first(), window.last()) {
            (Some(f), Some(l)) => (f.close, l.close),
            _ => {
                return Err(PredictorError::InvalidInput {
                    reason: "empty window".into(),
                });
            }
        };
        if first <= 0.0 {
            return Err(PredictorError::InvalidInput {
                reason: format!("non-positive close {first}"),
            });
        }
        Ok(last / first - 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearPredictor {
    pub lookback_window: usize,
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LinearPredictor {
    /// Untrained model: every forecast is zero.
    pub fn zeroed(lookback_window: usize) -> Self {
        Self {
            lookback_window,
            weights: vec![0.0; lookback_window * FEATURE_COUNT],
            bias: 0.0,
        }
    }

    pub fn score(&self, inputs: &[f64]) -> f64 {
        self.bias
            + self
                .weights
                .iter()
                .zip(inputs)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

impl Predictor for LinearPredictor {
    fn lookback_window(&self) -> usize {
        self.lookback_window
    }

    fn predict(&self, window: &[PricedDay]) -> Result<f64, PredictorError> {
        check_window(window, self.lookback_window)?;
        let inputs = model_inputs(window);
        if inputs.len() != self.weights.len() {
            return Err(PredictorError::InvalidInput {
                reason: format!(
                    "{} inputs for {} weights",
                    inputs.len(),
                    self.weights.len()
                ),
            });
        }
        Ok(self.score(&inputs))
    }
}

/// Flattened, per-window min-max scaled feature matrix.
pub fn model_inputs(window: &[PricedDay]) -> Vec<f64> {
    let rows: Vec<FeatureRow> = window.iter().map(PricedDay::feature_row).collect();
    min_max_scale(&rows).into_iter().flatten().collect()
}
