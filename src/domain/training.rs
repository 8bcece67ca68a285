//! Training-set construction and gradient-descent fitting for
//! [`LinearPredictor`].
//!
//! Samples only use rows dated strictly before the backtest start, so the
//! fitted model never sees the period it is evaluated on. The model is fitted
//! once on a fixed window and not re-fitted as the backtest walks forward.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::error::PredictorError;
use crate::domain::market_data::MarketData;
use crate::domain::predictor::{LinearPredictor, model_inputs};
use crate::domain::priced_day::FEATURE_COUNT;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingParams {
    pub lookback_window: usize,
    pub epochs: usize,
    pub learning_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub inputs: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Collect samples from rows in `[from, before)` for each ticker.
///
/// For target row `i`, the input is the `lookback_window` rows ending at
/// `i - 1` and the target is `close[i + 1] / close[i] - 1`. Both `i` and
/// `i + 1` must fall inside the range.
pub fn build_training_set(
    data: &MarketData,
    tickers: &[String],
    from: NaiveDate,
    before: NaiveDate,
    lookback_window: usize,
) -> TrainingSet {
    let mut set = TrainingSet::default();

    for ticker in tickers {
        let Some(series) = data.series(ticker) else {
            warn!(ticker = %ticker, "no training data");
            continue;
        };
        let rows: Vec<_> = series
            .before(before)
            .iter()
            .filter(|d| d.date >= from && !d.has_nan())
            .collect();

        let mut added = 0usize;
        for i in lookback_window..rows.len().saturating_sub(1) {
            let close = rows[i].close;
            if close <= 0.0 {
                continue;
            }
            let window: Vec<_> = rows[i - lookback_window..i]
                .iter()
                .map(|d| (*d).clone())
                .collect();
            set.inputs.push(model_inputs(&window));
            set.targets.push(rows[i + 1].close / close - 1.0);
            added += 1;
        }
        debug!(ticker = %ticker, samples = added, "training samples");
    }

    set
}

/// Full-batch gradient descent on mean squared error, zero-initialised.
pub fn fit_linear(
    set: &TrainingSet,
    params: &TrainingParams,
    before: NaiveDate,
) -> Result<LinearPredictor, PredictorError> {
    if set.is_empty() {
        return Err(PredictorError::NotTrained { before });
    }

    let mut model = LinearPredictor::zeroed(params.lookback_window);
    let width = params.lookback_window * FEATURE_COUNT;
    let n = set.len() as f64;

    for epoch in 0..params.epochs {
        let mut grad_w = vec![0.0; width];
        let mut grad_b = 0.0;
        let mut loss = 0.0;

        for (x, &y) in set.inputs.iter().zip(&set.targets) {
            let err = model.score(x) - y;
            loss += err * err;
            grad_b += err;
            for (g, xi) in grad_w.iter_mut().zip(x) {
                *g += err * xi;
            }
        }

        let step = 2.0 * params.learning_rate / n;
        for (w, g) in model.weights.iter_mut().zip(&grad_w) {
            *w -= step * g;
        }
        model.bias -= step * grad_b;

        if !model.bias.is_finite() || model.weights.iter().any(|w| !w.is_finite()) {
            return Err(PredictorError::Failed {
                reason: format!("training diverged at epoch {epoch}"),
            });
        }
        debug!(epoch, mse = loss / n, "training epoch");
    }

    info!(
        samples = set.len(),
        epochs = params.epochs,
        "linear predictor trained"
    );
    Ok(model)
}
