//! Fill simulation: slippage and transaction costs.
//!
//! Slippage always moves the fill against the trader:
//! - Buy:  fill = nominal * (1 + slippage_pct)
//! - Sell: fill = nominal * (1 - slippage_pct)
//!
//! Transaction cost is charged once per side: fill * quantity * transaction_cost_pct.

use serde::Serialize;
use std::fmt;

use super::error::ExecutionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

/// Fixed per-run execution costs. Rates are fractions (0.0005 = 0.05%).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionModel {
    pub slippage_pct: f64,
    pub transaction_cost_pct: f64,
}

impl ExecutionModel {
    pub fn new(slippage_pct: f64, transaction_cost_pct: f64) -> Self {
        ExecutionModel {
            slippage_pct,
            transaction_cost_pct,
        }
    }

    pub fn fill_price(&self, nominal_price: f64, side: Side) -> Result<f64, ExecutionError> {
        if nominal_price.is_nan() || nominal_price <= 0.0 {
            return Err(ExecutionError::InvalidPrice {
                price: nominal_price,
            });
        }
        Ok(match side {
            Side::Buy => nominal_price * (1.0 + self.slippage_pct),
            Side::Sell => nominal_price * (1.0 - self.slippage_pct),
        })
    }

    pub fn transaction_cost(&self, fill_price: f64, quantity: u64) -> f64 {
        fill_price * quantity as f64 * self.transaction_cost_pct
    }
}
