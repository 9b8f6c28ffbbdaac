// Technical indicator module: pure, stateless transforms over price slices
pub mod macd;
pub mod moving_average;
pub mod rsi;

pub use macd::calculate_macd;
pub use moving_average::{calculate_ema, calculate_ema_series, calculate_sma, calculate_std};
pub use rsi::calculate_rsi;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IndicatorError {
    #[error("insufficient data: got {got} samples, need {needed}")]
    InsufficientData { needed: usize, got: usize },
}

/// Shared length guard for every indicator: all of them fail outright on a
/// short series instead of returning a partially valid value.
pub(crate) fn require_len(prices: &[f64], needed: usize) -> Result<(), IndicatorError> {
    if prices.len() < needed {
        return Err(IndicatorError::InsufficientData {
            needed,
            got: prices.len(),
        });
    }
    Ok(())
}
