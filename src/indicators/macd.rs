use super::moving_average::calculate_ema_series;
use super::{require_len, IndicatorError};

/// MACD output: the line and its smoothed signal, full series each
#[derive(Debug, Clone)]
pub struct Macd {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
}

impl Macd {
    pub fn last(&self) -> (f64, f64) {
        (
            *self.macd_line.last().unwrap_or(&0.0),
            *self.signal_line.last().unwrap_or(&0.0),
        )
    }
}

/// Calculate MACD (Moving Average Convergence Divergence)
///
/// `macd_line = EMA(prices, fast) - EMA(prices, slow)`, and the signal line
/// is the EMA of the MACD line over the signal period.
pub fn calculate_macd(
    prices: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<Macd, IndicatorError> {
    require_len(prices, slow.max(signal))?;

    let fast_ema = calculate_ema_series(prices, fast)?;
    let slow_ema = calculate_ema_series(prices, slow)?;

    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = calculate_ema_series(&macd_line, signal)?;

    Ok(Macd {
        macd_line,
        signal_line,
    })
}
