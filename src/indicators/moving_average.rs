use super::{require_len, IndicatorError};

/// Calculate Simple Moving Average (SMA) over the trailing window
pub fn calculate_sma(prices: &[f64], period: usize) -> Result<f64, IndicatorError> {
    require_len(prices, period)?;

    let sum: f64 = prices.iter().rev().take(period).sum();
    Ok(sum / period as f64)
}

/// Calculate Exponential Moving Average (EMA)
///
/// Smoothing factor `2 / (period + 1)`, seeded by assignment from the first
/// sample (no warm-up bias correction), matching `ewm(span, adjust=False)`.
pub fn calculate_ema(prices: &[f64], period: usize) -> Result<f64, IndicatorError> {
    let series = calculate_ema_series(prices, period)?;
    // Guard above guarantees at least one sample
    Ok(*series.last().unwrap())
}

/// Full EMA series, one value per input sample.
///
/// Strategies need the trailing values to measure the gradient of the
/// average, not just its latest point.
pub fn calculate_ema_series(prices: &[f64], period: usize) -> Result<Vec<f64>, IndicatorError> {
    require_len(prices, period.max(1))?;

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut series = Vec::with_capacity(prices.len());
    let mut ema = prices[0];
    series.push(ema);
    for price in &prices[1..] {
        ema = (price - ema) * multiplier + ema;
        series.push(ema);
    }
    Ok(series)
}

/// Rolling standard deviation over the trailing window (sample std),
/// the volatility column of the price series.
pub fn calculate_std(prices: &[f64], period: usize) -> Result<f64, IndicatorError> {
    require_len(prices, period.max(2))?;

    let window = &prices[prices.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance =
        window.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (period as f64 - 1.0);
    Ok(variance.sqrt())
}
