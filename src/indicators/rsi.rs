use super::{require_len, IndicatorError};

/// Calculate Relative Strength Index (RSI)
///
/// Wilder-style rolling mean of positive and negative deltas over the
/// trailing window: `100 - 100 / (1 + avg_gain / avg_loss)`.
///
/// Values:
/// - RSI > 70: overbought
/// - RSI < 30: oversold
pub fn calculate_rsi(prices: &[f64], period: usize) -> Result<f64, IndicatorError> {
    require_len(prices, period + 1)?;

    let mut gains = 0.0;
    let mut losses = 0.0;
    for window in prices[prices.len() - period - 1..].windows(2) {
        let change = window[1] - window[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses += change.abs();
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        // No losing candle in the window: saturated momentum, unless the
        // series was completely flat, which has no momentum either way.
        if avg_gain == 0.0 {
            return Ok(50.0);
        }
        return Ok(100.0);
    }

    let rs = avg_gain / avg_loss;
    Ok(100.0 - (100.0 / (1.0 + rs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_calculation() {
        let prices = vec![
            44.0, 44.25, 44.5, 43.75, 44.0, 44.5, 45.0, 45.5, 45.25, 45.5, 46.0, 46.5, 46.25,
            46.0, 46.5,
        ];

        let rsi = calculate_rsi(&prices, 14).unwrap();
        assert!(rsi > 50.0 && rsi < 100.0);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let prices = vec![100.0, 102.0, 101.0];
        assert_eq!(
            calculate_rsi(&prices, 14),
            Err(IndicatorError::InsufficientData { needed: 15, got: 3 })
        );
    }

    #[test]
    fn test_rsi_all_gains() {
        let prices = vec![100.0, 101.0, 102.0, 103.0, 104.0, 105.0];
        assert_eq!(calculate_rsi(&prices, 5), Ok(100.0));
    }

    #[test]
    fn test_rsi_flat_series_is_neutral() {
        let prices = vec![100.0; 20];
        assert_eq!(calculate_rsi(&prices, 14), Ok(50.0));
    }

    #[test]
    fn test_rsi_uses_trailing_window_only() {
        // A big spike outside the window must not affect the result
        let mut prices = vec![1000.0, 1.0];
        prices.extend((0..15).map(|i| 100.0 + i as f64));
        assert_eq!(calculate_rsi(&prices, 14), Ok(100.0));
    }
}
