use super::Strategy;
use crate::indicators::{calculate_ema_series, calculate_macd};
use crate::models::{PriceSeries, Side};

/// Samples used to measure the gradient of an average
const GRADIENT_WINDOW: usize = 3;

/// Anticipatory EMA/MACD strategy.
///
/// Instead of waiting for fast EMA to confirm a crossover of the slow EMA,
/// this trades on the gradient: a buy fires while the MACD line sits above
/// its signal line and the fast EMA is climbing more steeply than the slow
/// one. That catches both the confirmed crossover (fast already above slow)
/// and the anticipated one (fast still below slow but converging), at the
/// cost of more false positives than a lagging crossover rule.
///
/// A verdict is only emitted on a crossing event: the condition must hold
/// on the latest sample and not on the one before it. Without that, the
/// strategy would re-signal on every cycle spent inside a trend.
#[derive(Debug, Clone)]
pub struct EmaMacdStrategy {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl Default for EmaMacdStrategy {
    fn default() -> Self {
        Self {
            fast_period: 7,
            slow_period: 25,
            signal_period: 7,
        }
    }
}

impl EmaMacdStrategy {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast_period,
            slow_period,
            signal_period,
        }
    }

    /// Gradient over the trailing GRADIENT_WINDOW samples ending at `i`
    fn gradient(series: &[f64], i: usize) -> Option<f64> {
        if i + 1 < GRADIENT_WINDOW {
            return None;
        }
        Some((series[i] - series[i + 1 - GRADIENT_WINDOW]) / (GRADIENT_WINDOW - 1) as f64)
    }

    /// Raw directional condition at sample `i`, ignoring crossing detection
    fn condition_at(
        fast_ema: &[f64],
        slow_ema: &[f64],
        macd_line: &[f64],
        signal_line: &[f64],
        i: usize,
    ) -> Option<Side> {
        let fast_grad = Self::gradient(fast_ema, i)?;
        let slow_grad = Self::gradient(slow_ema, i)?;

        if macd_line[i] > signal_line[i] && fast_grad > 0.0 && fast_grad > slow_grad {
            return Some(Side::Buy);
        }
        if macd_line[i] < signal_line[i] && fast_grad < 0.0 && fast_grad < slow_grad {
            return Some(Side::Sell);
        }
        None
    }
}

impl Strategy for EmaMacdStrategy {
    fn name(&self) -> &str {
        "EmaMacdStrategy"
    }

    fn evaluate(&self, series: &PriceSeries) -> Option<Side> {
        if series.len() < GRADIENT_WINDOW {
            return None;
        }

        let closes = series.closes();
        // Indicator failures degrade to abstention, never abort a cycle
        let fast_ema = calculate_ema_series(&closes, self.fast_period).ok()?;
        let slow_ema = calculate_ema_series(&closes, self.slow_period).ok()?;
        let macd = calculate_macd(
            &closes,
            self.fast_period,
            self.slow_period,
            self.signal_period,
        )
        .ok()?;

        let last = closes.len() - 1;
        let now = Self::condition_at(
            &fast_ema,
            &slow_ema,
            &macd.macd_line,
            &macd.signal_line,
            last,
        )?;
        let prev = Self::condition_at(
            &fast_ema,
            &slow_ema,
            &macd.macd_line,
            &macd.signal_line,
            last - 1,
        );

        // Crossing event only: suppress re-signaling inside a trend
        if prev == Some(now) {
            return None;
        }
        Some(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candle;
    use chrono::{Duration, TimeZone, Utc};

    fn series_from(closes: &[f64]) -> PriceSeries {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| Candle {
                    open_time: start + Duration::minutes(i as i64 * 60),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1.0,
                })
                .collect(),
        )
    }

    /// Short periods keep the fixtures small; semantics are period-independent
    fn strategy() -> EmaMacdStrategy {
        EmaMacdStrategy::new(3, 5, 3)
    }

    #[test]
    fn test_abstains_below_three_samples() {
        assert_eq!(strategy().evaluate(&series_from(&[100.0, 101.0])), None);
        assert_eq!(strategy().evaluate(&series_from(&[100.0])), None);
        assert_eq!(strategy().evaluate(&series_from(&[])), None);
    }

    #[test]
    fn test_abstains_when_indicators_lack_data() {
        // Default periods need 25 samples for the slow EMA
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        assert_eq!(EmaMacdStrategy::default().evaluate(&series_from(&closes)), None);
    }

    #[test]
    fn test_buy_on_reversal_crossing() {
        // Decline, then a sharp turn upward: the cycle where the upward
        // condition first holds must produce exactly one Buy.
        let mut closes: Vec<f64> = (0..15).map(|i| 130.0 - i as f64).collect();
        closes.extend([118.0, 122.0, 126.0, 130.0, 134.0]);

        let strategy = strategy();
        let mut verdicts = Vec::new();
        for n in 3..=closes.len() {
            verdicts.push(strategy.evaluate(&series_from(&closes[..n])));
        }

        let buys = verdicts.iter().filter(|v| **v == Some(Side::Buy)).count();
        assert_eq!(buys, 1, "exactly one buy crossing, got {:?}", verdicts);
        // After the crossing the strategy stays quiet
        assert_eq!(verdicts.last(), Some(&None));
    }

    #[test]
    fn test_sell_is_mirror_of_buy() {
        let mut closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        closes.extend([112.0, 108.0, 104.0, 100.0, 96.0]);

        let strategy = strategy();
        let mut verdicts = Vec::new();
        for n in 3..=closes.len() {
            verdicts.push(strategy.evaluate(&series_from(&closes[..n])));
        }

        let sells = verdicts.iter().filter(|v| **v == Some(Side::Sell)).count();
        assert_eq!(sells, 1, "exactly one sell crossing, got {:?}", verdicts);
    }

    #[test]
    fn test_crossing_suppression_inside_trend() {
        // Monotonic rise: the buy condition holds on both the latest and the
        // previous sample, so no fresh verdict is emitted.
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let strategy = strategy();

        let fast = calculate_ema_series(&closes, strategy.fast_period).unwrap();
        let slow = calculate_ema_series(&closes, strategy.slow_period).unwrap();
        let macd = calculate_macd(&closes, 3, 5, 3).unwrap();

        // The raw condition is a steady Buy deep inside the trend
        let last = closes.len() - 1;
        assert!(fast[last] > slow[last]);
        let fast_grad = EmaMacdStrategy::gradient(&fast, last).unwrap();
        let slow_grad = EmaMacdStrategy::gradient(&slow, last).unwrap();
        assert!(fast_grad > 0.0 && fast_grad > slow_grad);
        assert_eq!(
            EmaMacdStrategy::condition_at(&fast, &slow, &macd.macd_line, &macd.signal_line, last),
            Some(Side::Buy)
        );

        // ...but the crossing filter keeps the strategy quiet
        assert_eq!(strategy.evaluate(&series_from(&closes)), None);
    }

    #[test]
    fn test_flat_series_has_no_opinion() {
        let closes = vec![100.0; 40];
        assert_eq!(strategy().evaluate(&series_from(&closes)), None);
    }
}
