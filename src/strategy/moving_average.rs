use super::Strategy;
use crate::indicators::calculate_sma;
use crate::models::{PriceSeries, Side};

/// Simple moving-average fallback.
///
/// Crossover-confirmed backstop for when the anticipatory strategy never
/// fires: price below the rolling average is treated as cheap (Buy), at or
/// above it as rich (Sell). Only ever consulted when the primary chain
/// abstained and the asset has the fallback flag enabled.
#[derive(Debug, Clone)]
pub struct MovingAverageStrategy {
    pub period: usize,
}

impl Default for MovingAverageStrategy {
    fn default() -> Self {
        Self { period: 20 }
    }
}

impl Strategy for MovingAverageStrategy {
    fn name(&self) -> &str {
        "MovingAverageStrategy"
    }

    fn evaluate(&self, series: &PriceSeries) -> Option<Side> {
        let closes = series.closes();
        let sma = calculate_sma(&closes, self.period).ok()?;
        let close = series.last_close()?;

        if close < sma {
            Some(Side::Buy)
        } else {
            Some(Side::Sell)
        }
    }
}
