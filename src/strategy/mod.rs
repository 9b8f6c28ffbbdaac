// Trading strategy module
pub mod ema_macd;
pub mod moving_average;

pub use ema_macd::EmaMacdStrategy;
pub use moving_average::MovingAverageStrategy;

use crate::models::{PriceSeries, Side, TradeDecision};

/// Base trait for all trading strategies.
///
/// A strategy either takes a side or abstains; abstention hands the
/// decision to the next strategy in the chain.
pub trait Strategy: Send + Sync {
    /// Strategy name for logging
    fn name(&self) -> &str;

    /// Evaluate the series; `None` means this strategy has no opinion
    fn evaluate(&self, series: &PriceSeries) -> Option<Side>;
}

/// Ordered strategy chain with first-non-abstain dispatch.
///
/// The fallback (when present) is only consulted after every primary
/// strategy abstained; if everything abstains the verdict is `Hold`.
pub struct StrategyChain {
    strategies: Vec<Box<dyn Strategy>>,
    fallback: Option<Box<dyn Strategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn Strategy>>, fallback: Option<Box<dyn Strategy>>) -> Self {
        Self {
            strategies,
            fallback,
        }
    }

    pub fn decide(&self, series: &PriceSeries) -> TradeDecision {
        for strategy in &self.strategies {
            if let Some(side) = strategy.evaluate(series) {
                tracing::info!("Decision from strategy: {}", strategy.name());
                return side.into();
            }
        }

        if let Some(fallback) = &self.fallback {
            tracing::info!("Primary strategies inconclusive, running fallback");
            if let Some(side) = fallback.evaluate(series) {
                return side.into();
            }
        }

        TradeDecision::Hold
    }
}

impl From<Side> for TradeDecision {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => TradeDecision::Buy,
            Side::Sell => TradeDecision::Sell,
        }
    }
}
