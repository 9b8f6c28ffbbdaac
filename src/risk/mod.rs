// Risk management module: evaluated before any strategy verdict is acted on
use crate::models::PriceSeries;

/// Loss guardrails for one asset, both expressed as positive fractions of
/// the last buy price.
///
/// `stop_loss_pct` is expected to be >= `acceptable_loss_pct`; the inverse
/// makes the stop loss unreachable behind the acceptable-loss floor. That
/// ordering is warned about at config load, not enforced.
#[derive(Debug, Clone, Copy)]
pub struct RiskLimits {
    pub acceptable_loss_pct: f64,
    pub stop_loss_pct: f64,
}

impl RiskLimits {
    /// Price below which the stop loss arms
    pub fn stop_loss_price(&self, last_buy_price: f64) -> f64 {
        last_buy_price * (1.0 - self.stop_loss_pct)
    }

    /// Floor under any limit sell: the agent prefers a bounded-loss sale
    /// over refusing to sell at all.
    pub fn minimum_sell_price(&self, last_buy_price: f64) -> f64 {
        last_buy_price * (1.0 - self.acceptable_loss_pct)
    }

    /// Clamp a computed limit sell price up to the acceptable-loss floor
    pub fn clamp_sell_price(&self, limit_price: f64, last_buy_price: f64) -> f64 {
        let floor = self.minimum_sell_price(last_buy_price);
        if limit_price < floor {
            tracing::info!(
                "Acceptable-loss adjustment ({:.1}%): {:.8} -> {:.8}",
                self.acceptable_loss_pct * 100.0,
                limit_price,
                floor
            );
            floor
        } else {
            limit_price
        }
    }

    /// Stop-loss trigger: fires only while long, and only when both the
    /// latest and the second-latest close sit below the stop price. A
    /// single-candle dip is noise, not a liquidation reason.
    pub fn stop_loss_triggered(&self, series: &PriceSeries, held: bool, last_buy_price: f64) -> bool {
        if !held || last_buy_price <= 0.0 {
            return false;
        }
        let candles = series.candles();
        if candles.len() < 2 {
            return false;
        }

        let latest = candles[candles.len() - 1].close;
        let previous = candles[candles.len() - 2].close;
        let stop_price = self.stop_loss_price(last_buy_price);

        latest < stop_price && previous < stop_price
    }
}
