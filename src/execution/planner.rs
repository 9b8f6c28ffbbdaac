use crate::indicators::{calculate_rsi, calculate_sma};
use crate::models::{OrderRequest, OrderType, PriceSeries, Side, SymbolConstraints};
use crate::risk::RiskLimits;
use thiserror::Error;

/// Volume lookback for the limit-price heuristic
const VOLUME_AVG_PERIOD: usize = 20;
const RSI_PERIOD: usize = 14;

/// Band widths of the three-way limit price heuristic
const TIGHT_BAND: f64 = 0.002;
const WIDE_BAND: f64 = 0.005;

/// Guard against `value/step` landing a hair under an exact multiple
const STEP_EPSILON: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("invalid step: {0}")]
    InvalidStep(f64),

    #[error("cannot plan order: {0}")]
    MissingData(&'static str),
}

/// Round down to the nearest multiple of `step`, never up: rounding up a
/// quantity could exceed the available balance, rounding up a price would
/// rest the order outside its intended band.
pub fn quantize(value: f64, step: f64) -> Result<f64, PlanError> {
    if step <= 0.0 {
        return Err(PlanError::InvalidStep(step));
    }
    let units = (value / step + STEP_EPSILON).floor();
    let quantized = units * step;

    // Strip float noise back onto the step grid
    let decimals = decimals_for_step(step);
    let scale = 10f64.powi(decimals as i32);
    Ok((quantized * scale).round() / scale)
}

/// Display precision implied by a quantum's magnitude
pub fn decimals_for_step(step: f64) -> usize {
    if step >= 1.0 || step <= 0.0 {
        return 0;
    }
    step.log10().floor().abs() as usize
}

/// Turns a trade decision plus a market snapshot into a concrete,
/// exchange-legal order request.
pub struct OrderPlanner {
    symbol: String,
    constraints: SymbolConstraints,
    limits: RiskLimits,
}

impl OrderPlanner {
    pub fn new(symbol: String, constraints: SymbolConstraints, limits: RiskLimits) -> Self {
        Self {
            symbol,
            constraints,
            limits,
        }
    }

    fn request(
        &self,
        side: Side,
        order_type: OrderType,
        quantity: f64,
        price: Option<f64>,
    ) -> OrderRequest {
        OrderRequest {
            symbol: self.symbol.clone(),
            side,
            order_type,
            quantity,
            price,
            time_in_force: matches!(order_type, OrderType::Limit).then(|| "GTC".to_string()),
            qty_decimals: decimals_for_step(self.constraints.step_size),
            price_decimals: decimals_for_step(self.constraints.tick_size),
        }
    }

    /// Market sell of the full held balance (the stop-loss exit path)
    pub fn market_sell(&self, balance: f64) -> Result<OrderRequest, PlanError> {
        let quantity = quantize(balance, self.constraints.step_size)?;
        Ok(self.request(Side::Sell, OrderType::Market, quantity, None))
    }

    /// Market buy of the configured quantity, discounted by what an open
    /// order of the same side already executed
    pub fn market_buy(&self, traded_qty: f64, partial_discount: f64) -> Result<OrderRequest, PlanError> {
        let quantity = quantize(traded_qty - partial_discount, self.constraints.step_size)?;
        Ok(self.request(Side::Buy, OrderType::Market, quantity, None))
    }

    /// Limit buy priced by the RSI/volume heuristic:
    /// oversold market -> bid under the close and wait for the dip,
    /// thin volume -> bid just over the close, otherwise pay up a little
    /// to get filled.
    pub fn limit_buy(
        &self,
        series: &PriceSeries,
        traded_qty: f64,
        partial_discount: f64,
    ) -> Result<OrderRequest, PlanError> {
        let (close, rsi, volume_below_avg) = snapshot(series)?;

        let raw_price = if rsi.is_some_and(|r| r < 30.0) {
            close * (1.0 - TIGHT_BAND)
        } else if volume_below_avg {
            close * (1.0 + TIGHT_BAND)
        } else {
            close * (1.0 + WIDE_BAND)
        };

        let price = quantize(raw_price, self.constraints.tick_size)?;
        let quantity = quantize(traded_qty - partial_discount, self.constraints.step_size)?;
        Ok(self.request(Side::Buy, OrderType::Limit, quantity, Some(price)))
    }

    /// Limit sell, mirror-priced, then clamped up to the acceptable-loss
    /// floor before quantization.
    pub fn limit_sell(
        &self,
        series: &PriceSeries,
        balance: f64,
        last_buy_price: f64,
    ) -> Result<OrderRequest, PlanError> {
        let (close, rsi, volume_below_avg) = snapshot(series)?;

        let raw_price = if rsi.is_some_and(|r| r > 70.0) {
            close * (1.0 + TIGHT_BAND)
        } else if volume_below_avg {
            close * (1.0 - TIGHT_BAND)
        } else {
            close * (1.0 - WIDE_BAND)
        };
        let floored = self.limits.clamp_sell_price(raw_price, last_buy_price);

        let price = quantize(floored, self.constraints.tick_size)?;
        let quantity = quantize(balance, self.constraints.step_size)?;
        Ok(self.request(Side::Sell, OrderType::Limit, quantity, Some(price)))
    }
}

/// (last close, RSI if computable, last volume below its rolling average)
fn snapshot(series: &PriceSeries) -> Result<(f64, Option<f64>, bool), PlanError> {
    let close = series
        .last_close()
        .ok_or(PlanError::MissingData("empty price series"))?;
    let volume = series
        .last_volume()
        .ok_or(PlanError::MissingData("empty price series"))?;

    let closes = series.closes();
    let volumes = series.volumes();
    // A short series degrades the heuristic, never fails the plan
    let rsi = calculate_rsi(&closes, RSI_PERIOD).ok();
    let volume_below_avg = calculate_sma(&volumes, VOLUME_AVG_PERIOD)
        .map(|avg| volume < avg)
        .unwrap_or(false);

    Ok((close, rsi, volume_below_avg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candle;
    use chrono::{Duration, TimeZone, Utc};

    fn series(closes: &[f64], volumes: &[f64]) -> PriceSeries {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        PriceSeries::new(
            closes
                .iter()
                .zip(volumes.iter())
                .enumerate()
                .map(|(i, (&close, &volume))| Candle {
                    open_time: start + Duration::minutes(i as i64 * 60),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume,
                })
                .collect(),
        )
    }

    fn planner(step: f64, tick: f64, acceptable: f64) -> OrderPlanner {
        OrderPlanner::new(
            "BTCUSDT".to_string(),
            SymbolConstraints {
                step_size: step,
                tick_size: tick,
            },
            RiskLimits {
                acceptable_loss_pct: acceptable,
                stop_loss_pct: acceptable.max(0.03),
            },
        )
    }

    #[test]
    fn test_quantize_floors() {
        assert_eq!(quantize(0.123456, 0.00001).unwrap(), 0.12345);
        assert_eq!(quantize(0.123456, 0.001).unwrap(), 0.123);
        assert_eq!(quantize(10.999, 1.0).unwrap(), 10.0);
    }

    #[test]
    fn test_quantize_idempotent_and_never_above_input() {
        for &value in &[0.123456, 1.0, 0.00001, 5.5555, 99.99999, 0.3] {
            for &step in &[0.00001, 0.001, 0.01, 0.5, 1.0] {
                let once = quantize(value, step).unwrap();
                let twice = quantize(once, step).unwrap();
                assert_eq!(once, twice, "value={value} step={step}");
                assert!(once <= value, "value={value} step={step} got {once}");
            }
        }
    }

    #[test]
    fn test_quantize_rejects_bad_step() {
        assert_eq!(quantize(1.0, 0.0), Err(PlanError::InvalidStep(0.0)));
        assert_eq!(quantize(1.0, -0.1), Err(PlanError::InvalidStep(-0.1)));
    }

    #[test]
    fn test_decimals_for_step() {
        assert_eq!(decimals_for_step(0.00001), 5);
        assert_eq!(decimals_for_step(0.001), 3);
        assert_eq!(decimals_for_step(0.01), 2);
        assert_eq!(decimals_for_step(1.0), 0);
        assert_eq!(decimals_for_step(10.0), 0);
    }

    #[test]
    fn test_market_buy_discounts_partial_fill() {
        let request = planner(0.001, 0.01, 0.1).market_buy(0.5, 0.2).unwrap();
        assert_eq!(request.order_type, OrderType::Market);
        assert_eq!(request.quantity, 0.3);
        assert!(request.price.is_none());
        assert!(request.time_in_force.is_none());
    }

    #[test]
    fn test_limit_buy_oversold_bids_below_close() {
        // Strictly falling closes pin RSI at zero
        let closes: Vec<f64> = (0..25).map(|i| 200.0 - i as f64).collect();
        let volumes = vec![1.0; 25];
        let request = planner(0.001, 0.01, 0.1)
            .limit_buy(&series(&closes, &volumes), 0.5, 0.0)
            .unwrap();

        let close = 176.0;
        assert_eq!(request.price, Some(quantize(close * 0.998, 0.01).unwrap()));
        assert_eq!(request.time_in_force.as_deref(), Some("GTC"));
    }

    #[test]
    fn test_limit_buy_thin_volume_bids_just_above_close() {
        // Flat closes keep RSI neutral; last volume is half the average
        let closes = vec![100.0; 25];
        let mut volumes = vec![1.0; 25];
        volumes[24] = 0.5;
        let request = planner(0.001, 0.01, 0.1)
            .limit_buy(&series(&closes, &volumes), 0.5, 0.0)
            .unwrap();

        assert_eq!(request.price, Some(quantize(100.0 * 1.002, 0.01).unwrap()));
    }

    #[test]
    fn test_limit_buy_default_pays_wide_band() {
        let closes = vec![100.0; 25];
        let volumes = vec![1.0; 25];
        let request = planner(0.001, 0.01, 0.1)
            .limit_buy(&series(&closes, &volumes), 0.5, 0.0)
            .unwrap();

        assert_eq!(request.price, Some(quantize(100.0 * 1.005, 0.01).unwrap()));
    }

    #[test]
    fn test_limit_sell_clamps_to_acceptable_loss_floor() {
        // close=85 -> raw sell price 84.575, floor at 100*(1-0.10)=90
        let closes = vec![85.0; 25];
        let volumes = vec![1.0; 25];
        let request = planner(0.001, 0.01, 0.1)
            .limit_sell(&series(&closes, &volumes), 0.5, 100.0)
            .unwrap();

        assert_eq!(request.price, Some(90.0));
    }

    #[test]
    fn test_limit_sell_overbought_asks_above_close() {
        // Strictly rising closes pin RSI at 100
        let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let volumes = vec![1.0; 25];
        let request = planner(0.001, 0.01, 0.1)
            .limit_sell(&series(&closes, &volumes), 0.5, 100.0)
            .unwrap();

        let close = 124.0;
        assert_eq!(request.price, Some(quantize(close * 1.002, 0.01).unwrap()));
    }

    #[test]
    fn test_market_sell_quantizes_full_balance() {
        let request = planner(0.001, 0.01, 0.1).market_sell(0.123456).unwrap();
        assert_eq!(request.quantity, 0.123);
        assert_eq!(request.side, Side::Sell);
    }

    #[test]
    fn test_empty_series_cannot_be_planned() {
        let request = planner(0.001, 0.01, 0.1).limit_buy(&series(&[], &[]), 0.5, 0.0);
        assert!(matches!(request, Err(PlanError::MissingData(_))));
    }
}
