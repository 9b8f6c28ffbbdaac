use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order side as the exchange understands it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// Final verdict of the signal pipeline for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeDecision {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
        }
    }
}

/// OHLCV candlestick data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Window size fetched from the exchange each cycle
pub const SERIES_WINDOW: usize = 500;

/// Sliding window of candles, ordered by time, most-recent last.
///
/// Refreshed wholesale from the exchange every cycle; derived columns
/// (EMA, MACD, rolling volume average) are computed views, never stored.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    candles: Vec<Candle>,
}

impl PriceSeries {
    pub fn new(mut candles: Vec<Candle>) -> Self {
        if candles.len() > SERIES_WINDOW {
            candles.drain(..candles.len() - SERIES_WINDOW);
        }
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    pub fn last_volume(&self) -> Option<f64> {
        self.candles.last().map(|c| c.volume)
    }
}

/// Free/locked balance for one asset, as reported by the exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    pub free: f64,
    pub locked: f64,
}

impl AssetBalance {
    pub fn total(&self) -> f64 {
        self.free + self.locked
    }
}

/// Exchange-reported order, used both for open orders and order history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: u64,
    pub side: Side,
    pub status: String,
    pub executed_qty: f64,
    pub orig_qty: f64,
    pub price: f64,
    /// Quote volume actually traded; with executed_qty this recovers the
    /// average fill price of a FILLED order.
    pub cummulative_quote_qty: f64,
    pub time: DateTime<Utc>,
}

impl OpenOrder {
    pub fn is_filled(&self) -> bool {
        self.status == "FILLED"
    }

    /// Average fill price of an executed order, None if nothing executed
    pub fn avg_fill_price(&self) -> Option<f64> {
        if self.executed_qty > 0.0 {
            Some(self.cummulative_quote_qty / self.executed_qty)
        } else {
            None
        }
    }
}

/// Concrete order to submit, fully quantized by the planner.
///
/// Decimal counts are derived from the symbol's quanta so the wire
/// representation never carries more precision than the exchange accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: f64,
    pub price: Option<f64>,
    pub time_in_force: Option<String>,
    pub qty_decimals: usize,
    pub price_decimals: usize,
}

impl OrderRequest {
    pub fn quantity_repr(&self) -> String {
        format!("{:.*}", self.qty_decimals, self.quantity)
    }

    pub fn price_repr(&self) -> Option<String> {
        self.price
            .map(|p| format!("{:.*}", self.price_decimals, p))
    }
}

/// Conservative quantum used when the filter fetch fails at startup
pub const DEFAULT_QUANTUM: f64 = 0.00001;

/// Quantity/price quanta for a symbol.
///
/// Fetched once at startup and treated as immutable for the process
/// lifetime. The exchange can change its filters mid-run; that staleness
/// is a known, accepted risk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SymbolConstraints {
    pub step_size: f64,
    pub tick_size: f64,
}

impl SymbolConstraints {
    pub fn conservative_default() -> Self {
        Self {
            step_size: DEFAULT_QUANTUM,
            tick_size: DEFAULT_QUANTUM,
        }
    }
}
