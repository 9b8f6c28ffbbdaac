use super::{ExchangeClient, ExchangeError};
use crate::models::{
    AssetBalance, Candle, OpenOrder, OrderRequest, OrderType, Side, SymbolConstraints,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use serde::Deserialize;
use sha2::Sha256;
use std::num::NonZeroU32;
use std::sync::Arc;

const BINANCE_API_BASE: &str = "https://api.binance.com";
const RATE_LIMIT_RPS: u32 = 10;

type HmacSha256 = Hmac<Sha256>;

// Type alias for the rate limiter to simplify signatures
type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Binance spot REST client.
///
/// Cloneable so the per-asset tasks can share one credential set; all
/// clones share the same rate limiter.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    api_key: String,
    secret_key: String,
    base_url: String,
    rate_limiter: Arc<BinanceRateLimiter>,
}

#[derive(Debug, Deserialize)]
struct RawBalance {
    asset: String,
    free: String,
    locked: String,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    balances: Vec<RawBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFilter {
    filter_type: String,
    #[serde(default)]
    step_size: Option<String>,
    #[serde(default)]
    tick_size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSymbolInfo {
    filters: Vec<RawFilter>,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<RawSymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrder {
    order_id: u64,
    side: String,
    status: String,
    executed_qty: String,
    orig_qty: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    cummulative_quote_qty: String,
    #[serde(default)]
    time: i64,
    #[serde(default)]
    transact_time: i64,
}

fn parse_f64(field: &str, value: &str) -> Result<f64, ExchangeError> {
    if value.is_empty() {
        return Ok(0.0);
    }
    value
        .parse::<f64>()
        .map_err(|e| ExchangeError::Payload(format!("bad {field} value {value:?}: {e}")))
}

fn parse_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

impl TryFrom<RawOrder> for OpenOrder {
    type Error = ExchangeError;

    fn try_from(raw: RawOrder) -> Result<Self, ExchangeError> {
        let side = match raw.side.as_str() {
            "BUY" => Side::Buy,
            "SELL" => Side::Sell,
            other => {
                return Err(ExchangeError::Payload(format!("unknown order side {other:?}")));
            }
        };
        // Order-placement responses carry transactTime instead of time
        let millis = if raw.time > 0 { raw.time } else { raw.transact_time };

        Ok(OpenOrder {
            order_id: raw.order_id,
            side,
            status: raw.status,
            executed_qty: parse_f64("executedQty", &raw.executed_qty)?,
            orig_qty: parse_f64("origQty", &raw.orig_qty)?,
            price: parse_f64("price", &raw.price)?,
            cummulative_quote_qty: parse_f64("cummulativeQuoteQty", &raw.cummulative_quote_qty)?,
            time: parse_millis(millis),
        })
    }
}

impl BinanceClient {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self::with_base_url(api_key, secret_key, BINANCE_API_BASE.to_string())
    }

    /// Base URL override, used by the HTTP-level tests
    pub fn with_base_url(api_key: String, secret_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let quota = Quota::per_second(NonZeroU32::new(RATE_LIMIT_RPS).unwrap());

        Self {
            client,
            api_key,
            secret_key,
            base_url,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    fn sign_query(&self, mut params: Vec<(&str, String)>) -> Result<String, ExchangeError> {
        params.push(("timestamp", Utc::now().timestamp_millis().to_string()));
        let query: String = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| ExchangeError::Signing(e.to_string()))?;
        mac.update(query.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{query}&signature={signature}"))
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        url: String,
    ) -> Result<T, ExchangeError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }

    async fn send_signed<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> Result<T, ExchangeError> {
        let query = self.sign_query(params)?;
        self.send(method, format!("{}{}?{}", self.base_url, endpoint, query))
            .await
    }
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    async fn account_balances(&self) -> Result<Vec<AssetBalance>, ExchangeError> {
        let info: AccountInfo = self
            .send_signed(Method::GET, "/api/v3/account", vec![])
            .await?;

        info.balances
            .into_iter()
            .map(|b| {
                Ok(AssetBalance {
                    free: parse_f64("free", &b.free)?,
                    locked: parse_f64("locked", &b.locked)?,
                    asset: b.asset,
                })
            })
            .collect()
    }

    async fn klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url, symbol, interval, limit
        );
        // Binance klines come as heterogeneous arrays:
        // [openTime, open, high, low, close, volume, ...]
        let rows: Vec<Vec<serde_json::Value>> = self.send(Method::GET, url).await?;

        rows.into_iter()
            .map(|row| {
                if row.len() < 6 {
                    return Err(ExchangeError::Payload(format!(
                        "kline row too short: {} fields",
                        row.len()
                    )));
                }
                let open_time = row[0]
                    .as_i64()
                    .ok_or_else(|| ExchangeError::Payload("kline open time not an integer".into()))?;
                let field = |i: usize, name: &str| -> Result<f64, ExchangeError> {
                    let s = row[i].as_str().ok_or_else(|| {
                        ExchangeError::Payload(format!("kline {name} not a string"))
                    })?;
                    parse_f64(name, s)
                };

                Ok(Candle {
                    open_time: parse_millis(open_time),
                    open: field(1, "open")?,
                    high: field(2, "high")?,
                    low: field(3, "low")?,
                    close: field(4, "close")?,
                    volume: field(5, "volume")?,
                })
            })
            .collect()
    }

    async fn symbol_filters(&self, symbol: &str) -> Result<SymbolConstraints, ExchangeError> {
        let url = format!("{}/api/v3/exchangeInfo?symbol={}", self.base_url, symbol);
        let info: ExchangeInfo = self.send(Method::GET, url).await?;

        let symbol_info = info
            .symbols
            .first()
            .ok_or_else(|| ExchangeError::Payload(format!("no exchange info for {symbol}")))?;

        let mut constraints = SymbolConstraints::conservative_default();
        for filter in &symbol_info.filters {
            match filter.filter_type.as_str() {
                "LOT_SIZE" => {
                    if let Some(step) = &filter.step_size {
                        constraints.step_size = parse_f64("stepSize", step)?;
                    }
                }
                "PRICE_FILTER" => {
                    if let Some(tick) = &filter.tick_size {
                        constraints.tick_size = parse_f64("tickSize", tick)?;
                    }
                }
                _ => {}
            }
        }
        Ok(constraints)
    }

    async fn open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, ExchangeError> {
        let raw: Vec<RawOrder> = self
            .send_signed(
                Method::GET,
                "/api/v3/openOrders",
                vec![("symbol", symbol.to_string())],
            )
            .await?;
        raw.into_iter().map(OpenOrder::try_from).collect()
    }

    async fn order_history(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<OpenOrder>, ExchangeError> {
        let raw: Vec<RawOrder> = self
            .send_signed(
                Method::GET,
                "/api/v3/allOrders",
                vec![("symbol", symbol.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        raw.into_iter().map(OpenOrder::try_from).collect()
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<OpenOrder, ExchangeError> {
        let mut params = vec![
            ("symbol", request.symbol.clone()),
            ("side", request.side.as_str().to_string()),
            ("type", request.order_type.as_str().to_string()),
            ("quantity", request.quantity_repr()),
        ];
        if let Some(price) = request.price_repr() {
            params.push(("price", price));
        }
        if let Some(tif) = &request.time_in_force {
            params.push(("timeInForce", tif.clone()));
        }

        tracing::info!(
            "Sending {} {} order: {} {} @ {}",
            request.order_type.as_str(),
            request.side.as_str(),
            request.quantity_repr(),
            request.symbol,
            request.price_repr().unwrap_or_else(|| "market".to_string())
        );

        let raw: RawOrder = self
            .send_signed(Method::POST, "/api/v3/order", params)
            .await?;
        OpenOrder::try_from(raw)
    }

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<(), ExchangeError> {
        let _: serde_json::Value = self
            .send_signed(
                Method::DELETE,
                "/api/v3/order",
                vec![
                    ("symbol", symbol.to_string()),
                    ("orderId", order_id.to_string()),
                ],
            )
            .await?;
        Ok(())
    }
}
