// Exchange connectivity module
pub mod binance;

pub use binance::BinanceClient;

use crate::models::{AssetBalance, Candle, OpenOrder, OrderRequest, SymbolConstraints};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("exchange rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected payload: {0}")]
    Payload(String),

    #[error("request signing failed: {0}")]
    Signing(String),
}

/// Capability the core consumes; every call is a fallible blocking
/// round-trip and every failure is recoverable within the cycle's own
/// retry/backoff policy, never fatal to the process.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn account_balances(&self) -> Result<Vec<AssetBalance>, ExchangeError>;

    async fn klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError>;

    async fn symbol_filters(&self, symbol: &str) -> Result<SymbolConstraints, ExchangeError>;

    async fn open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, ExchangeError>;

    async fn order_history(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<OpenOrder>, ExchangeError>;

    async fn create_order(&self, request: &OrderRequest) -> Result<OpenOrder, ExchangeError>;

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<(), ExchangeError>;
}
