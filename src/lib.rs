// Core modules
pub mod api;
pub mod config;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod order_log;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use api::{BinanceClient, ExchangeClient, ExchangeError};
pub use config::{AppConfig, AssetConfig, Credentials};
pub use execution::{OrderPlanner, Position, Trader};
pub use models::*;
pub use risk::RiskLimits;
pub use strategy::{Strategy, StrategyChain};
