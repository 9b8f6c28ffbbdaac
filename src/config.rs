use crate::risk::RiskLimits;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

fn default_traded_percentage() -> f64 {
    100.0
}
fn default_candle_interval() -> String {
    "1h".to_string()
}
fn default_poll_secs() -> u64 {
    5 * 60
}
fn default_cooldown_secs() -> u64 {
    15 * 60
}
fn default_volatility_factor() -> f64 {
    0.5
}
fn default_acceptable_loss() -> f64 {
    0.5
}
fn default_stop_loss() -> f64 {
    3.0
}
fn default_true() -> bool {
    true
}
fn default_order_log() -> String {
    "orders.jsonl".to_string()
}

/// Immutable per-asset configuration. Created once at startup.
///
/// Loss percentages are written in base 100 in the settings file and
/// normalized to fractions here, as are all the derived accessors.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    /// Base asset code, e.g. "BTC"
    pub asset: String,
    /// Traded pair, e.g. "BTCUSDT"
    pub symbol: String,
    pub traded_quantity: f64,
    #[serde(default = "default_traded_percentage")]
    pub traded_percentage: f64,
    #[serde(default = "default_candle_interval")]
    pub candle_interval: String,
    #[serde(default = "default_poll_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_volatility_factor")]
    pub volatility_factor: f64,
    /// Percent (base 100) the agent accepts losing on a limit sell
    #[serde(default = "default_acceptable_loss")]
    pub acceptable_loss_percentage: f64,
    /// Percent (base 100) below cost at which the market-sell stop fires
    #[serde(default = "default_stop_loss")]
    pub stop_loss_percentage: f64,
    #[serde(default = "default_true")]
    pub fallback_activated: bool,
}

impl AssetConfig {
    pub fn risk_limits(&self) -> RiskLimits {
        RiskLimits {
            acceptable_loss_pct: self.acceptable_loss_percentage / 100.0,
            stop_loss_pct: self.stop_loss_percentage / 100.0,
        }
    }

    /// Wait between ordinary cycles
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Longer wait after a cycle that placed an order, to cut order churn
    /// at decision boundaries
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// A stop loss tighter than the acceptable-loss floor can never fire:
    /// the floor prices every limit sell above the stop threshold. Warn,
    /// don't reject; the ordering was never enforced upstream either.
    pub fn warn_on_inverted_limits(&self) {
        if self.stop_loss_percentage < self.acceptable_loss_percentage {
            tracing::warn!(
                "[{}] stop_loss ({}%) is tighter than acceptable_loss ({}%); \
                 the stop loss may be unreachable",
                self.symbol,
                self.stop_loss_percentage,
                self.acceptable_loss_percentage
            );
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Serialize cycle bodies across assets (one global lock) instead of
    /// letting every asset trade concurrently
    #[serde(default = "default_true")]
    pub serial: bool,
    #[serde(default = "default_order_log")]
    pub order_log: String,
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
}

impl AppConfig {
    /// Layered load: settings file first, `SPOTBOT_`-prefixed environment
    /// variables on top.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("SPOTBOT").separator("__"));

        builder.build()?.try_deserialize()
    }
}

/// Exchange API credentials, environment-only: they never belong in the
/// settings file.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("BINANCE_API_KEY").unwrap_or_default();
        let secret_key = std::env::var("BINANCE_SECRET_KEY").unwrap_or_default();

        if api_key.is_empty() || secret_key.is_empty() {
            anyhow::bail!(
                "Binance API credentials missing: set BINANCE_API_KEY and BINANCE_SECRET_KEY"
            );
        }
        Ok(Self {
            api_key,
            secret_key,
        })
    }
}
