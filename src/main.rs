use clap::Parser;
use spotbot::api::{BinanceClient, ExchangeClient};
use spotbot::config::{AppConfig, AssetConfig, Credentials};
use spotbot::execution::Trader;
use spotbot::models::SymbolConstraints;
use spotbot::order_log::JsonlOrderLog;
use spotbot::strategy::{EmaMacdStrategy, MovingAverageStrategy, Strategy, StrategyChain};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Parser)]
#[command(name = "spotbot", about = "Automated spot-trading agent")]
struct Args {
    /// Settings file (TOML), without extension
    #[arg(long, default_value = "Settings")]
    config: String,

    /// Run every asset's cycle concurrently instead of one at a time
    #[arg(long)]
    parallel: bool,
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spotbot=info".into()),
        )
        .init();
}

fn build_chain(asset: &AssetConfig) -> StrategyChain {
    let primary: Vec<Box<dyn Strategy>> = vec![Box::new(EmaMacdStrategy::default())];
    let fallback: Option<Box<dyn Strategy>> = asset
        .fallback_activated
        .then(|| Box::new(MovingAverageStrategy::default()) as Box<dyn Strategy>);
    StrategyChain::new(primary, fallback)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();

    // The only fatal errors live here: bad credentials or nothing to trade
    let credentials = Credentials::from_env()?;
    let app = AppConfig::load(&args.config)?;
    if app.assets.is_empty() {
        anyhow::bail!("no assets configured in {}", args.config);
    }

    let serial = app.serial && !args.parallel;
    tracing::info!(
        "Starting spotbot: {} asset(s), {} cycles",
        app.assets.len(),
        if serial { "serialized" } else { "parallel" }
    );

    let client = Arc::new(BinanceClient::new(
        credentials.api_key,
        credentials.secret_key,
    ));
    let order_log = Arc::new(JsonlOrderLog::new(&app.order_log));
    let cycle_lock = serial.then(|| Arc::new(Mutex::new(())));

    let mut tasks = Vec::new();
    for asset in app.assets {
        asset.warn_on_inverted_limits();

        // Symbol filters are fetched once and frozen for the process
        let constraints = match client.symbol_filters(&asset.symbol).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    "[{}] Symbol filter fetch failed ({}), using conservative defaults",
                    asset.symbol,
                    e
                );
                SymbolConstraints::conservative_default()
            }
        };
        tracing::info!(
            "[{}] step size {} | tick size {}",
            asset.symbol,
            constraints.step_size,
            constraints.tick_size
        );

        let trader = Trader::new(
            client.clone(),
            asset.clone(),
            constraints,
            build_chain(&asset),
            order_log.clone(),
            cycle_lock.clone(),
        );
        tracing::info!("[{}] Trader task spawned", asset.symbol);
        tasks.push(tokio::spawn(trader.run()));
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C, shutting down");
    for task in tasks {
        task.abort();
    }

    Ok(())
}
