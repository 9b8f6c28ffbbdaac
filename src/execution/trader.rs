use crate::api::ExchangeClient;
use crate::config::AssetConfig;
use crate::execution::planner::OrderPlanner;
use crate::execution::position::Position;
use crate::models::{
    OpenOrder, OrderRequest, PriceSeries, Side, SymbolConstraints, TradeDecision, SERIES_WINDOW,
};
use crate::order_log::OrderLogSink;
use crate::risk::RiskLimits;
use crate::strategy::StrategyChain;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Orders fetched from history when recovering last trade prices
const HISTORY_LIMIT: usize = 100;
/// Pause after cancel-all so cancellations propagate before the next read
const CANCEL_PROPAGATION_DELAY: Duration = Duration::from_secs(2);
/// Pause between submitting an order and re-reading exchange state
const POST_ORDER_DELAY: Duration = Duration::from_secs(2);
/// Fixed backoff after a failed cycle
const ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// Per-asset trade cycle orchestrator.
///
/// Owns the asset's position belief and price series exclusively; the only
/// sharing between assets is the optional global cycle lock, which
/// serializes whole cycle bodies because the exchange's account-wide
/// endpoints are not partitionable per asset.
pub struct Trader<C: ExchangeClient> {
    client: Arc<C>,
    config: AssetConfig,
    constraints: SymbolConstraints,
    limits: RiskLimits,
    planner: OrderPlanner,
    chain: StrategyChain,
    order_log: Arc<dyn OrderLogSink>,
    cycle_lock: Option<Arc<Mutex<()>>>,
    position: Position,
    series: PriceSeries,
    open_orders: Vec<OpenOrder>,
    sleep_interval: Duration,
}

impl<C: ExchangeClient> Trader<C> {
    pub fn new(
        client: Arc<C>,
        config: AssetConfig,
        constraints: SymbolConstraints,
        chain: StrategyChain,
        order_log: Arc<dyn OrderLogSink>,
        cycle_lock: Option<Arc<Mutex<()>>>,
    ) -> Self {
        let limits = config.risk_limits();
        let planner = OrderPlanner::new(config.symbol.clone(), constraints, limits);
        let sleep_interval = config.poll_interval();

        Self {
            client,
            config,
            constraints,
            limits,
            planner,
            chain,
            order_log,
            cycle_lock,
            position: Position::default(),
            series: PriceSeries::default(),
            open_orders: Vec::new(),
            sleep_interval,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn sleep_interval(&self) -> Duration {
        self.sleep_interval
    }

    /// Pull every piece of state fresh from the exchange. The local belief
    /// is never trusted across a cycle boundary.
    async fn refresh_all(&mut self) -> Result<()> {
        let balances = self
            .client
            .account_balances()
            .await
            .context("fetching account balances")?;
        let balance = balances
            .iter()
            .find(|b| b.asset == self.config.asset)
            .map(|b| b.total())
            .unwrap_or(0.0);
        self.position.update_balance(balance, self.constraints.step_size);

        let candles = self
            .client
            .klines(&self.config.symbol, &self.config.candle_interval, SERIES_WINDOW)
            .await
            .context("fetching klines")?;
        self.series = PriceSeries::new(candles);

        let history = self
            .client
            .order_history(&self.config.symbol, HISTORY_LIMIT)
            .await
            .context("fetching order history")?;
        self.position.update_from_history(&history);

        self.open_orders = self
            .client
            .open_orders(&self.config.symbol)
            .await
            .context("fetching open orders")?;

        Ok(())
    }

    /// Best-effort cancellation: one failed cancel is logged and skipped,
    /// it blocks neither the remaining cancels nor the next submission.
    async fn cancel_orders(&self, orders: &[OpenOrder]) {
        for order in orders {
            match self
                .client
                .cancel_order(&self.config.symbol, order.order_id)
                .await
            {
                Ok(()) => info!("[{}] Canceled order {}", self.config.symbol, order.order_id),
                Err(e) => warn!(
                    "[{}] Failed to cancel order {}: {}",
                    self.config.symbol, order.order_id, e
                ),
            }
        }
    }

    async fn cancel_open_orders_of(&self, side: Side) {
        let blocking: Vec<OpenOrder> = self
            .open_orders
            .iter()
            .filter(|o| o.side == side)
            .cloned()
            .collect();
        self.cancel_orders(&blocking).await;
        tokio::time::sleep(CANCEL_PROPAGATION_DELAY).await;
    }

    /// Submit an order; on success the position belief is flipped
    /// optimistically, then overwritten by a mandatory full refresh. On
    /// failure the cycle degrades to a no-op.
    async fn submit(&mut self, request: OrderRequest) -> Result<()> {
        match self.client.create_order(&request).await {
            Ok(response) => {
                info!(
                    "[{}] Order accepted: id={} status={}",
                    self.config.symbol, response.order_id, response.status
                );
                self.order_log.record(&request, &response);
                // Optimistic until the refresh below confirms it
                self.position.held = request.side == Side::Buy;

                tokio::time::sleep(POST_ORDER_DELAY).await;
                self.refresh_all().await?;
                self.sleep_interval = self.config.cooldown();
            }
            Err(e) => {
                error!("[{}] Order submission failed: {}", self.config.symbol, e);
            }
        }
        Ok(())
    }

    /// One fetch-decide-act pass for this asset
    pub async fn run_cycle(&mut self) -> Result<()> {
        // A no-op cycle keeps the normal polling interval
        self.sleep_interval = self.config.poll_interval();

        self.refresh_all().await?;
        info!(
            "[{}] Position: {} | balance {:.8} {} | last buy {:.8}",
            self.config.symbol,
            if self.position.held { "long" } else { "flat" },
            self.position.balance,
            self.config.asset,
            self.position.last_buy_price,
        );

        if self
            .limits
            .stop_loss_triggered(&self.series, self.position.held, self.position.last_buy_price)
        {
            warn!(
                "[{}] STOP LOSS: two closes below {:.8}, liquidating",
                self.config.symbol,
                self.limits.stop_loss_price(self.position.last_buy_price)
            );
            self.cancel_orders(&self.open_orders).await;
            tokio::time::sleep(CANCEL_PROPAGATION_DELAY).await;

            let request = self.planner.market_sell(self.position.balance)?;
            match self.client.create_order(&request).await {
                Ok(response) => {
                    self.order_log.record(&request, &response);
                    self.position.held = false;
                }
                Err(e) => error!("[{}] Stop-loss sell failed: {}", self.config.symbol, e),
            }
            // Early exit: no signal evaluation, normal polling interval
            return Ok(());
        }

        let decision = self.chain.decide(&self.series);
        info!("[{}] Decision: {:?}", self.config.symbol, decision);

        // Cancel-then-replace: open orders on the decision side are swept
        // before a new one goes out; the agent never stacks a side.
        let blocking_side = match decision {
            TradeDecision::Buy => Some(Side::Buy),
            TradeDecision::Sell => Some(Side::Sell),
            TradeDecision::Hold => None,
        };
        if let Some(side) = blocking_side {
            if self.position.reconcile_open_orders(&self.open_orders, side) {
                self.cancel_open_orders_of(side).await;
            }
        }

        match (self.position.held, decision) {
            (false, TradeDecision::Buy) => {
                let request = self.planner.limit_buy(
                    &self.series,
                    self.config.traded_quantity,
                    self.position.partially_filled_qty,
                )?;
                self.submit(request).await?;
            }
            (true, TradeDecision::Sell) => {
                let request = self.planner.limit_sell(
                    &self.series,
                    self.position.balance,
                    self.position.last_buy_price,
                )?;
                self.submit(request).await?;
            }
            _ => {
                info!(
                    "[{}] Holding ({})",
                    self.config.symbol,
                    if self.position.held { "long" } else { "flat" }
                );
            }
        }

        Ok(())
    }

    /// Endless per-asset loop. A failed cycle is logged and retried after
    /// a fixed backoff; it never terminates the loop.
    pub async fn run(mut self) {
        let mut executions: u64 = 0;
        loop {
            executions += 1;
            info!("[{}] Cycle {} starting", self.config.symbol, executions);

            let result = match self.cycle_lock.clone() {
                Some(lock) => {
                    let _guard = lock.lock().await;
                    self.run_cycle().await
                }
                None => self.run_cycle().await,
            };

            match result {
                Ok(()) => {
                    info!(
                        "[{}] Cycle {} done, next in {}s",
                        self.config.symbol,
                        executions,
                        self.sleep_interval.as_secs()
                    );
                    tokio::time::sleep(self.sleep_interval).await;
                }
                Err(e) => {
                    error!("[{}] Cycle {} failed: {:#}", self.config.symbol, executions, e);
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
        }
    }
}
