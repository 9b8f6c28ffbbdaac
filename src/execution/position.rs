use crate::models::{OpenOrder, Side};

/// The agent's belief about its own holdings for one asset.
///
/// Owned exclusively by the per-asset cycle and rebuilt from the exchange
/// at the start of every cycle; the exchange is the source of truth, local
/// memory never survives a cycle boundary except as an optimistic interim
/// value awaiting the next refresh.
#[derive(Debug, Clone, Default)]
pub struct Position {
    /// Long (true) or flat (false); derived from balance vs step size
    pub held: bool,
    pub balance: f64,
    pub last_buy_price: f64,
    pub last_sell_price: f64,
    /// Quantity already executed on still-open orders of the current
    /// decision side, discounted from the next order to avoid re-buying
    /// or re-selling an already filled portion.
    pub partially_filled_qty: f64,
}

impl Position {
    /// Re-derive balance and held flag from an exchange balance snapshot
    pub fn update_balance(&mut self, balance: f64, step_size: f64) {
        self.balance = balance;
        self.held = balance >= step_size;
    }

    /// Recover last executed buy/sell prices from order history.
    ///
    /// The most recent FILLED order per side wins; its average fill price
    /// (quote volume over executed quantity) is the cost basis the risk
    /// guard works against, and it survives process restarts.
    pub fn update_from_history(&mut self, history: &[OpenOrder]) {
        if let Some(price) = last_filled_price(history, Side::Buy) {
            self.last_buy_price = price;
        }
        if let Some(price) = last_filled_price(history, Side::Sell) {
            self.last_sell_price = price;
        }
    }

    /// Reconcile against the open orders of the side we are about to trade.
    ///
    /// Sums the partially executed quantity across them, and for buys
    /// raises `last_buy_price` to the highest price among partially filled
    /// orders: assume the worst-case cost basis until the next full
    /// refresh overwrites it from trade history.
    ///
    /// Returns true when any open order of that side exists.
    pub fn reconcile_open_orders(&mut self, open_orders: &[OpenOrder], side: Side) -> bool {
        self.partially_filled_qty = 0.0;

        let mut any = false;
        for order in open_orders.iter().filter(|o| o.side == side) {
            any = true;
            self.partially_filled_qty += order.executed_qty;
            if side == Side::Buy && order.executed_qty > 0.0 && order.price > self.last_buy_price {
                self.last_buy_price = order.price;
            }
        }

        if any {
            tracing::info!(
                "Open {} orders: partially filled {:.8} total",
                side.as_str(),
                self.partially_filled_qty
            );
        }
        any
    }
}

fn last_filled_price(history: &[OpenOrder], side: Side) -> Option<f64> {
    history
        .iter()
        .filter(|o| o.side == side && o.is_filled())
        .max_by_key(|o| o.time)
        .and_then(|o| o.avg_fill_price())
}
