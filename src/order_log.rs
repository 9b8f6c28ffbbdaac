use crate::models::{OpenOrder, OrderRequest};
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Side-effecting audit log of submitted orders.
///
/// Fire-and-forget from the core's perspective: a sink failure is logged
/// and swallowed, it never influences a trade cycle.
pub trait OrderLogSink: Send + Sync {
    fn record(&self, request: &OrderRequest, response: &OpenOrder);
}

/// Appends one JSON object per submitted order to a local file
pub struct JsonlOrderLog {
    path: PathBuf,
}

impl JsonlOrderLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OrderLogSink for JsonlOrderLog {
    fn record(&self, request: &OrderRequest, response: &OpenOrder) {
        let entry = serde_json::json!({
            "logged_at": Utc::now().to_rfc3339(),
            "symbol": request.symbol,
            "side": request.side.as_str(),
            "type": request.order_type.as_str(),
            "quantity": request.quantity_repr(),
            "price": request.price_repr(),
            "order_id": response.order_id,
            "status": response.status,
            "executed_qty": response.executed_qty,
        });

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{entry}"));

        if let Err(e) = result {
            tracing::warn!("Failed to write order log {}: {}", self.path.display(), e);
        }
    }
}

/// Sink that drops everything; used by tests
pub struct NullOrderLog;

impl OrderLogSink for NullOrderLog {
    fn record(&self, _request: &OrderRequest, _response: &OpenOrder) {}
}
