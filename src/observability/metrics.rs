//! Client metrics.
//!
//! # Metrics
//! - `itc_rpc_requests_total` (counter): RPC calls by method, shard, outcome
//! - `itc_rpc_request_duration_seconds` (histogram): RPC latency by method
//! - `itc_transactions_total` (counter): transaction lifecycle transitions by status
//! - `itc_active_subscriptions` (gauge): open WebSocket subscriptions

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::transaction::TxStatus;

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn recording on or off process-wide. Affects later updates only.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Record one finished RPC call.
pub fn record_rpc(method: &str, shard_id: u32, ok: bool, started: Instant) {
    if !is_enabled() {
        return;
    }
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!(
        "itc_rpc_requests_total",
        "method" => method.to_string(),
        "shard" => shard_id.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("itc_rpc_request_duration_seconds", "method" => method.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_transaction_status(status: TxStatus) {
    if !is_enabled() {
        return;
    }
    metrics::counter!("itc_transactions_total", "status" => status.as_str()).increment(1);
}

pub fn record_subscription_opened() {
    if !is_enabled() {
        return;
    }
    metrics::gauge!("itc_active_subscriptions").increment(1.0);
}

pub fn record_subscription_closed() {
    if !is_enabled() {
        return;
    }
    metrics::gauge!("itc_active_subscriptions").decrement(1.0);
}
