//! Interchangeable RPC transports.
//!
//! # Responsibilities
//! - Carry one JSON-RPC envelope per call and return its result or error
//! - Enforce connect and request timeouts on every exchange
//! - Stream variant only: long-lived subscriptions with per-subscription sinks
//!
//! # Design Decisions
//! - One trait for both variants; subscribe defaults to `UnsupportedTransport`
//! - No retries, no reconnects: failures surface to the caller unchanged

pub mod http;
pub mod ws;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::network::shard::ShardEndpoint;
use crate::network::types::{NetworkError, NetworkResult};

pub use http::HttpTransport;
pub use ws::{Subscription, WsTransport};

/// Transport variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// One HTTP POST per call.
    #[default]
    Http,
    /// Persistent WebSocket connection.
    Ws,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Http => f.write_str("http"),
            TransportKind::Ws => f.write_str("ws"),
        }
    }
}

/// Timeouts applied by every transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    fn kind(&self) -> TransportKind;

    /// Endpoint this transport talks to, for logs.
    fn url(&self) -> &str;

    /// Send one request and wait for its response.
    async fn call(&self, method: &str, params: Vec<Value>) -> NetworkResult<Value>;

    /// Open a server-pushed stream. `unsubscribe_method` is what
    /// [`Subscription::unsubscribe`] will send.
    async fn subscribe(
        &self,
        method: &str,
        unsubscribe_method: &str,
        params: Vec<Value>,
    ) -> NetworkResult<Subscription> {
        let _ = (method, unsubscribe_method, params);
        Err(NetworkError::UnsupportedTransport(self.kind()))
    }

    /// Release the connection. Open subscriptions end.
    fn close(&self) {}

    fn is_closed(&self) -> bool {
        false
    }
}

/// Build the transport of `kind` for `endpoint`.
pub async fn connect(
    kind: TransportKind,
    endpoint: &ShardEndpoint,
    options: TransportOptions,
) -> NetworkResult<Arc<dyn Transport>> {
    let url = endpoint.url_for(kind)?;
    let transport: Arc<dyn Transport> = match kind {
        TransportKind::Http => Arc::new(HttpTransport::new(url, options)?),
        TransportKind::Ws => Arc::new(WsTransport::connect(url, options).await?),
    };
    tracing::debug!(
        shard_id = endpoint.shard_id,
        kind = %kind,
        url = transport.url(),
        "Transport ready"
    );
    Ok(transport)
}
