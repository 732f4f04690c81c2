//! Persistent-stream transport over WebSocket.
//!
//! # Data Flow
//! ```text
//! call()      → outbound channel → writer task → socket
//! socket      → reader task → pending[id] (oneshot)       → call() returns
//!                           → subscriptions[server id]    → Subscription::recv()
//! ```
//!
//! When the socket closes, every pending call fails with `ConnectionClosed`
//! and every subscription sink is dropped, so `recv()` yields `None`.
//!
//! A notification may reach us before the subscribe call that created its
//! id returns. Those are held only while a subscribe call is in flight.
//! Notifications for released ids, or for ids nobody is waiting on, are
//! dropped.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use uuid::Uuid;

use crate::network::rpc::{RpcRequest, RpcResponse};
use crate::network::transport::{Transport, TransportKind, TransportOptions};
use crate::network::types::{NetworkError, NetworkResult};
use crate::observability::metrics;

/// Notifications held per id the server announced before the subscribe call
/// returned.
const MAX_EARLY_NOTIFICATIONS: usize = 64;

pub struct WsTransport {
    inner: Arc<WsInner>,
}

struct WsInner {
    url: Url,
    next_id: AtomicU64,
    request_timeout: Duration,
    outbound: mpsc::UnboundedSender<Message>,
    pending: DashMap<u64, oneshot::Sender<RpcResponse>>,
    subscriptions: DashMap<String, mpsc::UnboundedSender<Value>>,
    early: DashMap<String, Vec<Value>>,
    /// Subscribe calls awaiting their answer.
    subscribing: AtomicUsize,
    /// Server ids that were unsubscribed or whose owner went away.
    released: DashSet<String>,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl WsTransport {
    /// Open the socket and start the reader/writer tasks.
    pub async fn connect(url: Url, options: TransportOptions) -> NetworkResult<Self> {
        let (stream, _) = timeout(options.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| NetworkError::Timeout(options.connect_timeout.as_secs()))?
            .map_err(|e| NetworkError::Transport(format!("WebSocket connect to {}: {}", url, e)))?;

        let (mut write, mut read) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let inner = Arc::new(WsInner {
            url,
            next_id: AtomicU64::new(1),
            request_timeout: options.request_timeout,
            outbound,
            pending: DashMap::new(),
            subscriptions: DashMap::new(),
            early: DashMap::new(),
            subscribing: AtomicUsize::new(0),
            released: DashSet::new(),
            closed: AtomicBool::new(false),
            shutdown,
        });

        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let is_close = matches!(msg, Message::Close(_));
                if write.send(msg).await.is_err() || is_close {
                    break;
                }
            }
            let _ = write.close().await;
        });

        let reader = inner.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = read.next() => match frame {
                        Some(Ok(Message::Text(text))) => reader.dispatch(text.as_str()),
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(url = %reader.url, error = %e, "WebSocket read failed");
                            break;
                        }
                    },
                    _ = shutdown_rx.changed() => break,
                }
            }
            reader.teardown();
            tracing::info!(url = %reader.url, "WebSocket connection closed");
        });

        tracing::info!(url = %inner.url, "WebSocket connected");
        Ok(Self { inner })
    }
}

impl WsInner {
    async fn call(&self, method: &str, params: Vec<Value>) -> NetworkResult<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(NetworkError::ConnectionClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_string(&RpcRequest::new(id, method, &params))
            .map_err(|e| NetworkError::InvalidResponse(format!("request encoding: {}", e)))?;

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        // teardown may have run between the first check and the insert
        if self.closed.load(Ordering::SeqCst) {
            self.pending.remove(&id);
            return Err(NetworkError::ConnectionClosed);
        }

        if self.outbound.send(Message::Text(body.into())).is_err() {
            self.pending.remove(&id);
            return Err(NetworkError::ConnectionClosed);
        }

        match timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response.into_result(),
            Ok(Err(_)) => Err(NetworkError::ConnectionClosed),
            Err(_) => {
                self.pending.remove(&id);
                Err(NetworkError::Timeout(self.request_timeout.as_secs()))
            }
        }
    }

    fn dispatch(&self, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "Dropping unparsable frame");
                return;
            }
        };

        let is_notification = value
            .get("method")
            .and_then(Value::as_str)
            .map(|m| m.ends_with("_subscription"))
            .unwrap_or(false);

        if is_notification {
            let params = value.get("params");
            let sub_id = params
                .and_then(|p| p.get("subscription"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let result = params
                .and_then(|p| p.get("result"))
                .cloned()
                .unwrap_or(Value::Null);
            if let Some(sub_id) = sub_id {
                self.deliver(sub_id, result);
            }
            return;
        }

        match serde_json::from_value::<RpcResponse>(value) {
            Ok(response) => match response.id_u64() {
                Some(id) => {
                    if let Some((_, tx)) = self.pending.remove(&id) {
                        let _ = tx.send(response);
                    }
                }
                None => tracing::debug!(url = %self.url, "Response without numeric id ignored"),
            },
            Err(e) => tracing::warn!(url = %self.url, error = %e, "Unexpected frame"),
        }
    }

    fn deliver(&self, sub_id: String, result: Value) {
        let sent = self
            .subscriptions
            .get(&sub_id)
            .map(|sink| sink.send(result.clone()).is_ok());
        match sent {
            Some(true) => return,
            Some(false) => {
                // owner dropped the Subscription without unsubscribing
                self.release(&sub_id);
                return;
            }
            None => {}
        }

        if self.released.contains(&sub_id) {
            tracing::trace!(url = %self.url, server_id = %sub_id, "Late notification dropped");
            return;
        }
        if self.subscribing.load(Ordering::SeqCst) == 0 {
            tracing::debug!(url = %self.url, server_id = %sub_id, "Notification for unknown subscription dropped");
            return;
        }

        let mut held = self.early.entry(sub_id.clone()).or_default();
        // register may have installed the sink while we waited on the entry
        if let Some(sink) = self.subscriptions.get(&sub_id) {
            let _ = sink.send(result);
        } else if held.len() < MAX_EARLY_NOTIFICATIONS {
            held.push(result);
        }
        let empty = held.is_empty();
        drop(held);
        if empty {
            self.early.remove_if(&sub_id, |_, v| v.is_empty());
        }
    }

    /// Install the sink for `server_id`, first handing it anything held.
    fn register(&self, server_id: &str) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.closed.load(Ordering::SeqCst) {
            return rx;
        }
        self.released.remove(server_id);

        // the entry stays locked until the sink is in place, so deliver
        // cannot slip a value in between the drain and the insert
        let mut held = self.early.entry(server_id.to_string()).or_default();
        for value in held.drain(..) {
            let _ = tx.send(value);
        }
        self.subscriptions.insert(server_id.to_string(), tx);
        drop(held);
        self.early.remove_if(server_id, |_, v| v.is_empty());
        metrics::record_subscription_opened();

        // teardown may have run between the first check and the insert
        if self.closed.load(Ordering::SeqCst) && self.subscriptions.remove(server_id).is_some() {
            metrics::record_subscription_closed();
        }
        rx
    }

    /// Forget `server_id`: drop its sink and ignore anything still in flight for it.
    fn release(&self, server_id: &str) {
        if self.subscriptions.remove(server_id).is_some() {
            metrics::record_subscription_closed();
        }
        self.early.remove(server_id);
        self.released.insert(server_id.to_string());
    }

    fn teardown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // dropping the oneshot senders fails each waiting call
        self.pending.clear();
        for _ in 0..self.subscriptions.len() {
            metrics::record_subscription_closed();
        }
        self.subscriptions.clear();
        self.early.clear();
        self.released.clear();
    }

    fn close(&self) {
        let _ = self.outbound.send(Message::Close(None));
        let _ = self.shutdown.send(true);
        self.teardown();
    }
}

#[async_trait]
impl Transport for WsTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Ws
    }

    fn url(&self) -> &str {
        self.inner.url.as_str()
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> NetworkResult<Value> {
        self.inner.call(method, params).await
    }

    async fn subscribe(
        &self,
        method: &str,
        unsubscribe_method: &str,
        params: Vec<Value>,
    ) -> NetworkResult<Subscription> {
        let _in_flight = SubscribeInFlight::begin(&self.inner);
        let result = self.inner.call(method, params).await?;
        let server_id = result
            .as_str()
            .ok_or_else(|| {
                NetworkError::InvalidResponse(format!("subscription id is not a string: {}", result))
            })?
            .to_string();

        let events = self.inner.register(&server_id);
        let subscription = Subscription {
            id: Uuid::new_v4(),
            server_id,
            unsubscribe_method: unsubscribe_method.to_string(),
            events,
            owner: self.inner.clone(),
        };
        tracing::debug!(
            url = %self.inner.url,
            local_id = %subscription.id,
            server_id = %subscription.server_id,
            "Subscription opened"
        );
        Ok(subscription)
    }

    fn close(&self) {
        self.inner.close();
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

/// Marks a subscribe call in flight. The last one to finish discards
/// anything still held, since no pending call can claim it.
struct SubscribeInFlight<'a>(&'a WsInner);

impl<'a> SubscribeInFlight<'a> {
    fn begin(inner: &'a WsInner) -> Self {
        inner.subscribing.fetch_add(1, Ordering::SeqCst);
        Self(inner)
    }
}

impl Drop for SubscribeInFlight<'_> {
    fn drop(&mut self) {
        if self.0.subscribing.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.early.clear();
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("url", &self.inner.url.as_str())
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .field("subscriptions", &self.inner.subscriptions.len())
            .finish()
    }
}

/// An open server-pushed stream, owned by whoever created it.
pub struct Subscription {
    id: Uuid,
    server_id: String,
    unsubscribe_method: String,
    events: mpsc::UnboundedReceiver<Value>,
    owner: Arc<WsInner>,
}

impl Subscription {
    /// Locally generated identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Identifier the node assigned.
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Next pushed value; `None` once the subscription or its connection is gone.
    pub async fn recv(&mut self) -> Option<Value> {
        self.events.recv().await
    }

    pub fn is_closed(&self) -> bool {
        self.owner.closed.load(Ordering::SeqCst) || self.events.is_closed()
    }

    /// Tell the node to stop pushing and drop the local sink.
    ///
    /// Returns the node's answer, or `false` if the connection is already gone.
    pub async fn unsubscribe(self) -> NetworkResult<bool> {
        self.owner.release(&self.server_id);
        if self.owner.closed.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let result = self
            .owner
            .call(&self.unsubscribe_method, vec![Value::String(self.server_id.clone())])
            .await?;
        Ok(result.as_bool().unwrap_or(false))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("server_id", &self.server_id)
            .finish()
    }
}
