//! Request/response transport over HTTP POST.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use url::Url;

use crate::network::rpc::{RpcRequest, RpcResponse};
use crate::network::transport::{Transport, TransportKind, TransportOptions};
use crate::network::types::{NetworkError, NetworkResult};

pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
    request_timeout: Duration,
    closed: AtomicBool,
}

impl HttpTransport {
    pub fn new(url: Url, options: TransportOptions) -> NetworkResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(|e| NetworkError::Transport(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            url,
            next_id: AtomicU64::new(1),
            request_timeout: options.request_timeout,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> NetworkResult<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(NetworkError::ConnectionClosed);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, &params);

        let resp = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NetworkError::Timeout(self.request_timeout.as_secs())
                } else {
                    NetworkError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(NetworkError::Transport(format!(
                "HTTP {} from {}: {}",
                status, self.url, text
            )));
        }

        let envelope: RpcResponse = serde_json::from_str(&text)
            .map_err(|e| NetworkError::InvalidResponse(format!("{}: {}", e, text)))?;
        envelope.into_result()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("url", &self.url.as_str())
            .field("timeout_secs", &self.request_timeout.as_secs())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}
