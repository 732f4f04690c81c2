//! Chain-aware, shard-aware RPC dispatch.
//!
//! # Responsibilities
//! - Hold the shard table and chain settings as one atomically swapped snapshot
//! - Resolve logical methods to wire names for the configured chain type
//! - Route each call to the requested shard, or the default one
//! - Open and release subscriptions on the default shard
//!
//! # Design Decisions
//! - Readers take one snapshot per call; reconfiguration never affects a call
//!   that is already in flight
//! - Table replacement connects new transports before publishing; a failed
//!   connect leaves the old table untouched
//! - Transports that drop out of the table are closed after the swap

use arc_swap::ArcSwap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::config::schema::ClientConfig;
use crate::network::rpc::{rewrite_prefix, RpcMethod};
use crate::network::shard::ShardEndpoint;
use crate::network::transport::{self, Subscription, Transport, TransportKind, TransportOptions};
use crate::network::types::{NetworkError, NetworkResult};
use crate::observability::metrics;
use crate::utils::{ChainId, ChainType};

/// One registered shard.
#[derive(Debug)]
struct Shard {
    endpoint: ShardEndpoint,
    transport: Arc<dyn Transport>,
}

/// Immutable view of the Messenger's configuration.
#[derive(Debug, Clone)]
pub struct MessengerState {
    chain_type: ChainType,
    chain_id: ChainId,
    default_shard: u32,
    shards: BTreeMap<u32, Arc<Shard>>,
}

impl MessengerState {
    pub fn chain_type(&self) -> ChainType {
        self.chain_type
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn default_shard(&self) -> u32 {
        self.default_shard
    }

    pub fn shard_ids(&self) -> Vec<u32> {
        self.shards.keys().copied().collect()
    }

    pub fn endpoint(&self, shard_id: u32) -> Option<&ShardEndpoint> {
        self.shards.get(&shard_id).map(|s| &s.endpoint)
    }

    /// Every registered endpoint, ordered by shard id.
    pub fn endpoints(&self) -> Vec<ShardEndpoint> {
        self.shards.values().map(|s| s.endpoint.clone()).collect()
    }

    pub fn transport(&self, shard_id: u32) -> Option<Arc<dyn Transport>> {
        self.shards.get(&shard_id).map(|s| s.transport.clone())
    }

    /// Point the default at `shard_id` and keep the `current` flags in step.
    fn with_default(&self, shard_id: u32) -> Self {
        let shards = self
            .shards
            .iter()
            .map(|(id, shard)| {
                let is_current = *id == shard_id;
                let entry = if shard.endpoint.is_current == is_current {
                    shard.clone()
                } else {
                    let mut endpoint = shard.endpoint.clone();
                    endpoint.is_current = is_current;
                    Arc::new(Shard {
                        endpoint,
                        transport: shard.transport.clone(),
                    })
                };
                (*id, entry)
            })
            .collect();
        Self {
            chain_type: self.chain_type,
            chain_id: self.chain_id,
            default_shard: shard_id,
            shards,
        }
    }
}

/// Pick the default shard for a freshly built table: an entry flagged
/// `current`, else the previous default if still present, else the lowest id.
fn choose_default(shards: &BTreeMap<u32, Arc<Shard>>, previous: u32) -> u32 {
    shards
        .values()
        .find(|s| s.endpoint.is_current)
        .map(|s| s.endpoint.shard_id)
        .or_else(|| shards.contains_key(&previous).then_some(previous))
        .or_else(|| shards.keys().next().copied())
        .unwrap_or(previous)
}

fn same_transport(a: &Arc<dyn Transport>, b: &Arc<dyn Transport>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// RPC dispatcher shared by every transaction and query handle.
pub struct Messenger {
    state: ArcSwap<MessengerState>,
    /// Serializes table replacements; single-field updates go through `rcu`.
    reconfigure_lock: Mutex<()>,
    kind: TransportKind,
    options: TransportOptions,
}

impl Messenger {
    /// An empty Messenger; populate it with [`Messenger::reconfigure`].
    pub fn new(
        chain_type: ChainType,
        chain_id: ChainId,
        kind: TransportKind,
        options: TransportOptions,
    ) -> Self {
        Self {
            state: ArcSwap::from_pointee(MessengerState {
                chain_type,
                chain_id,
                default_shard: 0,
                shards: BTreeMap::new(),
            }),
            reconfigure_lock: Mutex::new(()),
            kind,
            options,
        }
    }

    /// Build from caller-supplied transports. No connection is opened.
    pub fn with_transports(
        chain_type: ChainType,
        chain_id: ChainId,
        shards: Vec<(ShardEndpoint, Arc<dyn Transport>)>,
    ) -> Self {
        let kind = shards
            .first()
            .map(|(_, t)| t.kind())
            .unwrap_or_default();
        let messenger = Self::new(chain_type, chain_id, kind, TransportOptions::default());
        messenger.reconfigure_with_transports(shards);
        messenger
    }

    /// Connect every configured shard.
    pub async fn connect(config: &ClientConfig) -> NetworkResult<Self> {
        let messenger = Self::new(
            config.chain.chain_type,
            config.chain.chain_id,
            config.transport.kind,
            config.transport.options(),
        );
        messenger.reconfigure(config.shards.clone()).await?;
        if let Some(shard_id) = config.chain.default_shard_id {
            messenger.set_default_shard(shard_id)?;
        }
        Ok(messenger)
    }

    pub fn snapshot(&self) -> Arc<MessengerState> {
        self.state.load_full()
    }

    pub fn chain_type(&self) -> ChainType {
        self.state.load().chain_type
    }

    pub fn chain_id(&self) -> ChainId {
        self.state.load().chain_id
    }

    pub fn default_shard(&self) -> u32 {
        self.state.load().default_shard
    }

    pub fn shards(&self) -> Vec<ShardEndpoint> {
        self.state.load().endpoints()
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.kind
    }

    /// Send a logical method to `shard`, or the default shard.
    pub async fn send(
        &self,
        method: RpcMethod,
        params: Vec<Value>,
        shard: Option<u32>,
    ) -> NetworkResult<Value> {
        let state = self.state.load_full();
        let name = method.resolve(state.chain_type);
        Self::dispatch(&state, &name, params, shard).await
    }

    /// Send a concrete method name. An `itc_`/`eth_` prefix is rewritten to
    /// the configured chain type.
    pub async fn send_method(
        &self,
        method: &str,
        params: Vec<Value>,
        shard: Option<u32>,
    ) -> NetworkResult<Value> {
        let state = self.state.load_full();
        let name = rewrite_prefix(method, state.chain_type);
        Self::dispatch(&state, &name, params, shard).await
    }

    async fn dispatch(
        state: &MessengerState,
        method: &str,
        params: Vec<Value>,
        shard: Option<u32>,
    ) -> NetworkResult<Value> {
        let shard_id = shard.unwrap_or(state.default_shard);
        let entry = state
            .shards
            .get(&shard_id)
            .ok_or(NetworkError::UnknownShard(shard_id))?;

        let started = Instant::now();
        let result = entry.transport.call(method, params).await;
        metrics::record_rpc(method, shard_id, result.is_ok(), started);

        if let Err(e) = &result {
            tracing::debug!(method, shard_id, error = %e, "RPC call failed");
        }
        result
    }

    /// Subscribe to `event` on the default shard. Needs the stream transport.
    pub async fn subscribe(&self, event: &str, params: Vec<Value>) -> NetworkResult<Subscription> {
        let state = self.state.load_full();
        let entry = state
            .shards
            .get(&state.default_shard)
            .ok_or(NetworkError::UnknownShard(state.default_shard))?;

        let mut full_params = Vec::with_capacity(params.len() + 1);
        full_params.push(Value::String(event.to_string()));
        full_params.extend(params);

        let subscription = entry
            .transport
            .subscribe(
                &RpcMethod::Subscribe.resolve(state.chain_type),
                &RpcMethod::UnSubscribe.resolve(state.chain_type),
                full_params,
            )
            .await?;
        tracing::info!(
            event,
            shard_id = state.default_shard,
            subscription = %subscription.id(),
            "Subscribed"
        );
        Ok(subscription)
    }

    /// Release a subscription. Returns the node's answer.
    pub async fn unsubscribe(&self, subscription: Subscription) -> NetworkResult<bool> {
        let id = subscription.id();
        let released = subscription.unsubscribe().await?;
        tracing::info!(subscription = %id, released, "Unsubscribed");
        Ok(released)
    }

    /// Replace the shard table. Unchanged endpoints keep their transport;
    /// new ones are connected before anything is published.
    pub async fn reconfigure(&self, endpoints: Vec<ShardEndpoint>) -> NetworkResult<()> {
        let _guard = self.reconfigure_lock.lock().await;
        let current = self.state.load_full();

        let mut connected = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let reusable = current
                .shards
                .get(&endpoint.shard_id)
                .filter(|s| s.endpoint.same_location(&endpoint) && !s.transport.is_closed())
                .map(|s| s.transport.clone());
            let transport = match reusable {
                Some(t) => t,
                None => transport::connect(self.kind, &endpoint, self.options).await?,
            };
            connected.push((endpoint, transport));
        }

        self.publish(connected);
        Ok(())
    }

    /// Replace the shard table with caller-supplied transports.
    pub fn reconfigure_with_transports(&self, shards: Vec<(ShardEndpoint, Arc<dyn Transport>)>) {
        self.publish(shards);
    }

    fn publish(&self, entries: Vec<(ShardEndpoint, Arc<dyn Transport>)>) {
        let mut shards = BTreeMap::new();
        for (endpoint, transport) in entries {
            let shard_id = endpoint.shard_id;
            if shards
                .insert(shard_id, Arc::new(Shard { endpoint, transport }))
                .is_some()
            {
                tracing::warn!(shard_id, "Duplicate shard id, last entry wins");
            }
        }

        let previous = self.state.rcu(|state| {
            let next = MessengerState {
                chain_type: state.chain_type,
                chain_id: state.chain_id,
                default_shard: state.default_shard,
                shards: shards.clone(),
            };
            let default_shard = choose_default(&next.shards, state.default_shard);
            next.with_default(default_shard)
        });

        let mut closed = 0usize;
        for old in previous.shards.values() {
            let kept = shards
                .values()
                .any(|s| same_transport(&s.transport, &old.transport));
            if !kept {
                old.transport.close();
                closed += 1;
            }
        }

        let state = self.state.load();
        tracing::info!(
            shards = ?state.shard_ids(),
            default_shard = state.default_shard,
            closed,
            "Shard table replaced"
        );
    }

    pub fn set_chain_type(&self, chain_type: ChainType) {
        self.state.rcu(|state| MessengerState {
            chain_type,
            ..(**state).clone()
        });
        tracing::info!(chain_type = %chain_type, "Chain type updated");
    }

    pub fn set_chain_id(&self, chain_id: ChainId) {
        self.state.rcu(|state| MessengerState {
            chain_id,
            ..(**state).clone()
        });
        tracing::info!(chain_id = %chain_id, "Chain id updated");
    }

    /// Make `shard_id` the default. It must already be registered.
    pub fn set_default_shard(&self, shard_id: u32) -> NetworkResult<()> {
        let mut registered = false;
        self.state.rcu(|state| {
            registered = state.shards.contains_key(&shard_id);
            if registered {
                state.with_default(shard_id)
            } else {
                (**state).clone()
            }
        });
        if !registered {
            return Err(NetworkError::UnknownShard(shard_id));
        }
        tracing::info!(shard_id, "Default shard updated");
        Ok(())
    }

    /// Close every transport. Subsequent calls fail at the transport.
    pub fn close(&self) {
        for shard in self.state.load().shards.values() {
            shard.transport.close();
        }
    }
}

impl std::fmt::Debug for Messenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.load();
        f.debug_struct("Messenger")
            .field("chain_type", &state.chain_type)
            .field("chain_id", &state.chain_id)
            .field("default_shard", &state.default_shard)
            .field("shards", &state.shard_ids())
            .field("kind", &self.kind)
            .finish()
    }
}
