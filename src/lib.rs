//! Client engine for a sharded, JSON-RPC-speaking chain.
//!
//! # Architecture Overview
//!
//! ```text
//!   TransactionParams ──▶ transaction::codec ──▶ KeyProvider ──▶ Transaction (Signed)
//!                                                                      │
//!                                                                      ▼
//!   Blockchain queries ──────────────────────────────────────────▶ network::Messenger
//!                                                                      │ method resolution
//!                                                                      │ shard routing
//!                                                                      ▼
//!                                                          Transport (HTTP │ WebSocket)
//!                                                                      │
//!                                                                      ▼
//!                                                                shard endpoints
//!
//!   Cross-cutting: config (TOML, hot reload), observability (tracing, metrics)
//! ```

// Core subsystems
pub mod crypto;
pub mod network;
pub mod transaction;
pub mod utils;

// Entry point
pub mod client;

// Cross-cutting concerns
pub mod config;
pub mod observability;

pub use client::{ClientError, IntelchainClient};
pub use config::ClientConfig;
pub use crypto::{Address, KeyProvider, LocalKey};
pub use network::{Blockchain, Messenger, NetworkError, RpcMethod, ShardEndpoint};
pub use transaction::{Transaction, TransactionError, TransactionFactory, TransactionParams, TxStatus};
pub use utils::{ChainId, ChainType};
