//! RPC dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! caller (logical RpcMethod + params + shard?)
//!     → messenger.rs (chain-type method resolution, shard snapshot lookup)
//!     → transport/ (HTTP request/response or WebSocket stream)
//!     → rpc.rs (JSON-RPC 2.0 envelope encode/decode)
//!     → JSON result or NetworkError
//! ```
//!
//! # Design Decisions
//! - Method resolution is a lookup table, not per-call special-casing
//! - Shard table is swapped atomically; readers always see a full snapshot
//! - Transports never retry and never reconnect on their own

pub mod blockchain;
pub mod messenger;
pub mod rpc;
pub mod shard;
pub mod transport;
pub mod types;

pub use blockchain::{BlockTag, Blockchain};
pub use messenger::Messenger;
pub use rpc::{RpcErrorCode, RpcMethod};
pub use shard::ShardEndpoint;
pub use transport::{HttpTransport, Subscription, Transport, TransportKind, WsTransport};
pub use types::{NetworkError, NetworkResult};
