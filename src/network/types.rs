//! Network error definitions.

use thiserror::Error;

use crate::network::transport::TransportKind;

/// Errors that can occur while dispatching an RPC call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The node answered with a JSON-RPC error object. Surfaced verbatim.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// No shard with this id is registered.
    #[error("Unknown shard {0}")]
    UnknownShard(u32),

    /// The operation needs a different transport variant.
    #[error("Operation not supported by {0} transport")]
    UnsupportedTransport(TransportKind),

    /// Connection or HTTP-level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The persistent connection closed before a response arrived.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The response was not a JSON-RPC 2.0 envelope, or had an unexpected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Result type for network operations.
pub type NetworkResult<T> = Result<T, NetworkError>;
