//! JSON-RPC 2.0 envelopes and the logical method table.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::network::types::{NetworkError, NetworkResult};
use crate::utils::ChainType;

pub const JSONRPC_VERSION: &str = "2.0";

/// Logical RPC operations. The concrete wire name depends on the chain type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    GetBlockByHash,
    GetBlockByNumber,
    GetBlockTransactionCountByHash,
    GetBlockTransactionCountByNumber,
    GetCode,
    GetTransactionByBlockHashAndIndex,
    GetTransactionByBlockNumberAndIndex,
    GetTransactionByHash,
    GetTransactionReceipt,
    GetCXReceiptByHash,
    Syncing,
    PeerCount,
    GetBalance,
    GetStorageAt,
    GetTransactionCount,
    SendTransaction,
    SendRawTransaction,
    Subscribe,
    GetPastLogs,
    GetWork,
    GetProof,
    GetFilterChanges,
    NewPendingTransactionFilter,
    NewBlockFilter,
    NewFilter,
    Call,
    EstimateGas,
    GasPrice,
    BlockNumber,
    UnSubscribe,
    NetVersion,
    ProtocolVersion,
    GetShardingStructure,
    SendRawStakingTransaction,
    GetAccountNonce,
    GetBlocks,
}

/// Where a method lives: the chain namespace (prefix varies) or `net_`.
enum Namespace {
    Chain(&'static str),
    Net(&'static str),
}

impl RpcMethod {
    pub const ALL: [RpcMethod; 36] = [
        RpcMethod::GetBlockByHash,
        RpcMethod::GetBlockByNumber,
        RpcMethod::GetBlockTransactionCountByHash,
        RpcMethod::GetBlockTransactionCountByNumber,
        RpcMethod::GetCode,
        RpcMethod::GetTransactionByBlockHashAndIndex,
        RpcMethod::GetTransactionByBlockNumberAndIndex,
        RpcMethod::GetTransactionByHash,
        RpcMethod::GetTransactionReceipt,
        RpcMethod::GetCXReceiptByHash,
        RpcMethod::Syncing,
        RpcMethod::PeerCount,
        RpcMethod::GetBalance,
        RpcMethod::GetStorageAt,
        RpcMethod::GetTransactionCount,
        RpcMethod::SendTransaction,
        RpcMethod::SendRawTransaction,
        RpcMethod::Subscribe,
        RpcMethod::GetPastLogs,
        RpcMethod::GetWork,
        RpcMethod::GetProof,
        RpcMethod::GetFilterChanges,
        RpcMethod::NewPendingTransactionFilter,
        RpcMethod::NewBlockFilter,
        RpcMethod::NewFilter,
        RpcMethod::Call,
        RpcMethod::EstimateGas,
        RpcMethod::GasPrice,
        RpcMethod::BlockNumber,
        RpcMethod::UnSubscribe,
        RpcMethod::NetVersion,
        RpcMethod::ProtocolVersion,
        RpcMethod::GetShardingStructure,
        RpcMethod::SendRawStakingTransaction,
        RpcMethod::GetAccountNonce,
        RpcMethod::GetBlocks,
    ];

    fn namespace(&self) -> Namespace {
        use Namespace::*;
        match self {
            RpcMethod::GetBlockByHash => Chain("getBlockByHash"),
            RpcMethod::GetBlockByNumber => Chain("getBlockByNumber"),
            RpcMethod::GetBlockTransactionCountByHash => Chain("getBlockTransactionCountByHash"),
            RpcMethod::GetBlockTransactionCountByNumber => {
                Chain("getBlockTransactionCountByNumber")
            }
            RpcMethod::GetCode => Chain("getCode"),
            RpcMethod::GetTransactionByBlockHashAndIndex => {
                Chain("getTransactionByBlockHashAndIndex")
            }
            RpcMethod::GetTransactionByBlockNumberAndIndex => {
                Chain("getTransactionByBlockNumberAndIndex")
            }
            RpcMethod::GetTransactionByHash => Chain("getTransactionByHash"),
            RpcMethod::GetTransactionReceipt => Chain("getTransactionReceipt"),
            RpcMethod::GetCXReceiptByHash => Chain("getCXReceiptByHash"),
            RpcMethod::Syncing => Chain("syncing"),
            RpcMethod::PeerCount => Net("peerCount"),
            RpcMethod::GetBalance => Chain("getBalance"),
            RpcMethod::GetStorageAt => Chain("getStorageAt"),
            RpcMethod::GetTransactionCount => Chain("getTransactionCount"),
            RpcMethod::SendTransaction => Chain("sendTransaction"),
            RpcMethod::SendRawTransaction => Chain("sendRawTransaction"),
            RpcMethod::Subscribe => Chain("subscribe"),
            RpcMethod::GetPastLogs => Chain("getLogs"),
            RpcMethod::GetWork => Chain("getWork"),
            RpcMethod::GetProof => Chain("getProof"),
            RpcMethod::GetFilterChanges => Chain("getFilterChanges"),
            RpcMethod::NewPendingTransactionFilter => Chain("newPendingTransactionFilter"),
            RpcMethod::NewBlockFilter => Chain("newBlockFilter"),
            RpcMethod::NewFilter => Chain("newFilter"),
            RpcMethod::Call => Chain("call"),
            RpcMethod::EstimateGas => Chain("estimateGas"),
            RpcMethod::GasPrice => Chain("gasPrice"),
            RpcMethod::BlockNumber => Chain("blockNumber"),
            RpcMethod::UnSubscribe => Chain("unsubscribe"),
            RpcMethod::NetVersion => Net("version"),
            RpcMethod::ProtocolVersion => Chain("protocolVersion"),
            RpcMethod::GetShardingStructure => Chain("getShardingStructure"),
            RpcMethod::SendRawStakingTransaction => Chain("sendRawStakingTransaction"),
            RpcMethod::GetAccountNonce => Chain("getAccountNonce"),
            RpcMethod::GetBlocks => Chain("getBlocks"),
        }
    }

    /// Concrete wire name for `chain_type`.
    pub fn resolve(&self, chain_type: ChainType) -> String {
        match self.namespace() {
            Namespace::Chain(suffix) => format!("{}_{}", chain_type.prefix(), suffix),
            Namespace::Net(suffix) => format!("net_{}", suffix),
        }
    }
}

/// Rewrite the namespace prefix of a concrete method name to `chain_type`.
/// `net_*` and unknown namespaces pass through unchanged.
pub fn rewrite_prefix(method: &str, chain_type: ChainType) -> String {
    match method.split_once('_') {
        Some(("itc", rest)) | Some(("eth", rest)) => {
            format!("{}_{}", chain_type.prefix(), rest)
        }
        _ => method.to_string(),
    }
}

/// Standard and application-defined JSON-RPC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorCode {
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ParseError,
    MiscError,
    TypeError,
    InvalidAddressOrKey,
    InvalidParameter,
    DatabaseError,
    DeserializationError,
    VerifyError,
    VerifyRejected,
    InWarmup,
    MethodDeprecated,
}

impl RpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            RpcErrorCode::InvalidRequest => -32600,
            RpcErrorCode::MethodNotFound => -32601,
            RpcErrorCode::InvalidParams => -32602,
            RpcErrorCode::InternalError => -32603,
            RpcErrorCode::ParseError => -32700,
            RpcErrorCode::MiscError => -1,
            RpcErrorCode::TypeError => -3,
            RpcErrorCode::InvalidAddressOrKey => -5,
            RpcErrorCode::InvalidParameter => -8,
            RpcErrorCode::DatabaseError => -20,
            RpcErrorCode::DeserializationError => -22,
            RpcErrorCode::VerifyError => -25,
            RpcErrorCode::VerifyRejected => -26,
            RpcErrorCode::InWarmup => -28,
            RpcErrorCode::MethodDeprecated => -32,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        let known = [
            RpcErrorCode::InvalidRequest,
            RpcErrorCode::MethodNotFound,
            RpcErrorCode::InvalidParams,
            RpcErrorCode::InternalError,
            RpcErrorCode::ParseError,
            RpcErrorCode::MiscError,
            RpcErrorCode::TypeError,
            RpcErrorCode::InvalidAddressOrKey,
            RpcErrorCode::InvalidParameter,
            RpcErrorCode::DatabaseError,
            RpcErrorCode::DeserializationError,
            RpcErrorCode::VerifyError,
            RpcErrorCode::VerifyRejected,
            RpcErrorCode::InWarmup,
            RpcErrorCode::MethodDeprecated,
        ];
        known.into_iter().find(|c| c.code() == code)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: &'a [Value],
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: &'a [Value]) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    /// Numeric id, when the server echoed one.
    pub fn id_u64(&self) -> Option<u64> {
        self.id.as_ref().and_then(Value::as_u64)
    }

    /// A missing or `null` result is `Value::Null`, not an error.
    pub fn into_result(self) -> NetworkResult<Value> {
        if let Some(err) = self.error {
            return Err(NetworkError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}
