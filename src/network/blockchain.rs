//! Typed chain queries over the Messenger.
//!
//! # Responsibilities
//! - One method per logical RPC operation, each with an optional shard
//! - Encode parameters the way the node expects (hex quantities, block tags)
//! - Decode results into typed values, rejecting malformed answers

use alloy::primitives::{Bytes, B256, U256};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;

use crate::crypto::Address;
use crate::network::messenger::Messenger;
use crate::network::rpc::RpcMethod;
use crate::network::shard::ShardEndpoint;
use crate::network::transport::Subscription;
use crate::network::types::{NetworkError, NetworkResult};
use crate::transaction::types::Receipt;
use crate::utils::{hex_to_u256, number_to_hex, quantity_to_u64, u256_to_hex};

/// Block selector for state queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockTag {
    #[default]
    Latest,
    Earliest,
    Pending,
    Number(u64),
}

impl BlockTag {
    pub fn to_value(&self) -> Value {
        match self {
            BlockTag::Latest => Value::from("latest"),
            BlockTag::Earliest => Value::from("earliest"),
            BlockTag::Pending => Value::from("pending"),
            BlockTag::Number(n) => Value::from(number_to_hex(*n)),
        }
    }
}

impl From<u64> for BlockTag {
    fn from(n: u64) -> Self {
        BlockTag::Number(n)
    }
}

fn invalid(method: RpcMethod, value: &Value) -> NetworkError {
    NetworkError::InvalidResponse(format!("{:?} returned {}", method, value))
}

fn as_u64(method: RpcMethod, value: Value) -> NetworkResult<u64> {
    quantity_to_u64(&value).map_err(|_| invalid(method, &value))
}

fn as_u256(method: RpcMethod, value: Value) -> NetworkResult<U256> {
    match &value {
        Value::String(s) => hex_to_u256(s).map_err(|_| invalid(method, &value)),
        Value::Number(n) => n.as_u64().map(U256::from).ok_or_else(|| invalid(method, &value)),
        _ => Err(invalid(method, &value)),
    }
}

fn as_hash(method: RpcMethod, value: Value) -> NetworkResult<B256> {
    value
        .as_str()
        .and_then(|s| B256::from_str(s).ok())
        .ok_or_else(|| invalid(method, &value))
}

fn as_bytes(method: RpcMethod, value: Value) -> NetworkResult<Bytes> {
    value
        .as_str()
        .and_then(|s| Bytes::from_str(s).ok())
        .ok_or_else(|| invalid(method, &value))
}

fn hash_param(hash: &B256) -> Value {
    Value::from(hash.to_string())
}

fn address_param(address: &Address) -> Value {
    Value::from(address.to_checksum())
}

/// Chain query handle. Cheap to clone; shares the Messenger.
#[derive(Debug, Clone)]
pub struct Blockchain {
    messenger: Arc<Messenger>,
}

impl Blockchain {
    pub fn new(messenger: Arc<Messenger>) -> Self {
        Self { messenger }
    }

    pub fn messenger(&self) -> &Arc<Messenger> {
        &self.messenger
    }

    async fn send(
        &self,
        method: RpcMethod,
        params: Vec<Value>,
        shard: Option<u32>,
    ) -> NetworkResult<Value> {
        self.messenger.send(method, params, shard).await
    }

    pub async fn get_balance(
        &self,
        address: &Address,
        block: BlockTag,
        shard: Option<u32>,
    ) -> NetworkResult<U256> {
        let m = RpcMethod::GetBalance;
        let v = self
            .send(m, vec![address_param(address), block.to_value()], shard)
            .await?;
        as_u256(m, v)
    }

    pub async fn block_number(&self, shard: Option<u32>) -> NetworkResult<u64> {
        let m = RpcMethod::BlockNumber;
        as_u64(m, self.send(m, vec![], shard).await?)
    }

    /// `None` when the node does not know the block.
    pub async fn get_block_by_hash(
        &self,
        hash: &B256,
        full_transactions: bool,
        shard: Option<u32>,
    ) -> NetworkResult<Option<Value>> {
        let v = self
            .send(
                RpcMethod::GetBlockByHash,
                vec![hash_param(hash), Value::Bool(full_transactions)],
                shard,
            )
            .await?;
        Ok((!v.is_null()).then_some(v))
    }

    pub async fn get_block_by_number(
        &self,
        block: BlockTag,
        full_transactions: bool,
        shard: Option<u32>,
    ) -> NetworkResult<Option<Value>> {
        let v = self
            .send(
                RpcMethod::GetBlockByNumber,
                vec![block.to_value(), Value::Bool(full_transactions)],
                shard,
            )
            .await?;
        Ok((!v.is_null()).then_some(v))
    }

    /// Blocks `from..=to`.
    pub async fn get_blocks(
        &self,
        from: u64,
        to: u64,
        full_transactions: bool,
        with_signers: bool,
        shard: Option<u32>,
    ) -> NetworkResult<Vec<Value>> {
        let m = RpcMethod::GetBlocks;
        let v = self
            .send(
                m,
                vec![
                    Value::from(number_to_hex(from)),
                    Value::from(number_to_hex(to)),
                    json!({ "withSigners": with_signers, "fullTx": full_transactions }),
                ],
                shard,
            )
            .await?;
        match v {
            Value::Array(blocks) => Ok(blocks),
            Value::Null => Ok(Vec::new()),
            other => Err(invalid(m, &other)),
        }
    }

    pub async fn get_block_transaction_count_by_hash(
        &self,
        hash: &B256,
        shard: Option<u32>,
    ) -> NetworkResult<u64> {
        let m = RpcMethod::GetBlockTransactionCountByHash;
        as_u64(m, self.send(m, vec![hash_param(hash)], shard).await?)
    }

    pub async fn get_block_transaction_count_by_number(
        &self,
        block: BlockTag,
        shard: Option<u32>,
    ) -> NetworkResult<u64> {
        let m = RpcMethod::GetBlockTransactionCountByNumber;
        as_u64(m, self.send(m, vec![block.to_value()], shard).await?)
    }

    pub async fn get_transaction_by_hash(
        &self,
        hash: &B256,
        shard: Option<u32>,
    ) -> NetworkResult<Option<Value>> {
        let v = self
            .send(RpcMethod::GetTransactionByHash, vec![hash_param(hash)], shard)
            .await?;
        Ok((!v.is_null()).then_some(v))
    }

    pub async fn get_transaction_by_block_hash_and_index(
        &self,
        block_hash: &B256,
        index: u64,
        shard: Option<u32>,
    ) -> NetworkResult<Option<Value>> {
        let v = self
            .send(
                RpcMethod::GetTransactionByBlockHashAndIndex,
                vec![hash_param(block_hash), Value::from(number_to_hex(index))],
                shard,
            )
            .await?;
        Ok((!v.is_null()).then_some(v))
    }

    pub async fn get_transaction_by_block_number_and_index(
        &self,
        block: BlockTag,
        index: u64,
        shard: Option<u32>,
    ) -> NetworkResult<Option<Value>> {
        let v = self
            .send(
                RpcMethod::GetTransactionByBlockNumberAndIndex,
                vec![block.to_value(), Value::from(number_to_hex(index))],
                shard,
            )
            .await?;
        Ok((!v.is_null()).then_some(v))
    }

    /// `None` while the transaction is not yet in a block.
    pub async fn get_transaction_receipt(
        &self,
        hash: &B256,
        shard: Option<u32>,
    ) -> NetworkResult<Option<Receipt>> {
        let m = RpcMethod::GetTransactionReceipt;
        let v = self.send(m, vec![hash_param(hash)], shard).await?;
        if v.is_null() {
            return Ok(None);
        }
        serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| NetworkError::InvalidResponse(format!("{:?}: {} in {}", m, e, v)))
    }

    /// Destination-shard record of a cross-shard transfer. Query the
    /// destination shard.
    pub async fn get_cx_receipt_by_hash(
        &self,
        hash: &B256,
        shard: Option<u32>,
    ) -> NetworkResult<Option<Value>> {
        let v = self
            .send(RpcMethod::GetCXReceiptByHash, vec![hash_param(hash)], shard)
            .await?;
        Ok((!v.is_null()).then_some(v))
    }

    pub async fn get_code(
        &self,
        address: &Address,
        block: BlockTag,
        shard: Option<u32>,
    ) -> NetworkResult<Bytes> {
        let m = RpcMethod::GetCode;
        let v = self
            .send(m, vec![address_param(address), block.to_value()], shard)
            .await?;
        as_bytes(m, v)
    }

    pub async fn get_storage_at(
        &self,
        address: &Address,
        position: U256,
        block: BlockTag,
        shard: Option<u32>,
    ) -> NetworkResult<Bytes> {
        let m = RpcMethod::GetStorageAt;
        let v = self
            .send(
                m,
                vec![
                    address_param(address),
                    Value::from(u256_to_hex(position)),
                    block.to_value(),
                ],
                shard,
            )
            .await?;
        as_bytes(m, v)
    }

    pub async fn get_transaction_count(
        &self,
        address: &Address,
        block: BlockTag,
        shard: Option<u32>,
    ) -> NetworkResult<u64> {
        let m = RpcMethod::GetTransactionCount;
        let v = self
            .send(m, vec![address_param(address), block.to_value()], shard)
            .await?;
        as_u64(m, v)
    }

    pub async fn get_account_nonce(
        &self,
        address: &Address,
        block: BlockTag,
        shard: Option<u32>,
    ) -> NetworkResult<u64> {
        let m = RpcMethod::GetAccountNonce;
        let v = self
            .send(m, vec![address_param(address), block.to_value()], shard)
            .await?;
        as_u64(m, v)
    }

    pub async fn gas_price(&self, shard: Option<u32>) -> NetworkResult<U256> {
        let m = RpcMethod::GasPrice;
        as_u256(m, self.send(m, vec![], shard).await?)
    }

    /// `call` is a node call object (`{to, data, ...}`).
    pub async fn estimate_gas(&self, call: Value, shard: Option<u32>) -> NetworkResult<U256> {
        let m = RpcMethod::EstimateGas;
        as_u256(m, self.send(m, vec![call], shard).await?)
    }

    pub async fn call(
        &self,
        call: Value,
        block: BlockTag,
        shard: Option<u32>,
    ) -> NetworkResult<Bytes> {
        let m = RpcMethod::Call;
        as_bytes(m, self.send(m, vec![call, block.to_value()], shard).await?)
    }

    pub async fn get_past_logs(&self, filter: Value, shard: Option<u32>) -> NetworkResult<Vec<Value>> {
        let m = RpcMethod::GetPastLogs;
        match self.send(m, vec![filter], shard).await? {
            Value::Array(logs) => Ok(logs),
            Value::Null => Ok(Vec::new()),
            other => Err(invalid(m, &other)),
        }
    }

    pub async fn new_filter(&self, filter: Value, shard: Option<u32>) -> NetworkResult<Value> {
        self.send(RpcMethod::NewFilter, vec![filter], shard).await
    }

    pub async fn new_block_filter(&self, shard: Option<u32>) -> NetworkResult<Value> {
        self.send(RpcMethod::NewBlockFilter, vec![], shard).await
    }

    pub async fn new_pending_transaction_filter(&self, shard: Option<u32>) -> NetworkResult<Value> {
        self.send(RpcMethod::NewPendingTransactionFilter, vec![], shard)
            .await
    }

    pub async fn get_filter_changes(
        &self,
        filter_id: Value,
        shard: Option<u32>,
    ) -> NetworkResult<Value> {
        self.send(RpcMethod::GetFilterChanges, vec![filter_id], shard)
            .await
    }

    pub async fn get_work(&self, shard: Option<u32>) -> NetworkResult<Value> {
        self.send(RpcMethod::GetWork, vec![], shard).await
    }

    pub async fn get_proof(
        &self,
        address: &Address,
        storage_keys: Vec<B256>,
        block: BlockTag,
        shard: Option<u32>,
    ) -> NetworkResult<Value> {
        let keys = storage_keys.iter().map(hash_param).collect();
        self.send(
            RpcMethod::GetProof,
            vec![address_param(address), Value::Array(keys), block.to_value()],
            shard,
        )
        .await
    }

    pub async fn peer_count(&self, shard: Option<u32>) -> NetworkResult<u64> {
        let m = RpcMethod::PeerCount;
        as_u64(m, self.send(m, vec![], shard).await?)
    }

    pub async fn net_version(&self, shard: Option<u32>) -> NetworkResult<String> {
        let m = RpcMethod::NetVersion;
        match self.send(m, vec![], shard).await? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(invalid(m, &other)),
        }
    }

    pub async fn protocol_version(&self, shard: Option<u32>) -> NetworkResult<u64> {
        let m = RpcMethod::ProtocolVersion;
        as_u64(m, self.send(m, vec![], shard).await?)
    }

    /// `false`, or the node's sync progress object.
    pub async fn syncing(&self, shard: Option<u32>) -> NetworkResult<Value> {
        self.send(RpcMethod::Syncing, vec![], shard).await
    }

    pub async fn get_sharding_structure(&self) -> NetworkResult<Vec<ShardEndpoint>> {
        let m = RpcMethod::GetShardingStructure;
        let v = self.send(m, vec![], None).await?;
        serde_json::from_value(v.clone())
            .map_err(|e| NetworkError::InvalidResponse(format!("{:?}: {} in {}", m, e, v)))
    }

    /// Submit a signed transaction; returns its hash.
    pub async fn send_raw_transaction(&self, raw: &str, shard: Option<u32>) -> NetworkResult<B256> {
        let m = RpcMethod::SendRawTransaction;
        as_hash(m, self.send(m, vec![Value::from(raw)], shard).await?)
    }

    pub async fn send_raw_staking_transaction(
        &self,
        raw: &str,
        shard: Option<u32>,
    ) -> NetworkResult<B256> {
        let m = RpcMethod::SendRawStakingTransaction;
        as_hash(m, self.send(m, vec![Value::from(raw)], shard).await?)
    }

    /// Node-signed transaction from an unlocked node account.
    pub async fn send_transaction(&self, tx: Value, shard: Option<u32>) -> NetworkResult<B256> {
        let m = RpcMethod::SendTransaction;
        as_hash(m, self.send(m, vec![tx], shard).await?)
    }

    pub async fn subscribe_new_heads(&self) -> NetworkResult<Subscription> {
        self.messenger.subscribe("newHeads", vec![]).await
    }

    pub async fn subscribe_pending_transactions(&self) -> NetworkResult<Subscription> {
        self.messenger
            .subscribe("newPendingTransactions", vec![])
            .await
    }

    pub async fn subscribe_logs(&self, filter: Value) -> NetworkResult<Subscription> {
        self.messenger.subscribe("logs", vec![filter]).await
    }

    pub async fn subscribe_syncing(&self) -> NetworkResult<Subscription> {
        self.messenger.subscribe("syncing", vec![]).await
    }
}
