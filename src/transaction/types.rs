//! Transaction types and error definitions.

use alloy::primitives::{Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::crypto::Address;
use crate::network::NetworkError;
use crate::utils::{ChainId, InvalidFormat};

/// Lifecycle of one transaction. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TxStatus {
    #[default]
    Initialized,
    Signed,
    Pending,
    Confirmed,
    Rejected,
    ConfirmationTimeout,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Initialized => "initialized",
            TxStatus::Signed => "signed",
            TxStatus::Pending => "pending",
            TxStatus::Confirmed => "confirmed",
            TxStatus::Rejected => "rejected",
            TxStatus::ConfirmationTimeout => "confirmation_timeout",
        }
    }

    /// `Confirmed`, `Rejected` or `ConfirmationTimeout`.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            TxStatus::Confirmed | TxStatus::Rejected | TxStatus::ConfirmationTimeout
        )
    }

    pub fn can_transition_to(&self, next: TxStatus) -> bool {
        matches!(
            (self, next),
            (TxStatus::Initialized, TxStatus::Signed)
                | (TxStatus::Signed, TxStatus::Pending)
                | (TxStatus::Pending, TxStatus::Confirmed)
                | (TxStatus::Pending, TxStatus::Rejected)
                | (TxStatus::Pending, TxStatus::ConfirmationTimeout)
        )
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ECDSA signature components as carried on the wire. `v` already includes
/// the replay-protection offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxSignature {
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

/// Everything that goes into a transaction's encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionParams {
    pub from: Option<Address>,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub gas_price: U256,
    pub gas_limit: U256,
    pub nonce: u64,
    pub data: Bytes,
    pub shard_id: u32,
    pub to_shard_id: u32,
    pub chain_id: ChainId,
    pub signature: Option<TxSignature>,
}

impl TransactionParams {
    /// A same-shard transfer on shard 0.
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to: Some(to),
            value,
            ..Default::default()
        }
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: U256) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn with_data(mut self, data: Bytes) -> Self {
        self.data = data;
        self
    }

    pub fn with_shards(mut self, shard_id: u32, to_shard_id: u32) -> Self {
        self.shard_id = shard_id;
        self.to_shard_id = to_shard_id;
        self
    }

    pub fn with_chain_id(mut self, chain_id: ChainId) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn is_cross_shard(&self) -> bool {
        self.shard_id != self.to_shard_id
    }
}

mod quantity {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    use crate::utils::{number_to_hex, quantity_to_u64};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(v) => quantity_to_u64(&v).map(Some).map_err(D::Error::custom),
        }
    }

    pub fn serialize<S: Serializer>(v: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(n) => s.serialize_str(&number_to_hex(*n)),
            None => s.serialize_none(),
        }
    }
}

/// Transaction receipt as returned by the node.
///
/// Fields the node sends beyond the typed ones are kept in `other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    #[serde(default, with = "quantity", skip_serializing_if = "Option::is_none")]
    pub transaction_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<B256>,
    #[serde(default, with = "quantity", skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, with = "quantity", skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    #[serde(default, with = "quantity", skip_serializing_if = "Option::is_none")]
    pub cumulative_gas_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub logs: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_bloom: Option<String>,
    #[serde(default, with = "quantity", skip_serializing_if = "Option::is_none")]
    pub status: Option<u64>,
    /// Post-state root of pre-byzantium receipts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(rename = "shardID", default, skip_serializing_if = "Option::is_none")]
    pub shard_id: Option<u32>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl Receipt {
    /// Status `0x1`, or a pre-byzantium receipt carrying a state root.
    pub fn is_success(&self) -> bool {
        match self.status {
            Some(status) => status == 1,
            None => self.root.is_some(),
        }
    }
}

/// Errors that can occur while building, signing, sending or confirming.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error(transparent)]
    InvalidFormat(#[from] InvalidFormat),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Transaction is already signed")]
    AlreadySigned,

    #[error("Signer {signer} does not match sender {from}")]
    SenderMismatch { from: Address, signer: Address },

    #[error("Transaction is {actual}, expected {expected}")]
    InvalidStatus { expected: TxStatus, actual: TxStatus },

    #[error("Transaction {tx_hash} not confirmed: {blocks_seen} of {max_blocks} blocks observed")]
    ConfirmationTimeout {
        tx_hash: B256,
        blocks_seen: u32,
        max_blocks: u32,
    },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl TransactionError {
    /// Waiting longer may still see the transaction land. Only a confirmation
    /// timeout qualifies; network failures are surfaced for the caller to judge.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TransactionError::ConfirmationTimeout { .. })
    }
}

pub type TransactionResult<T> = Result<T, TransactionError>;

/// Polling budget for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmOptions {
    /// Block advances to observe before giving up. Also caps consecutive
    /// polls that see no new block.
    pub max_blocks: u32,
    pub poll_interval: Duration,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            max_blocks: 20,
            poll_interval: Duration::from_millis(1000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_is_forward_only() {
        use TxStatus::*;
        assert!(Initialized.can_transition_to(Signed));
        assert!(Signed.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(ConfirmationTimeout));

        assert!(!Signed.can_transition_to(Initialized));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Initialized.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Confirmed));
    }

    #[test]
    fn test_receipt_status() {
        let ok: Receipt = serde_json::from_value(json!({
            "blockNumber": "0x5",
            "status": "0x1",
            "gasUsed": "0x5208",
            "shardID": 0,
            "extra": "kept"
        }))
        .unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.block_number, Some(5));
        assert_eq!(ok.gas_used, Some(21000));
        assert_eq!(ok.other.get("extra"), Some(&json!("kept")));

        let failed: Receipt = serde_json::from_value(json!({"status": "0x2"})).unwrap();
        assert!(!failed.is_success());

        let legacy: Receipt = serde_json::from_value(json!({"root": "0xabc"})).unwrap();
        assert!(legacy.is_success());
    }

    #[test]
    fn test_recoverable_errors() {
        let timeout = TransactionError::ConfirmationTimeout {
            tx_hash: B256::ZERO,
            blocks_seen: 3,
            max_blocks: 20,
        };
        assert!(timeout.is_recoverable());
        assert!(timeout.to_string().ends_with("not confirmed: 3 of 20 blocks observed"));
        assert!(!TransactionError::Network(NetworkError::Timeout(10)).is_recoverable());
        assert!(!TransactionError::Network(NetworkError::Transport("reset".into())).is_recoverable());
        assert!(!TransactionError::AlreadySigned.is_recoverable());
        assert!(!TransactionError::Network(NetworkError::Rpc {
            code: -32000,
            message: "nonce too low".into()
        })
        .is_recoverable());
    }
}
