//! Transaction signing, submission, and confirmation monitoring.
//!
//! # Responsibilities
//! - Sign parameters into a new, immutable signed transaction
//! - Submit the raw payload to the source shard
//! - Poll for the receipt once per new block, within a bounded budget
//! - Track the forward-only status machine
//!
//! # Design Decisions
//! - Methods take `&mut self`: at most one submit or confirm runs per instance
//! - No automatic retries; RPC failures surface immediately
//! - Dropping a `confirm` future cancels its polling

use alloy::hex;
use alloy::primitives::{Bytes, B256};
use serde_json::Value;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use crate::crypto::{Address, KeyProvider};
use crate::network::{BlockTag, Blockchain, Messenger, NetworkResult, RpcMethod};
use crate::observability::metrics;
use crate::transaction::codec;
use crate::transaction::types::{
    ConfirmOptions, Receipt, TransactionError, TransactionParams, TransactionResult, TxSignature,
    TxStatus,
};
use crate::utils::{is_hash, InvalidFormat};

/// One transaction and its lifecycle.
#[derive(Debug, Clone)]
pub struct Transaction {
    messenger: Arc<Messenger>,
    params: TransactionParams,
    status: TxStatus,
    raw: Option<Bytes>,
    id: Option<B256>,
    receipt: Option<Receipt>,
    cx_receipt: Option<Value>,
}

/// How a block-advance poll ended.
enum Polled<T> {
    Found(T),
    /// Budget spent. `blocks_seen` counts observed block advances.
    Exhausted { blocks_seen: u32 },
}

/// Poll `fetch` once per new block on `shard`.
///
/// `max_blocks` bounds the number of observed block advances. A chain that
/// stops advancing is bounded separately: `max_blocks` consecutive polls
/// without a new block also end the wait.
async fn poll_on_new_blocks<T, F, Fut>(
    chain: &Blockchain,
    shard: u32,
    options: ConfirmOptions,
    tx_hash: &B256,
    mut fetch: F,
) -> NetworkResult<Polled<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = NetworkResult<Option<T>>>,
{
    let mut last_block = chain.block_number(Some(shard)).await?;
    let mut blocks_seen = 0u32;
    let mut stalled = 0u32;

    loop {
        let current = chain.block_number(Some(shard)).await?;
        if current > last_block {
            last_block = current;
            blocks_seen += 1;
            stalled = 0;
            if let Some(found) = fetch().await? {
                return Ok(Polled::Found(found));
            }
            if blocks_seen >= options.max_blocks {
                return Ok(Polled::Exhausted { blocks_seen });
            }
        } else {
            stalled += 1;
            if stalled >= options.max_blocks {
                tracing::debug!(tx_hash = %tx_hash, shard_id = shard, block = current, "Chain stalled");
                return Ok(Polled::Exhausted { blocks_seen });
            }
        }

        tracing::debug!(
            tx_hash = %tx_hash,
            shard_id = shard,
            blocks_seen,
            stalled,
            max_blocks = options.max_blocks,
            block = current,
            "Waiting for receipt"
        );
        tokio::time::sleep(options.poll_interval).await;
    }
}

impl Transaction {
    /// An unsigned transaction in `Initialized` state.
    pub fn new(messenger: Arc<Messenger>, params: TransactionParams) -> Self {
        Self {
            messenger,
            params,
            status: TxStatus::Initialized,
            raw: None,
            id: None,
            receipt: None,
            cx_receipt: None,
        }
    }

    /// A transaction that is already signed, e.g. decoded from a raw payload.
    pub(crate) fn from_signed(messenger: Arc<Messenger>, params: TransactionParams, raw: Bytes) -> Self {
        Self {
            status: TxStatus::Signed,
            raw: Some(raw),
            ..Self::new(messenger, params)
        }
    }

    pub fn params(&self) -> &TransactionParams {
        &self.params
    }

    /// Parameters may only change before signing.
    pub fn params_mut(&mut self) -> TransactionResult<&mut TransactionParams> {
        if self.status != TxStatus::Initialized {
            return Err(TransactionError::InvalidStatus {
                expected: TxStatus::Initialized,
                actual: self.status,
            });
        }
        Ok(&mut self.params)
    }

    pub fn status(&self) -> TxStatus {
        self.status
    }

    pub fn is_signed(&self) -> bool {
        self.params.signature.is_some()
    }

    pub fn raw(&self) -> Option<&Bytes> {
        self.raw.as_ref()
    }

    /// `0x`-prefixed raw payload, once signed.
    pub fn raw_hex(&self) -> Option<String> {
        self.raw.as_ref().map(hex::encode_prefixed)
    }

    /// keccak256 of the signed payload.
    pub fn computed_hash(&self) -> Option<B256> {
        self.raw.as_ref().map(|raw| codec::transaction_hash(raw))
    }

    /// Hash returned by the node on submission.
    pub fn id(&self) -> Option<B256> {
        self.id
    }

    pub fn receipt(&self) -> Option<&Receipt> {
        self.receipt.as_ref()
    }

    pub fn cx_receipt(&self) -> Option<&Value> {
        self.cx_receipt.as_ref()
    }

    pub fn messenger(&self) -> &Arc<Messenger> {
        &self.messenger
    }

    fn transition(&mut self, next: TxStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "illegal transition {} -> {}",
            self.status,
            next
        );
        self.status = next;
        metrics::record_transaction_status(next);
    }

    fn require(&self, expected: TxStatus) -> TransactionResult<()> {
        if self.status != expected {
            return Err(TransactionError::InvalidStatus {
                expected,
                actual: self.status,
            });
        }
        Ok(())
    }

    /// Set the nonce from the sender's on-chain transaction count.
    ///
    /// Uses `address`, or `from` when not given.
    pub async fn sync_nonce(&mut self, address: Option<&Address>) -> TransactionResult<u64> {
        self.require(TxStatus::Initialized)?;
        let address = address
            .copied()
            .or(self.params.from)
            .ok_or_else(|| InvalidFormat::new("no sender address to read a nonce for"))?;

        let nonce = Blockchain::new(self.messenger.clone())
            .get_transaction_count(&address, BlockTag::Latest, Some(self.params.shard_id))
            .await?;
        self.params.nonce = nonce;
        tracing::debug!(address = %address, nonce, "Nonce synced");
        Ok(nonce)
    }

    /// Sign with `key` and return the signed transaction. `self` is untouched.
    pub fn sign<K: KeyProvider + ?Sized>(&self, key: &K) -> TransactionResult<Transaction> {
        if self.is_signed() || self.status == TxStatus::Signed {
            return Err(TransactionError::AlreadySigned);
        }
        self.require(TxStatus::Initialized)?;

        let signer = key.address();
        if let Some(from) = self.params.from {
            if from != signer {
                return Err(TransactionError::SenderMismatch { from, signer });
            }
        }

        let chain_id = self.params.chain_id;
        let hash = codec::signing_hash(&self.params, chain_id);
        let sig = key
            .sign_hash(&hash)
            .map_err(|e| TransactionError::Signing(e.to_string()))?;
        let signature = TxSignature {
            v: codec::replay_protected_v(sig.v(), chain_id)?,
            r: sig.r(),
            s: sig.s(),
        };

        let mut params = self.params.clone();
        params.from = Some(signer);
        params.signature = Some(signature);
        let raw = Bytes::from(codec::encode_signed(&params, &signature));

        let mut signed = Transaction::new(self.messenger.clone(), params);
        signed.raw = Some(raw);
        signed.transition(TxStatus::Signed);

        tracing::debug!(
            from = %signer,
            nonce = signed.params.nonce,
            shard_id = signed.params.shard_id,
            to_shard_id = signed.params.to_shard_id,
            "Transaction signed"
        );
        Ok(signed)
    }

    /// Submit to the source shard. Moves `Signed` to `Pending`.
    pub async fn send_transaction(&mut self) -> TransactionResult<B256> {
        self.require(TxStatus::Signed)?;
        let raw_hex = self
            .raw_hex()
            .ok_or_else(|| InvalidFormat::new("signed transaction has no raw payload"))?;

        let result = self
            .messenger
            .send(
                RpcMethod::SendRawTransaction,
                vec![Value::String(raw_hex)],
                Some(self.params.shard_id),
            )
            .await?;

        let hash = result
            .as_str()
            .filter(|s| is_hash(s))
            .and_then(|s| B256::from_str(s).ok())
            .ok_or_else(|| InvalidFormat::new(format!("{} is not a transaction hash", result)))?;

        self.id = Some(hash);
        self.transition(TxStatus::Pending);
        tracing::info!(
            tx_hash = %hash,
            shard_id = self.params.shard_id,
            "Transaction submitted"
        );
        Ok(hash)
    }

    /// Wait for the receipt of `tx_hash` on the source shard.
    ///
    /// Reads a baseline block number, then polls every `poll_interval`,
    /// querying the receipt each time the block number advanced. Gives up
    /// after `max_blocks` advances, or after `max_blocks` consecutive polls
    /// without one. A receipt resolves to `Confirmed` or `Rejected`; giving up
    /// moves the transaction to `ConfirmationTimeout` and returns that error.
    /// An RPC failure leaves the status `Pending`.
    pub async fn confirm(
        &mut self,
        tx_hash: B256,
        options: ConfirmOptions,
    ) -> TransactionResult<TxStatus> {
        self.require(TxStatus::Pending)?;
        let shard = self.params.shard_id;
        let chain = Blockchain::new(self.messenger.clone());

        let receipt = poll_on_new_blocks(&chain, shard, options, &tx_hash, || {
            chain.get_transaction_receipt(&tx_hash, Some(shard))
        })
        .await?;

        match receipt {
            Polled::Found(receipt) => {
                let next = if receipt.is_success() {
                    TxStatus::Confirmed
                } else {
                    TxStatus::Rejected
                };
                self.receipt = Some(receipt);
                self.transition(next);
                tracing::info!(tx_hash = %tx_hash, status = %next, "Transaction resolved");
                Ok(next)
            }
            Polled::Exhausted { blocks_seen } => {
                self.transition(TxStatus::ConfirmationTimeout);
                tracing::warn!(
                    tx_hash = %tx_hash,
                    blocks_seen,
                    max_blocks = options.max_blocks,
                    "Transaction not confirmed"
                );
                Err(TransactionError::ConfirmationTimeout {
                    tx_hash,
                    blocks_seen,
                    max_blocks: options.max_blocks,
                })
            }
        }
    }

    /// Wait for the destination-shard receipt of a confirmed cross-shard
    /// transfer. The status does not change; a timeout leaves it `Confirmed`.
    pub async fn confirm_cross_shard(
        &mut self,
        tx_hash: B256,
        options: ConfirmOptions,
    ) -> TransactionResult<Value> {
        self.require(TxStatus::Confirmed)?;
        if !self.params.is_cross_shard() {
            return Err(InvalidFormat::new("transaction does not cross shards").into());
        }
        let shard = self.params.to_shard_id;
        let chain = Blockchain::new(self.messenger.clone());

        let cx = poll_on_new_blocks(&chain, shard, options, &tx_hash, || {
            chain.get_cx_receipt_by_hash(&tx_hash, Some(shard))
        })
        .await?;

        match cx {
            Polled::Found(cx) => {
                self.cx_receipt = Some(cx.clone());
                tracing::info!(tx_hash = %tx_hash, to_shard_id = shard, "Cross-shard receipt found");
                Ok(cx)
            }
            Polled::Exhausted { blocks_seen } => Err(TransactionError::ConfirmationTimeout {
                tx_hash,
                blocks_seen,
                max_blocks: options.max_blocks,
            }),
        }
    }
}
