//! Canonical RLP encoding of sharded transactions.
//!
//! ```text
//! signing payload: [nonce, gasPrice, gasLimit, shardID, toShardID, to, value, data, chainId, 0, 0]
//! signed payload:  [nonce, gasPrice, gasLimit, shardID, toShardID, to, value, data, v, r, s]
//! ```
//!
//! Scalars are minimal big-endian (zero is the empty string); `to` is 20
//! bytes or empty. `v = recoveryId + chainId * 2 + 35`; 27/28 are accepted
//! on decode as unprotected signatures.

use alloy::primitives::{keccak256, Address as RawAddress, Bytes, Signature, B256, U256};
use alloy::rlp::{BufMut, Decodable, Encodable, Header, EMPTY_STRING_CODE};

use crate::crypto::Address;
use crate::transaction::types::{TransactionError, TransactionParams, TransactionResult, TxSignature};
use crate::utils::{ChainId, InvalidFormat};

/// Offset added to `recoveryId + chainId * 2` in replay-protected signatures.
const REPLAY_PROTECTED_V_OFFSET: u64 = 35;
const LEGACY_V_OFFSET: u64 = 27;

struct Recipient(Option<RawAddress>);

impl Encodable for Recipient {
    fn encode(&self, out: &mut dyn BufMut) {
        match &self.0 {
            Some(address) => address.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
    }

    fn length(&self) -> usize {
        match &self.0 {
            Some(address) => address.length(),
            None => 1,
        }
    }
}

fn encode_list(fields: &[&dyn Encodable]) -> Vec<u8> {
    let payload_length: usize = fields.iter().map(|f| f.length()).sum();
    let mut out = Vec::with_capacity(payload_length + 4);
    Header {
        list: true,
        payload_length,
    }
    .encode(&mut out);
    for field in fields {
        field.encode(&mut out);
    }
    out
}

fn encode_with_tail(params: &TransactionParams, tail: &[&dyn Encodable]) -> Vec<u8> {
    let to = Recipient(params.to.map(|a| a.raw()));
    let mut fields: Vec<&dyn Encodable> = vec![
        &params.nonce,
        &params.gas_price,
        &params.gas_limit,
        &params.shard_id,
        &params.to_shard_id,
        &to,
        &params.value,
        &params.data,
    ];
    fields.extend_from_slice(tail);
    encode_list(&fields)
}

/// Payload whose keccak256 is signed.
pub fn encode_for_signing(params: &TransactionParams, chain_id: ChainId) -> Vec<u8> {
    encode_with_tail(params, &[&chain_id.0, &0u8, &0u8])
}

/// Raw transaction as submitted to the node.
pub fn encode_signed(params: &TransactionParams, signature: &TxSignature) -> Vec<u8> {
    encode_with_tail(params, &[&signature.v, &signature.r, &signature.s])
}

/// Pre-EIP-155 payload, used only to recover unprotected signatures.
fn encode_unprotected(params: &TransactionParams) -> Vec<u8> {
    encode_with_tail(params, &[])
}

pub fn signing_hash(params: &TransactionParams, chain_id: ChainId) -> B256 {
    keccak256(encode_for_signing(params, chain_id))
}

/// Hash the node reports for a signed raw transaction.
pub fn transaction_hash(raw: &[u8]) -> B256 {
    keccak256(raw)
}

/// Wire `v` for a recovery id on `chain_id`. Fails when the chain id is too
/// large to fit.
pub fn replay_protected_v(recovery_id: bool, chain_id: ChainId) -> TransactionResult<u64> {
    chain_id
        .0
        .checked_mul(2)
        .and_then(|v| v.checked_add(REPLAY_PROTECTED_V_OFFSET))
        .and_then(|v| v.checked_add(u64::from(recovery_id)))
        .ok_or_else(|| InvalidFormat::new(format!("chain id {} overflows v", chain_id.0)).into())
}

fn rlp_error(e: alloy::rlp::Error) -> TransactionError {
    TransactionError::InvalidFormat(InvalidFormat::new(format!("malformed transaction RLP: {}", e)))
}

/// Inverse of both encodings.
///
/// With `r = s = 0` the trailing triple is `(chainId, 0, 0)` and the result
/// is unsigned. Otherwise the chain id is derived from `v`. The sender is not
/// recovered here; see [`recover_sender`].
pub fn decode(raw: &[u8]) -> TransactionResult<TransactionParams> {
    let mut buf = raw;
    let header = Header::decode(&mut buf).map_err(rlp_error)?;
    if !header.list {
        return Err(InvalidFormat::new("transaction is not an RLP list").into());
    }
    if buf.len() != header.payload_length {
        return Err(InvalidFormat::new(format!(
            "{} trailing bytes after transaction",
            buf.len().saturating_sub(header.payload_length)
        ))
        .into());
    }

    let mut payload = buf;
    let nonce = u64::decode(&mut payload).map_err(rlp_error)?;
    let gas_price = U256::decode(&mut payload).map_err(rlp_error)?;
    let gas_limit = U256::decode(&mut payload).map_err(rlp_error)?;
    let shard_id = u32::decode(&mut payload).map_err(rlp_error)?;
    let to_shard_id = u32::decode(&mut payload).map_err(rlp_error)?;
    let to_bytes = Bytes::decode(&mut payload).map_err(rlp_error)?;
    let value = U256::decode(&mut payload).map_err(rlp_error)?;
    let data = Bytes::decode(&mut payload).map_err(rlp_error)?;
    let v = u64::decode(&mut payload).map_err(rlp_error)?;
    let r = U256::decode(&mut payload).map_err(rlp_error)?;
    let s = U256::decode(&mut payload).map_err(rlp_error)?;
    if !payload.is_empty() {
        return Err(InvalidFormat::new("transaction has more than 11 fields").into());
    }

    let to = match to_bytes.len() {
        0 => None,
        _ => Some(Address::from_slice(&to_bytes)?),
    };

    let mut params = TransactionParams {
        from: None,
        to,
        value,
        gas_price,
        gas_limit,
        nonce,
        data,
        shard_id,
        to_shard_id,
        chain_id: ChainId(v),
        signature: None,
    };

    if !(r.is_zero() && s.is_zero()) {
        params.chain_id = chain_id_from_v(v)?;
        params.signature = Some(TxSignature { v, r, s });
    }
    Ok(params)
}

fn chain_id_from_v(v: u64) -> TransactionResult<ChainId> {
    match v {
        27 | 28 => Ok(ChainId::DEFAULT),
        v if v >= REPLAY_PROTECTED_V_OFFSET => Ok(ChainId((v - REPLAY_PROTECTED_V_OFFSET) / 2)),
        v => Err(TransactionError::InvalidSignature(format!("invalid v value {}", v))),
    }
}

/// Address whose key produced `signature` over `params`.
pub fn recover_sender(
    params: &TransactionParams,
    signature: &TxSignature,
) -> TransactionResult<Address> {
    let (hash, parity) = match signature.v {
        27 | 28 => (
            keccak256(encode_unprotected(params)),
            signature.v - LEGACY_V_OFFSET == 1,
        ),
        v if v >= REPLAY_PROTECTED_V_OFFSET => {
            let offset = v - REPLAY_PROTECTED_V_OFFSET;
            (
                signing_hash(params, ChainId(offset / 2)),
                offset % 2 == 1,
            )
        }
        v => {
            return Err(TransactionError::InvalidSignature(format!(
                "invalid v value {}",
                v
            )))
        }
    };

    let sig = Signature::new(signature.r, signature.s, parity);
    sig.recover_address_from_prehash(&hash)
        .map(Address::from)
        .map_err(|e| TransactionError::InvalidSignature(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::hex;

    const SENDER: &str = "0x7c41E0668B551f4f902cFaec05B5Bdca68b124CE";
    const RECEIVER: &str = "0x0B585F8DaEfBC68a311FbD4cB20d9174aD174016";

    const UNSIGNED_RLP: &str = "ef0785174876e800830334508001940b585f8daefbc68a311fbd4cb20d9174ad174016880de0b6b3a764000080028080";
    const SIGNING_HASH: &str = "414256ff09755462b5e6353387d12ef7cd0fb1a32d982c7a6911eaa2f3d8ac36";
    const RAW: &str = "0xf86f0785174876e800830334508001940b585f8daefbc68a311fbd4cb20d9174ad174016880de0b6b3a76400008027a0a63b5b843d4e375694e1d9a43e91873cf392127e56526e02768d2e1618ebfdf6a058d264275ad3a7dc8e8ec858ad3b276e828fb8469d378071a369ef5723eedd86";
    const RAW_HASH: &str = "0x446ed54a90d888b61513237b68a5d5f8717b36e2246c93284e2453f461bcfe94";

    fn fixture_params() -> TransactionParams {
        TransactionParams::transfer(
            Address::decode(RECEIVER).unwrap(),
            U256::from(1_000_000_000_000_000_000u64),
        )
        .with_nonce(7)
        .with_gas_price(U256::from(100_000_000_000u64))
        .with_gas_limit(U256::from(210_000u64))
        .with_shards(0, 1)
        .with_chain_id(ChainId::ITC_TESTNET)
    }

    #[test]
    fn test_signing_payload_matches_fixture() {
        let params = fixture_params();
        let encoded = encode_for_signing(&params, params.chain_id);
        assert_eq!(hex::encode(&encoded), UNSIGNED_RLP);
        assert_eq!(
            hex::encode(signing_hash(&params, params.chain_id)),
            SIGNING_HASH
        );
    }

    #[test]
    fn test_decode_signed_fixture() {
        let raw = hex::decode(RAW).unwrap();
        let params = decode(&raw).unwrap();

        assert_eq!(params.nonce, 7);
        assert_eq!(params.shard_id, 0);
        assert_eq!(params.to_shard_id, 1);
        assert_eq!(params.chain_id, ChainId::ITC_TESTNET);
        assert_eq!(params.to, Some(Address::decode(RECEIVER).unwrap()));
        let signature = params.signature.unwrap();
        assert_eq!(signature.v, 39);

        let sender = recover_sender(&params, &signature).unwrap();
        assert_eq!(sender.to_checksum(), SENDER);
        assert_eq!(format!("{}", transaction_hash(&raw)), RAW_HASH);
    }

    #[test]
    fn test_encode_signed_round_trip() {
        let raw = hex::decode(RAW).unwrap();
        let params = decode(&raw).unwrap();
        let signature = params.signature.unwrap();
        assert_eq!(encode_signed(&params, &signature), raw);
    }

    #[test]
    fn test_decode_unsigned_payload() {
        let params = fixture_params();
        let decoded = decode(&encode_for_signing(&params, params.chain_id)).unwrap();
        assert_eq!(decoded, params);
        assert!(decoded.signature.is_none());
    }

    #[test]
    fn test_contract_creation_has_empty_recipient() {
        let params = TransactionParams {
            data: Bytes::from_static(&[0x60, 0x80]),
            chain_id: ChainId::ITC_MAINNET,
            ..Default::default()
        };
        let encoded = encode_for_signing(&params, params.chain_id);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.to, None);
        assert_eq!(decoded.data, params.data);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut raw = hex::decode(RAW).unwrap();
        raw.push(0x00);
        assert!(matches!(
            decode(&raw),
            Err(TransactionError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_wrong_field_count_rejected() {
        let short = encode_list(&[&1u64, &2u64, &3u64]);
        assert!(matches!(
            decode(&short),
            Err(TransactionError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_invalid_v_rejected() {
        let params = fixture_params();
        let signature = TxSignature {
            v: 30,
            r: U256::from(1u64),
            s: U256::from(1u64),
        };
        assert!(matches!(
            recover_sender(&params, &signature),
            Err(TransactionError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_replay_protected_v() {
        assert_eq!(replay_protected_v(false, ChainId::ITC_TESTNET).unwrap(), 39);
        assert_eq!(replay_protected_v(true, ChainId::ITC_MAINNET).unwrap(), 38);
    }

    #[test]
    fn test_replay_protected_v_rejects_oversized_chain_id() {
        assert!(matches!(
            replay_protected_v(false, ChainId(u64::MAX)),
            Err(TransactionError::InvalidFormat(_))
        ));
        assert!(matches!(
            replay_protected_v(true, ChainId(u64::MAX / 2)),
            Err(TransactionError::InvalidFormat(_))
        ));
    }
}
