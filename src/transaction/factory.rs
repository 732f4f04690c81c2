//! Transaction construction bound to a Messenger.

use alloy::hex;
use alloy::primitives::Bytes;
use std::sync::Arc;

use crate::network::Messenger;
use crate::transaction::codec;
use crate::transaction::transaction::Transaction;
use crate::transaction::types::{TransactionParams, TransactionResult};
use crate::utils::{ChainId, InvalidFormat};

#[derive(Debug, Clone)]
pub struct TransactionFactory {
    messenger: Arc<Messenger>,
}

impl TransactionFactory {
    pub fn new(messenger: Arc<Messenger>) -> Self {
        Self { messenger }
    }

    /// New unsigned transaction. A chain id of 0 is taken from the Messenger.
    pub fn new_tx(&self, mut params: TransactionParams) -> Transaction {
        if params.chain_id == ChainId::DEFAULT {
            params.chain_id = self.messenger.chain_id();
        }
        Transaction::new(self.messenger.clone(), params)
    }

    /// Rebuild a transaction from its raw hex payload.
    ///
    /// A signed payload comes back `Signed` with `from` recovered; an unsigned
    /// one comes back `Initialized`.
    pub fn recover(&self, raw_hex: &str) -> TransactionResult<Transaction> {
        let raw = hex::decode(raw_hex)
            .map_err(|e| InvalidFormat::new(format!("raw transaction is not hex: {}", e)))?;
        let mut params = codec::decode(&raw)?;

        match params.signature {
            Some(signature) => {
                params.from = Some(codec::recover_sender(&params, &signature)?);
                Ok(Transaction::from_signed(
                    self.messenger.clone(),
                    params,
                    Bytes::from(raw),
                ))
            }
            None => Ok(Transaction::new(self.messenger.clone(), params)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Address;
    use crate::network::TransportKind;
    use crate::network::transport::TransportOptions;
    use crate::transaction::{TransactionError, TxStatus};
    use crate::utils::ChainType;
    use alloy::primitives::U256;

    const RAW: &str = "0xf866800183019a280180940b585f8daefbc68a311fbd4cb20d9174ad1740168084deadbeef25a06b436e82ced570304e1725d0bd05cba8ca23af266693b8c8843afc960abf29eea01f80f8e1b296938eee2c267b077f5201e040c74bc6f7bfeb099b00bce4090071";
    const RAW_HASH: &str = "0x59ac5e76594d823d917639b98e573e35af7d62e19d119a47b83e2677d8d5b7a1";

    fn factory() -> TransactionFactory {
        TransactionFactory::new(Arc::new(Messenger::new(
            ChainType::Intelchain,
            ChainId::ITC_TESTNET,
            TransportKind::Http,
            TransportOptions::default(),
        )))
    }

    #[test]
    fn test_new_tx_fills_chain_id() {
        let tx = factory().new_tx(TransactionParams::transfer(Address::ZERO, U256::ZERO));
        assert_eq!(tx.params().chain_id, ChainId::ITC_TESTNET);

        let explicit = factory().new_tx(
            TransactionParams::transfer(Address::ZERO, U256::ZERO).with_chain_id(ChainId::ITC_MAINNET),
        );
        assert_eq!(explicit.params().chain_id, ChainId::ITC_MAINNET);
    }

    #[test]
    fn test_recover_fixture() {
        let tx = factory().recover(RAW).unwrap();
        let params = tx.params();

        assert_eq!(tx.status(), TxStatus::Signed);
        assert_eq!(
            params.from.unwrap().to_bech32_main(),
            "itc103q7qe5t2505lypvltkqtddaef5tzfxw478mn9"
        );
        assert_eq!(
            params.to.unwrap().to_bech32_test(),
            "titc1pdv9lrdwl0rg5vglh4xtyrv3wjk3wsqkjsfghw"
        );
        assert_eq!(params.nonce, 0);
        assert_eq!(params.gas_price, U256::from(1u64));
        assert_eq!(params.gas_limit, U256::from(105_000u64));
        assert_eq!((params.shard_id, params.to_shard_id), (1, 0));
        assert_eq!(params.chain_id, ChainId::ITC_MAINNET);
        assert_eq!(&params.data[..], &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(tx.raw_hex().unwrap(), RAW);
        assert_eq!(tx.computed_hash().unwrap().to_string(), RAW_HASH);
    }

    #[test]
    fn test_recover_unsigned_payload() {
        let params = TransactionParams::transfer(Address::ZERO, U256::from(5u64))
            .with_chain_id(ChainId::ITC_TESTNET);
        let raw = hex::encode_prefixed(codec::encode_for_signing(&params, params.chain_id));
        let tx = factory().recover(&raw).unwrap();
        assert_eq!(tx.status(), TxStatus::Initialized);
        assert_eq!(tx.params(), &params);
    }

    #[test]
    fn test_recover_rejects_garbage() {
        assert!(matches!(
            factory().recover("0xzz"),
            Err(TransactionError::InvalidFormat(_))
        ));
        assert!(matches!(
            factory().recover("0x01"),
            Err(TransactionError::InvalidFormat(_))
        ));
    }
}
