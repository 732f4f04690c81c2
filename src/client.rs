//! Client facade: one Messenger plus the handles built on it.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{load_config, validate_config, ClientConfig, ConfigError};
use crate::network::{Blockchain, Messenger, NetworkError, ShardEndpoint};
use crate::observability::metrics;
use crate::transaction::{ConfirmOptions, TransactionFactory};
use crate::utils::{ChainId, ChainType};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Entry point for applications.
#[derive(Debug, Clone)]
pub struct IntelchainClient {
    messenger: Arc<Messenger>,
    blockchain: Blockchain,
    transactions: TransactionFactory,
    confirm_options: ConfirmOptions,
}

impl IntelchainClient {
    /// Validate `config` and connect every shard.
    pub async fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        validate_config(config).map_err(ConfigError::Validation)?;
        metrics::set_enabled(config.observability.metrics_enabled);
        let messenger = Messenger::connect(config).await?;
        tracing::info!(
            chain_type = %config.chain.chain_type,
            chain_id = %config.chain.chain_id,
            shards = config.shards.len(),
            transport = %config.transport.kind,
            "Client initialized"
        );
        Ok(Self::with_messenger(
            Arc::new(messenger),
            config.confirmation.options(),
        ))
    }

    pub async fn from_file(path: &Path) -> Result<Self, ClientError> {
        let config = load_config(path)?;
        Self::from_config(&config).await
    }

    pub fn with_messenger(messenger: Arc<Messenger>, confirm_options: ConfirmOptions) -> Self {
        Self {
            blockchain: Blockchain::new(messenger.clone()),
            transactions: TransactionFactory::new(messenger.clone()),
            messenger,
            confirm_options,
        }
    }

    pub fn messenger(&self) -> &Arc<Messenger> {
        &self.messenger
    }

    pub fn blockchain(&self) -> &Blockchain {
        &self.blockchain
    }

    pub fn transactions(&self) -> &TransactionFactory {
        &self.transactions
    }

    /// Confirmation budget from the configuration.
    pub fn confirm_options(&self) -> ConfirmOptions {
        self.confirm_options
    }

    pub fn set_chain_type(&self, chain_type: ChainType) {
        self.messenger.set_chain_type(chain_type);
    }

    pub fn set_chain_id(&self, chain_id: ChainId) {
        self.messenger.set_chain_id(chain_id);
    }

    pub fn set_default_shard(&self, shard_id: u32) -> Result<(), ClientError> {
        Ok(self.messenger.set_default_shard(shard_id)?)
    }

    /// Replace the shard table with `shards`.
    pub async fn sharding_structures(&self, shards: Vec<ShardEndpoint>) -> Result<(), ClientError> {
        Ok(self.messenger.reconfigure(shards).await?)
    }

    /// Fetch the sharding structure from the default shard and adopt it.
    pub async fn sync_sharding_structure(&self) -> Result<Vec<ShardEndpoint>, ClientError> {
        let shards = self.blockchain.get_sharding_structure().await?;
        self.messenger.reconfigure(shards.clone()).await?;
        tracing::info!(shards = shards.len(), "Sharding structure synced");
        Ok(shards)
    }

    pub fn close(&self) {
        self.messenger.close();
    }
}
