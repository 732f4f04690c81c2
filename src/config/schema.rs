//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::network::transport::{TransportKind, TransportOptions};
use crate::network::ShardEndpoint;
use crate::transaction::ConfirmOptions;
use crate::utils::{ChainId, ChainType};

/// Root configuration for a client instance.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Chain namespace, id and default shard.
    pub chain: ChainConfig,

    /// Transport variant and timeouts.
    pub transport: TransportConfig,

    /// Shard endpoints. No default: an empty list fails validation.
    pub shards: Vec<ShardEndpoint>,

    /// Confirmation polling budget.
    pub confirmation: ConfirmationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ClientConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// `itc` or `eth`.
    pub chain_type: ChainType,

    pub chain_id: ChainId,

    /// Default shard. When unset, the shard flagged `current`, else the lowest id.
    pub default_shard_id: Option<u32>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_type: ChainType::Intelchain,
            chain_id: ChainId::ITC_LOCAL,
            default_shard_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// `http` or `ws`.
    pub kind: TransportKind,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl TransportConfig {
    pub fn options(&self) -> TransportOptions {
        TransportOptions {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Http,
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Block-number polls before a transaction times out.
    pub max_blocks: u32,

    /// Delay between polls in milliseconds.
    pub poll_interval_ms: u64,
}

impl ConfirmationConfig {
    pub fn options(&self) -> ConfirmOptions {
        ConfirmOptions {
            max_blocks: self.max_blocks,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            max_blocks: 20,
            poll_interval_ms: 1000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,

    /// Record metrics through the `metrics` facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}
