//! Shard endpoint definitions.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::network::transport::TransportKind;
use crate::network::types::{NetworkError, NetworkResult};

/// One shard of the network and the URLs it is reachable at.
///
/// Field names match the node's sharding-structure output so the same type
/// deserializes from config files and from `getShardingStructure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardEndpoint {
    #[serde(rename = "shardID", alias = "shard_id")]
    pub shard_id: u32,

    /// Default shard for calls that do not name one.
    #[serde(rename = "current", alias = "is_current", default)]
    pub is_current: bool,

    #[serde(rename = "http", alias = "http_url")]
    pub http_url: String,

    #[serde(rename = "ws", alias = "ws_url", default, skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
}

impl ShardEndpoint {
    pub fn new(shard_id: u32, http_url: impl Into<String>) -> Self {
        Self {
            shard_id,
            is_current: false,
            http_url: http_url.into(),
            ws_url: None,
        }
    }

    pub fn with_ws(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = Some(ws_url.into());
        self
    }

    pub fn current(mut self) -> Self {
        self.is_current = true;
        self
    }

    /// The parsed URL for the given transport variant.
    pub fn url_for(&self, kind: TransportKind) -> NetworkResult<Url> {
        let raw = match kind {
            TransportKind::Http => self.http_url.as_str(),
            TransportKind::Ws => self.ws_url.as_deref().ok_or_else(|| NetworkError::InvalidUrl {
                url: String::new(),
                reason: format!("shard {} has no websocket endpoint", self.shard_id),
            })?,
        };
        let url = Url::parse(raw).map_err(|e| NetworkError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        let scheme_ok = match kind {
            TransportKind::Http => matches!(url.scheme(), "http" | "https"),
            TransportKind::Ws => matches!(url.scheme(), "ws" | "wss"),
        };
        if !scheme_ok {
            return Err(NetworkError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("scheme '{}' does not match {} transport", url.scheme(), kind),
            });
        }
        Ok(url)
    }

    /// Same shard, same URLs; `is_current` is not compared.
    pub fn same_location(&self, other: &ShardEndpoint) -> bool {
        self.shard_id == other.shard_id
            && self.http_url == other.http_url
            && self.ws_url == other.ws_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_sharding_structure_item() {
        let item = json!({"current": true, "http": "http://127.0.0.1:9500", "shardID": 0, "ws": "ws://127.0.0.1:9800"});
        let shard: ShardEndpoint = serde_json::from_value(item).unwrap();
        assert_eq!(shard.shard_id, 0);
        assert!(shard.is_current);
        assert_eq!(shard.ws_url.as_deref(), Some("ws://127.0.0.1:9800"));
    }

    #[test]
    fn test_url_for_checks_scheme() {
        let shard = ShardEndpoint::new(1, "http://localhost:9501").with_ws("ws://localhost:9801");
        assert!(shard.url_for(TransportKind::Http).is_ok());
        assert!(shard.url_for(TransportKind::Ws).is_ok());

        let bad = ShardEndpoint::new(1, "ws://localhost:9501");
        assert!(matches!(
            bad.url_for(TransportKind::Http),
            Err(NetworkError::InvalidUrl { .. })
        ));
        assert!(bad.url_for(TransportKind::Ws).is_err());
    }

    #[test]
    fn test_same_location_ignores_current_flag() {
        let a = ShardEndpoint::new(0, "http://a").current();
        let b = ShardEndpoint::new(0, "http://a");
        assert!(a.same_location(&b));
        assert!(!a.same_location(&ShardEndpoint::new(0, "http://b")));
    }
}
