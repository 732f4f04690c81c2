//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the shard table is usable: ids unique, default shard present
//! - Validate endpoint URLs against the selected transport
//! - Validate value ranges (timeouts and budgets > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::network::transport::TransportKind;

/// One problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.shards.is_empty() {
        errors.push(ValidationError::new("shards", "at least one shard is required"));
    }

    let mut seen = HashSet::new();
    for (i, shard) in config.shards.iter().enumerate() {
        let field = format!("shards[{}]", i);
        if !seen.insert(shard.shard_id) {
            errors.push(ValidationError::new(
                &field,
                format!("duplicate shard id {}", shard.shard_id),
            ));
        }
        if let Err(e) = shard.url_for(TransportKind::Http) {
            errors.push(ValidationError::new(format!("{}.http", field), e.to_string()));
        }
        match (&shard.ws_url, config.transport.kind) {
            (Some(_), _) => {
                if let Err(e) = shard.url_for(TransportKind::Ws) {
                    errors.push(ValidationError::new(format!("{}.ws", field), e.to_string()));
                }
            }
            (None, TransportKind::Ws) => errors.push(ValidationError::new(
                format!("{}.ws", field),
                "required when transport.kind = \"ws\"",
            )),
            (None, TransportKind::Http) => {}
        }
    }

    let current = config.shards.iter().filter(|s| s.is_current).count();
    if current > 1 {
        errors.push(ValidationError::new(
            "shards",
            format!("{} shards are marked current, at most one may be", current),
        ));
    }

    if let Some(default) = config.chain.default_shard_id {
        if !seen.contains(&default) {
            errors.push(ValidationError::new(
                "chain.default_shard_id",
                format!("shard {} is not registered", default),
            ));
        }
    }

    if config.transport.request_timeout_secs == 0 {
        errors.push(ValidationError::new("transport.request_timeout_secs", "must be > 0"));
    }
    if config.transport.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("transport.connect_timeout_secs", "must be > 0"));
    }
    if config.confirmation.max_blocks == 0 {
        errors.push(ValidationError::new("confirmation.max_blocks", "must be > 0"));
    }
    if config.confirmation.poll_interval_ms == 0 {
        errors.push(ValidationError::new("confirmation.poll_interval_ms", "must be > 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
