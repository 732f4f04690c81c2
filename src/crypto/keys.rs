//! Signing keys.
//!
//! # Security
//! - Private keys are loaded from a hex string or an environment variable
//! - Keys are never logged or serialized

use alloy::primitives::{Signature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use thiserror::Error;

use crate::crypto::address::Address;

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "ITC_PRIVATE_KEY";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Invalid private key format: {0}")]
    InvalidKey(String),

    #[error("Environment variable {0} not set")]
    MissingEnv(&'static str),

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Anything that can sign a 32-byte prehash on behalf of one address.
///
/// Wallets and keystores outside this crate implement it; the transaction
/// engine only ever sees this interface.
pub trait KeyProvider: Send + Sync {
    fn address(&self) -> Address;

    /// Sign `hash` directly (no message prefix). The returned signature carries
    /// the recovery parity; replay protection is applied by the caller.
    fn sign_hash(&self, hash: &B256) -> Result<Signature, KeyError>;
}

/// In-memory secp256k1 key.
#[derive(Clone)]
pub struct LocalKey {
    signer: PrivateKeySigner,
}

impl LocalKey {
    /// Create a key from a hex-encoded private key (with or without `0x`).
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, KeyError> {
        let key_hex = private_key_hex
            .strip_prefix("0x")
            .unwrap_or(private_key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| KeyError::InvalidKey(format!("{}", e)))?;

        tracing::debug!(address = %signer.address(), "Signing key loaded");

        Ok(Self { signer })
    }

    /// Reads `ITC_PRIVATE_KEY` from the environment.
    pub fn from_env() -> Result<Self, KeyError> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR)
            .map_err(|_| KeyError::MissingEnv(PRIVATE_KEY_ENV_VAR))?;

        Self::from_private_key(&private_key)
    }

    /// A fresh random key.
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }
}

impl KeyProvider for LocalKey {
    fn address(&self) -> Address {
        Address::from(self.signer.address())
    }

    fn sign_hash(&self, hash: &B256) -> Result<Signature, KeyError> {
        self.signer
            .sign_hash_sync(hash)
            .map_err(|e| KeyError::Signing(e.to_string()))
    }
}

impl std::fmt::Debug for LocalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKey")
            .field("address", &self.signer.address())
            .finish()
    }
}
