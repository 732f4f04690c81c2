//! Address codec and signing keys.
//!
//! # Security Constraints
//! - Private keys are never logged or serialized
//! - Address equality is on raw bytes, never on a textual form

pub mod address;
pub mod keys;

pub use address::{Address, MAINNET_HRP, TESTNET_HRP};
pub use keys::{KeyProvider, LocalKey};
