//! Numeric, hex and chain utilities shared by every other subsystem.
//!
//! # Data Flow
//! ```text
//! caller input (strings, integers)
//!     → hex.rs (validation, integer <-> hex)
//!     → chain.rs (chain type prefix, chain id)
//!     → units.rs (denomination conversion)
//! ```

pub mod chain;
pub mod hex;
pub mod units;

use thiserror::Error;

pub use chain::{ChainId, ChainType};
pub use hex::{
    add_0x, hex_to_u256, hex_to_u64, is_hash, is_hex, number_to_hex, quantity_to_u64, strip_0x,
    u256_to_hex,
};
pub use units::Unit;

/// Malformed address, hex or hash input.
///
/// Always a caller bug; never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid format: {0}")]
pub struct InvalidFormat(pub String);

impl InvalidFormat {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
