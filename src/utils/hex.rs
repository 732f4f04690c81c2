//! Canonical integer <-> hex conversion and hex/hash predicates.

use alloy::primitives::U256;
use serde_json::Value;

use crate::utils::InvalidFormat;

/// Remove a leading `0x`/`0X` if present.
pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Prepend `0x` unless already present.
pub fn add_0x(s: &str) -> String {
    if s.starts_with("0x") || s.starts_with("0X") {
        s.to_string()
    } else {
        format!("0x{}", s)
    }
}

/// `0x` followed by at least one hex digit.
pub fn is_hex(s: &str) -> bool {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(body) => !body.is_empty() && body.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// `0x` followed by exactly 64 hex digits, any case.
pub fn is_hash(s: &str) -> bool {
    s.len() == 66 && is_hex(s)
}

/// Minimal `0x`-prefixed lowercase hex; zero is `0x0`.
pub fn number_to_hex(n: u64) -> String {
    format!("{:#x}", n)
}

/// Minimal `0x`-prefixed lowercase hex for 256-bit values.
pub fn u256_to_hex(n: U256) -> String {
    format!("{:#x}", n)
}

pub fn hex_to_u64(s: &str) -> Result<u64, InvalidFormat> {
    if !is_hex(s) {
        return Err(InvalidFormat::new(format!("'{}' is not a hex number", s)));
    }
    u64::from_str_radix(strip_0x(s), 16)
        .map_err(|e| InvalidFormat::new(format!("'{}' is not a valid u64: {}", s, e)))
}

pub fn hex_to_u256(s: &str) -> Result<U256, InvalidFormat> {
    if !is_hex(s) {
        return Err(InvalidFormat::new(format!("'{}' is not a hex number", s)));
    }
    U256::from_str_radix(strip_0x(s), 16)
        .map_err(|e| InvalidFormat::new(format!("'{}' is not a valid u256: {}", s, e)))
}

/// A JSON quantity: hex string, decimal string or plain number.
pub fn quantity_to_u64(value: &Value) -> Result<u64, InvalidFormat> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| InvalidFormat::new(format!("'{}' is not a u64", n))),
        Value::String(s) if is_hex(s) => hex_to_u64(s),
        Value::String(s) => s
            .parse()
            .map_err(|_| InvalidFormat::new(format!("'{}' is not a quantity", s))),
        other => Err(InvalidFormat::new(format!("'{}' is not a quantity", other))),
    }
}
