//! Address codec.
//!
//! A 20-byte account address and its four textual projections: lowercase hex,
//! checksummed hex, bech32 with the mainnet prefix and bech32 with the testnet
//! prefix. Decoding accepts any of them; the first structural match wins, in
//! the order hex, bech32 mainnet, bech32 testnet.

use alloy::primitives::Address as RawAddress;
use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::utils::InvalidFormat;

/// Human-readable prefix of mainnet bech32 addresses.
pub const MAINNET_HRP: &str = "itc";
/// Human-readable prefix of testnet bech32 addresses.
pub const TESTNET_HRP: &str = "titc";

const ADDRESS_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(RawAddress);

impl Address {
    pub const ZERO: Address = Address(RawAddress::ZERO);

    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(RawAddress::new(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, InvalidFormat> {
        if bytes.len() != ADDRESS_LEN {
            return Err(InvalidFormat::new(format!(
                "address must be {} bytes, got {}",
                ADDRESS_LEN,
                bytes.len()
            )));
        }
        Ok(Self(RawAddress::from_slice(bytes)))
    }

    /// Decode any accepted textual form.
    pub fn decode(input: &str) -> Result<Self, InvalidFormat> {
        if let Some(addr) = Self::decode_hex(input) {
            return Ok(addr);
        }
        if let Some(addr) = Self::decode_bech32(input, MAINNET_HRP) {
            return Ok(addr);
        }
        if let Some(addr) = Self::decode_bech32(input, TESTNET_HRP) {
            return Ok(addr);
        }
        Err(InvalidFormat::new(format!(
            "\"{}\" is an invalid address format",
            input
        )))
    }

    fn decode_hex(input: &str) -> Option<Self> {
        let body = input.strip_prefix("0x")?;
        if body.len() != ADDRESS_LEN * 2 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let bytes = alloy::hex::decode(body).ok()?;
        Self::from_slice(&bytes).ok()
    }

    fn decode_bech32(input: &str, hrp: &str) -> Option<Self> {
        let checked = CheckedHrpstring::new::<Bech32>(input).ok()?;
        if checked.hrp().to_lowercase() != hrp {
            return None;
        }
        let bytes: Vec<u8> = checked.byte_iter().collect();
        Self::from_slice(&bytes).ok()
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0 .0 .0
    }

    /// The underlying alloy address.
    pub fn raw(&self) -> RawAddress {
        self.0
    }

    /// Lowercase `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", alloy::hex::encode(self.0.as_slice()))
    }

    /// Mixed-case checksummed hex.
    pub fn to_checksum(&self) -> String {
        self.0.to_checksum(None)
    }

    /// Bech32 encoding under an arbitrary human-readable prefix.
    pub fn to_bech32(&self, hrp: &str) -> Result<String, InvalidFormat> {
        let hrp = Hrp::parse(hrp)
            .map_err(|e| InvalidFormat::new(format!("invalid bech32 prefix '{}': {}", hrp, e)))?;
        bech32::encode::<Bech32>(hrp, self.0.as_slice())
            .map_err(|e| InvalidFormat::new(format!("bech32 encoding failed: {}", e)))
    }

    pub fn to_bech32_main(&self) -> String {
        bech32::encode::<Bech32>(Hrp::parse_unchecked(MAINNET_HRP), self.0.as_slice())
            .unwrap_or_default()
    }

    pub fn to_bech32_test(&self) -> String {
        bech32::encode::<Bech32>(Hrp::parse_unchecked(TESTNET_HRP), self.0.as_slice())
            .unwrap_or_default()
    }

    /// True when `s` is exactly the lowercase hex form of the address it names.
    pub fn is_valid_basic(s: &str) -> bool {
        Self::decode(s).map(|a| a.to_hex() == s).unwrap_or(false)
    }

    pub fn is_valid_checksum(s: &str) -> bool {
        Self::decode(s).map(|a| a.to_checksum() == s).unwrap_or(false)
    }

    pub fn is_valid_bech32(s: &str) -> bool {
        Self::decode(s).map(|a| a.to_bech32_main() == s).unwrap_or(false)
    }

    pub fn is_valid_bech32_testnet(s: &str) -> bool {
        Self::decode(s).map(|a| a.to_bech32_test() == s).unwrap_or(false)
    }
}

impl From<RawAddress> for Address {
    fn from(raw: RawAddress) -> Self {
        Self(raw)
    }
}

impl From<Address> for RawAddress {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl FromStr for Address {
    type Err = InvalidFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::decode(&s).map_err(serde::de::Error::custom)
    }
}
