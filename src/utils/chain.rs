//! Chain type and chain id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// RPC namespace family. Both families share semantics and differ only in the
/// method-name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChainType {
    #[default]
    #[serde(rename = "itc")]
    Intelchain,
    #[serde(rename = "eth")]
    Ethereum,
}

impl ChainType {
    /// Method-name prefix for this chain type.
    pub fn prefix(&self) -> &'static str {
        match self {
            ChainType::Intelchain => "itc",
            ChainType::Ethereum => "eth",
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const DEFAULT: ChainId = ChainId(0);
    pub const ETH_MAINNET: ChainId = ChainId(1);
    pub const MORDEN: ChainId = ChainId(2);
    pub const ROPSTEN: ChainId = ChainId(3);
    pub const RINKEBY: ChainId = ChainId(4);
    pub const ROOTSTOCK_MAINNET: ChainId = ChainId(30);
    pub const ROOTSTOCK_TESTNET: ChainId = ChainId(31);
    pub const KOVAN: ChainId = ChainId(42);
    pub const ETC_MAINNET: ChainId = ChainId(61);
    pub const ETC_TESTNET: ChainId = ChainId(62);
    pub const GETH: ChainId = ChainId(1337);
    pub const GANACHE: ChainId = ChainId(0);
    pub const ITC_MAINNET: ChainId = ChainId(1);
    pub const ITC_TESTNET: ChainId = ChainId(2);
    pub const ITC_LOCAL: ChainId = ChainId(2);
    pub const ITC_PANGAEA: ChainId = ChainId(3);

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
