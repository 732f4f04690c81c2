//! Denomination conversion.

use alloy::primitives::U256;

/// Native token denominations, 18 decimals for the whole unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Wei,
    Kwei,
    Mwei,
    Gwei,
    Szabo,
    Finney,
    /// One whole native token.
    Itc,
}

impl Unit {
    pub fn decimals(&self) -> u8 {
        match self {
            Unit::Wei => 0,
            Unit::Kwei => 3,
            Unit::Mwei => 6,
            Unit::Gwei => 9,
            Unit::Szabo => 12,
            Unit::Finney => 15,
            Unit::Itc => 18,
        }
    }

    fn factor(&self) -> U256 {
        U256::from(10u64).pow(U256::from(self.decimals()))
    }

    /// Convert an amount in this unit to wei. Saturates on overflow.
    pub fn to_wei(&self, amount: U256) -> U256 {
        amount.saturating_mul(self.factor())
    }

    /// Convert wei to this unit, truncating.
    pub fn from_wei(&self, wei: U256) -> U256 {
        wei / self.factor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gwei_to_wei() {
        let wei = Unit::Gwei.to_wei(U256::from(100u64));
        assert_eq!(wei, U256::from(100_000_000_000u64));
        assert_eq!(Unit::Gwei.from_wei(wei), U256::from(100u64));
    }

    #[test]
    fn test_whole_token() {
        assert_eq!(
            Unit::Itc.to_wei(U256::from(1u64)),
            U256::from(1_000_000_000_000_000_000u64)
        );
        assert_eq!(Unit::Wei.to_wei(U256::from(7u64)), U256::from(7u64));
    }
}
