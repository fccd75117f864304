//! Protocol parameters used in fee and deposit arithmetic

use serde::{Deserialize, Serialize};

/// Default TTL offset relative to the chain tip, in slots
pub const DEFAULT_RELATIVE_TTL: u64 = 1000;

/// Default stake key deposit in Lovelace
pub const DEFAULT_KEY_DEPOSIT: u64 = 2_000_000;

/// Default pool registration deposit in Lovelace
pub const DEFAULT_POOL_DEPOSIT: u64 = 500_000_000;

/// The protocol parameter subset the engine needs for fee calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParameters {
    /// Linear fee coefficient (per byte)
    pub min_fee_coefficient: u64,

    /// Linear fee constant
    pub min_fee_constant: u64,

    pub key_deposit: u64,
    pub pool_deposit: u64,
}

/// Deposit parameters supplied with construction requests, falling back to
/// protocol defaults when absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositParameters {
    pub key_deposit: u64,
    pub pool_deposit: u64,
}

impl Default for DepositParameters {
    fn default() -> Self {
        Self {
            key_deposit: DEFAULT_KEY_DEPOSIT,
            pool_deposit: DEFAULT_POOL_DEPOSIT,
        }
    }
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_defaults() {
        let d = DepositParameters::default();
        assert_eq!(d.key_deposit, 2_000_000);
        assert_eq!(d.pool_deposit, 500_000_000);
    }
}
