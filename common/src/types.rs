//! Core type definitions for Tekton

use crate::error::ConstructionError;

/// Amount in Lovelace
pub type Lovelace = u64;

/// Blake2b-224 hash of a key
pub type KeyHash = Vec<u8>;

/// Blake2b-224 hash of a script
pub type ScriptHash = Vec<u8>;

/// Blake2b-256 hash of a transaction body
pub type TxHash = Vec<u8>;

/// Network identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NetworkId {
    Mainnet,
    Testnet,
}

impl NetworkId {
    /// Map a network name to an id - pre-production and preview are
    /// testnets for address purposes
    pub fn from_name(name: &str) -> Result<Self, ConstructionError> {
        match name {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" | "preprod" | "preview" => Ok(Self::Testnet),
            _ => Err(ConstructionError::InvalidNetwork(name.to_string())),
        }
    }
}

/// A stake credential - either a key hash or a script hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Credential {
    AddrKeyHash(KeyHash),
    ScriptHash(ScriptHash),
}

impl Credential {
    pub fn get_hash(&self) -> &[u8] {
        match self {
            Self::AddrKeyHash(hash) => hash,
            Self::ScriptHash(hash) => hash,
        }
    }
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_names_map_to_ids() {
        assert_eq!(NetworkId::from_name("mainnet").unwrap(), NetworkId::Mainnet);
        assert_eq!(NetworkId::from_name("preprod").unwrap(), NetworkId::Testnet);
        assert_eq!(NetworkId::from_name("preview").unwrap(), NetworkId::Testnet);
        assert!(NetworkId::from_name("devnet").is_err());
    }
}
