//! Common cryptography helper functions for Tekton

use crate::types::KeyHash;
use blake2::{
    digest::consts::{U28, U32},
    Blake2b, Digest,
};

/// Get a Blake2b-224 hash of a key - the credential form used in addresses
pub fn keyhash_224(key: &[u8]) -> KeyHash {
    let mut hasher = Blake2b::<U28>::new();
    hasher.update(key);
    hasher.finalize().to_vec()
}

/// Get a Blake2b-256 hash of arbitrary data - used for transaction body
/// and auxiliary data hashes
pub fn hash_256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_lengths() {
        assert_eq!(keyhash_224(&[0u8; 32]).len(), 28);
        assert_eq!(hash_256(&[0u8; 32]).len(), 32);
    }

    #[test]
    fn keyhash_matches_cip19_payment_key() {
        // CIP-19 test payment key and its credential hash
        let payment_key = "addr_vk1w0l2sr2zgfm26ztc6nl9xy8ghsk5sh6ldwemlpmp9xylzy4dtf7st80zhd";
        let (_, pubkey) = bech32::decode(payment_key).expect("Invalid Bech32 string");
        let hash = keyhash_224(&pubkey);
        assert_eq!(
            hex::encode(hash),
            "9493315cd92eb5d8c4304e67b7e16ae36d61d34502694657811a2c8e"
        );
    }
}
