//! Witness assembly - classify each signature by its address era and build
//! the witness set

use tekton_codec::{BootstrapWitness, VKeyWitness, WitnessSet};
use tekton_common::address::Address;
use tekton_common::ConstructionError;

const DUMMY_SIGNATURE_LEN: usize = 64;
const DUMMY_KEY_LEN: usize = 32;
const DUMMY_CHAIN_CODE_LEN: usize = 32;

/// One signature as supplied to combine, or synthesized for estimation
#[derive(Debug, Clone)]
pub struct SignatureEntry {
    /// The address the signature answers for - decides the witness kind
    pub address: String,
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,

    /// Required for Byron addresses
    pub chain_code: Option<Vec<u8>>,
}

/// Build the witness set. Byron addresses become bootstrap witnesses and
/// must carry a chain code; everything else becomes a vkey witness.
pub fn assemble_witness_set(
    signatures: &[SignatureEntry],
) -> Result<WitnessSet, ConstructionError> {
    let mut set = WitnessSet::default();
    for entry in signatures {
        match Address::from_string(&entry.address)? {
            Address::Byron(byron) => {
                let chain_code =
                    entry.chain_code.clone().ok_or(ConstructionError::ChainCodeMissing)?;
                set.bootstrap_witnesses.push(BootstrapWitness {
                    vkey: entry.public_key.clone(),
                    signature: entry.signature.clone(),
                    chain_code,
                    attributes: byron.attributes()?,
                });
            }
            _ => set.vkey_witnesses.push(VKeyWitness {
                vkey: entry.public_key.clone(),
                signature: entry.signature.clone(),
            }),
        }
    }
    Ok(set)
}

/// Zero-filled signatures for size estimation, one per signer address
pub fn dummy_signatures<'a>(
    addresses: impl IntoIterator<Item = &'a String>,
) -> Result<Vec<SignatureEntry>, ConstructionError> {
    addresses
        .into_iter()
        .map(|address| {
            let chain_code = match Address::from_string(address)? {
                Address::Byron(_) => Some(vec![0u8; DUMMY_CHAIN_CODE_LEN]),
                _ => None,
            };
            Ok(SignatureEntry {
                address: address.clone(),
                public_key: vec![0u8; DUMMY_KEY_LEN],
                signature: vec![0u8; DUMMY_SIGNATURE_LEN],
                chain_code,
            })
        })
        .collect()
}
