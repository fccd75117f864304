//! Construction step functions
//!
//! One pure function per construction step. State the steps need (chain
//! tip, protocol parameters) comes in as arguments, so the whole flow can
//! run against any data source and is trivially testable.

use crate::build::build_unsigned_transaction;
use crate::fees::{implied_fee, minimum_fee, updated_tx_size};
use crate::size::estimate_transaction_size;
use crate::translate::translate_operations;
use crate::witness::{SignatureEntry, assemble_witness_set};
use tekton_codec::{
    TransactionExtraData, decode_envelope, decode_signed_transaction, encode_envelope,
    encode_signed_transaction,
};
use tekton_common::address::{
    base_address, enterprise_address, reward_address, validate_public_key,
};
use tekton_common::crypto::hash_256;
use tekton_common::operations::{Operation, PublicKey};
use tekton_common::protocol::{DEFAULT_RELATIVE_TTL, DepositParameters, ProtocolParameters};
use tekton_common::{ConstructionError, NetworkId};
use tracing::{debug, info};

pub const SIGNATURE_TYPE_ED25519: &str = "ed25519";

/// Which address form `derive` produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    Base,
    Reward,
    Enterprise,
}

impl AddressType {
    pub fn from_name(name: &str) -> Result<Self, ConstructionError> {
        match name.to_ascii_lowercase().as_str() {
            "base" => Ok(Self::Base),
            "reward" => Ok(Self::Reward),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(ConstructionError::InvalidAddressType(name.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessResponse {
    pub relative_ttl: u64,
    pub transaction_size: u64,
}

/// Estimate the transaction size for the fee suggestion in `metadata`.
/// The size is taken at TTL 0; `metadata` adjusts for the real TTL.
pub fn preprocess(
    network: NetworkId,
    operations: &[Operation],
    relative_ttl: Option<u64>,
    deposits: &DepositParameters,
) -> Result<PreprocessResponse, ConstructionError> {
    let relative_ttl = relative_ttl.unwrap_or(DEFAULT_RELATIVE_TTL);
    let transaction_size = estimate_transaction_size(network, operations, deposits)?;
    info!(relative_ttl, transaction_size, "preprocessed transaction");
    Ok(PreprocessResponse {
        relative_ttl,
        transaction_size,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataResponse {
    /// Absolute slot the transaction stays valid until
    pub ttl: u64,
    pub suggested_fee: u64,
}

/// Resolve the relative TTL against the chain tip and suggest a fee for
/// the size estimated in `preprocess`
pub fn metadata(
    relative_ttl: u64,
    transaction_size: u64,
    tip_slot: u64,
    params: &ProtocolParameters,
) -> MetadataResponse {
    let ttl = tip_slot + relative_ttl;
    let size = updated_tx_size(transaction_size, 0, ttl);
    let suggested_fee = minimum_fee(size, params);
    debug!(ttl, size, suggested_fee, "resolved construction metadata");
    MetadataResponse { ttl, suggested_fee }
}

/// What one signer has to sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningPayload {
    pub address: String,

    /// Blake2b-256 body hash as hex
    pub hex_bytes: String,
    pub signature_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadsResponse {
    /// Unsigned transaction envelope as hex
    pub unsigned_transaction: String,
    pub payloads: Vec<SigningPayload>,
}

/// Build the unsigned transaction and the signing payload for each
/// required signer
pub fn payloads(
    network: NetworkId,
    operations: &[Operation],
    ttl: u64,
    deposits: &DepositParameters,
) -> Result<PayloadsResponse, ConstructionError> {
    let translated = translate_operations(network, operations)?;
    let fee = implied_fee(&translated, deposits)?;
    let unsigned = build_unsigned_transaction(&translated, ttl, fee)?;

    let envelope = encode_envelope(
        &unsigned.body_hex,
        &TransactionExtraData {
            operations: operations.to_vec(),
            transaction_metadata_hex: unsigned.auxiliary_data_hex.clone(),
        },
    )
    .map_err(|e| ConstructionError::CantEncodeExtraData(e.to_string()))?;

    let payloads = unsigned
        .addresses
        .iter()
        .map(|address| SigningPayload {
            address: address.clone(),
            hex_bytes: unsigned.hash.clone(),
            signature_type: SIGNATURE_TYPE_ED25519,
        })
        .collect();

    info!(ttl, fee, signers = unsigned.addresses.len(), "built unsigned transaction");
    Ok(PayloadsResponse {
        unsigned_transaction: envelope,
        payloads,
    })
}

/// Attach signatures to an unsigned envelope, producing the signed envelope
pub fn combine(
    unsigned_envelope_hex: &str,
    signatures: &[SignatureEntry],
) -> Result<String, ConstructionError> {
    let (body_hex, extra) = decode_envelope(unsigned_envelope_hex)
        .map_err(|e| ConstructionError::deserialization(e.to_string()))?;
    let body_bytes =
        hex::decode(&body_hex).map_err(|e| ConstructionError::deserialization(e.to_string()))?;

    let witness_set = assemble_witness_set(signatures)?;

    let aux_bytes = match &extra.transaction_metadata_hex {
        Some(aux_hex) => Some(
            hex::decode(aux_hex)
                .map_err(|e| ConstructionError::deserialization(e.to_string()))?,
        ),
        None => None,
    };

    let signed = encode_signed_transaction(&body_bytes, &witness_set, aux_bytes.as_deref())
        .map_err(|e| ConstructionError::CantCreateSignedTransaction(e.to_string()))?;

    info!(witnesses = signatures.len(), "combined signed transaction");
    encode_envelope(&hex::encode(&signed), &extra)
        .map_err(|e| ConstructionError::CantEncodeExtraData(e.to_string()))
}

/// Hash of a signed transaction - Blake2b-256 over the raw body bytes, so
/// it matches the hash the signatures were made over
pub fn transaction_hash(signed_envelope_hex: &str) -> Result<String, ConstructionError> {
    let (inner_hex, _) = decode_envelope(signed_envelope_hex)
        .map_err(|e| ConstructionError::deserialization(e.to_string()))?;
    let inner =
        hex::decode(&inner_hex).map_err(|e| ConstructionError::deserialization(e.to_string()))?;
    let tx = decode_signed_transaction(&inner)
        .map_err(|e| ConstructionError::ParseSignedTransactionError(e.to_string()))?;
    Ok(hex::encode(hash_256(&tx.body_bytes)))
}

/// Derive an address from a public key. The default form is enterprise;
/// base addresses need a staking key, and reward addresses fall back to
/// the spending key when no staking key is given.
pub fn derive(
    network: NetworkId,
    public_key: &PublicKey,
    staking_credential: Option<&PublicKey>,
    address_type: Option<AddressType>,
) -> Result<String, ConstructionError> {
    let payment_key = validate_public_key(&public_key.hex_bytes)?;

    match address_type.unwrap_or(AddressType::Enterprise) {
        AddressType::Base => {
            let staking = staking_credential.ok_or(ConstructionError::StakingKeyMissing)?;
            let staking_key = validate_public_key(&staking.hex_bytes)
                .map_err(|e| ConstructionError::InvalidStakingKeyFormat(e.to_string()))?;
            base_address(network, &payment_key, &staking_key).to_string()
        }
        AddressType::Reward => {
            let staking_key = match staking_credential {
                Some(credential) => validate_public_key(&credential.hex_bytes)
                    .map_err(|e| ConstructionError::InvalidStakingKeyFormat(e.to_string()))?,
                None => payment_key,
            };
            reward_address(network, &staking_key).to_string()
        }
        AddressType::Enterprise => enterprise_address(network, &payment_key).to_string(),
    }
}
