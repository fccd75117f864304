//! Unsigned transaction assembly

use crate::translate::TranslatedOperations;
use std::collections::BTreeSet;
use tekton_codec::{TransactionBody, encode_transaction_body};
use tekton_common::crypto::hash_256;
use tekton_common::ConstructionError;

/// An assembled unsigned transaction
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    /// Signing hash - Blake2b-256 over the body bytes
    pub hash: String,

    /// Canonical body bytes as hex
    pub body_hex: String,

    /// Addresses expected to witness the transaction, sorted
    pub addresses: BTreeSet<String>,

    /// Encoded auxiliary data, when the operations carried any
    pub auxiliary_data_hex: Option<String>,
}

/// Assemble the body from translated fragments, a TTL and a fee
pub fn build_unsigned_transaction(
    translated: &TranslatedOperations,
    ttl: u64,
    fee: u64,
) -> Result<UnsignedTransaction, ConstructionError> {
    let body = TransactionBody {
        inputs: translated.inputs.clone(),
        outputs: translated.outputs.clone(),
        fee,
        ttl,
        certificates: translated.certificates.clone(),
        withdrawals: translated.withdrawals.clone(),
        auxiliary_data_hash: translated.vote_registration_aux.as_deref().map(hash_256),
        voting_procedures: translated.votes.clone(),
    };

    let bytes = encode_transaction_body(&body)
        .map_err(|e| ConstructionError::CantCreateUnsignedTransaction(e.to_string()))?;

    Ok(UnsignedTransaction {
        hash: hex::encode(hash_256(&bytes)),
        body_hex: hex::encode(&bytes),
        addresses: translated.addresses.clone(),
        auxiliary_data_hex: translated.vote_registration_aux.as_ref().map(hex::encode),
    })
}
