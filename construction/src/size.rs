//! Transaction size estimation
//!
//! Builds the transaction at TTL 0 with zero-filled signatures shaped per
//! address era, then measures the fully-serialized signed form. The caller
//! adjusts for the real TTL with `updated_tx_size`.

use crate::build::build_unsigned_transaction;
use crate::fees::implied_fee;
use crate::translate::translate_operations;
use crate::witness::{assemble_witness_set, dummy_signatures};
use tekton_codec::encode_signed_transaction;
use tekton_common::operations::Operation;
use tekton_common::protocol::DepositParameters;
use tekton_common::{ConstructionError, NetworkId};
use tracing::debug;

/// Estimated byte size of the signed transaction the operations describe
pub fn estimate_transaction_size(
    network: NetworkId,
    operations: &[Operation],
    deposits: &DepositParameters,
) -> Result<u64, ConstructionError> {
    let translated = translate_operations(network, operations)?;
    let fee = implied_fee(&translated, deposits)?;
    let unsigned = build_unsigned_transaction(&translated, 0, fee)?;

    let signatures = dummy_signatures(&unsigned.addresses)?;
    let witness_set = assemble_witness_set(&signatures)?;

    let body_bytes = hex::decode(&unsigned.body_hex)
        .map_err(|e| ConstructionError::UnspecifiedError(e.to_string()))?;
    let aux_bytes = match &unsigned.auxiliary_data_hex {
        Some(aux_hex) => Some(
            hex::decode(aux_hex)
                .map_err(|e| ConstructionError::UnspecifiedError(e.to_string()))?,
        ),
        None => None,
    };

    let signed = encode_signed_transaction(&body_bytes, &witness_set, aux_bytes.as_deref())
        .map_err(|e| ConstructionError::CantCreateSignedTransaction(e.to_string()))?;

    debug!(size = signed.len(), signers = signatures.len(), "estimated transaction size");
    Ok(signed.len() as u64)
}
