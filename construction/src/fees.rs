//! Fee and size arithmetic
//!
//! The engine never enforces a minimum fee: `metadata` suggests one, and the
//! fee actually paid is whatever the operation balance implies. Callers that
//! overpay on purpose are left alone.

use crate::translate::TranslatedOperations;
use tekton_codec::cbor_uint_len;
use tekton_common::protocol::{DepositParameters, ProtocolParameters};
use tekton_common::ConstructionError;
use tracing::debug;

/// Linear minimum fee for a transaction of the given size
pub fn minimum_fee(transaction_size: u64, params: &ProtocolParameters) -> u64 {
    params.min_fee_coefficient * transaction_size + params.min_fee_constant
}

/// The fee implied by the operation balance: whatever value the inputs,
/// withdrawals and deposit refunds provide beyond the outputs and deposits
/// is the fee. Negative means the transaction doesn't balance.
pub fn implied_fee(
    translated: &TranslatedOperations,
    deposits: &DepositParameters,
) -> Result<u64, ConstructionError> {
    let inputs: i128 = translated.input_amounts.iter().sum();
    let outputs: i128 = translated.output_amounts.iter().sum();
    let withdrawals: i128 = translated.withdrawal_amounts.iter().sum();

    let refunds = translated.stake_key_deregistrations as i128 * deposits.key_deposit as i128;
    let key_deposits = translated.stake_key_registrations as i128 * deposits.key_deposit as i128;
    let pool_deposits = translated.pool_registrations as i128 * deposits.pool_deposit as i128;

    // Input and withdrawal amounts are negative by convention
    let fee = -inputs - outputs - withdrawals + refunds - key_deposits - pool_deposits;
    debug!(fee, "calculated implied fee");

    if fee < 0 {
        return Err(ConstructionError::OutputsExceedInputs);
    }
    Ok(fee as u64)
}

/// Adjust an estimated size for a different TTL. Only the TTL uint payload
/// changes, so the delta is the difference in encoded uint lengths.
pub fn updated_tx_size(previous_size: u64, previous_ttl: u64, new_ttl: u64) -> u64 {
    previous_size - cbor_uint_len(previous_ttl) + cbor_uint_len(new_ttl)
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ProtocolParameters {
        ProtocolParameters {
            min_fee_coefficient: 44,
            min_fee_constant: 155_381,
            key_deposit: 2_000_000,
            pool_deposit: 500_000_000,
        }
    }

    #[test]
    fn minimum_fee_is_linear() {
        assert_eq!(minimum_fee(300, &params()), 44 * 300 + 155_381);
    }

    #[test]
    fn implied_fee_from_balance() {
        let translated = TranslatedOperations {
            input_amounts: vec![-10_000_000],
            output_amounts: vec![9_830_000],
            ..Default::default()
        };
        let fee = implied_fee(&translated, &DepositParameters::default()).unwrap();
        assert_eq!(fee, 170_000);
    }

    #[test]
    fn withdrawals_and_refunds_add_value() {
        let translated = TranslatedOperations {
            input_amounts: vec![-10_000_000],
            output_amounts: vec![12_000_000],
            withdrawal_amounts: vec![-1_500_000],
            stake_key_deregistrations: 1,
            ..Default::default()
        };
        // 10M + 1.5M + 2M refund - 12M = 1.5M
        let fee = implied_fee(&translated, &DepositParameters::default()).unwrap();
        assert_eq!(fee, 1_500_000);
    }

    #[test]
    fn deposits_consume_value() {
        let translated = TranslatedOperations {
            input_amounts: vec![-3_000_000],
            output_amounts: vec![500_000],
            stake_key_registrations: 1,
            ..Default::default()
        };
        let fee = implied_fee(&translated, &DepositParameters::default()).unwrap();
        assert_eq!(fee, 500_000);
    }

    #[test]
    fn unbalanced_transaction_is_rejected() {
        let translated = TranslatedOperations {
            input_amounts: vec![-1_000_000],
            output_amounts: vec![2_000_000],
            ..Default::default()
        };
        let err = implied_fee(&translated, &DepositParameters::default()).unwrap_err();
        assert_eq!(err, ConstructionError::OutputsExceedInputs);
    }

    #[test]
    fn size_adjustment_tracks_uint_lengths() {
        // TTL 0 encodes in 1 byte, 43M in 5
        assert_eq!(updated_tx_size(300, 0, 43_000_000), 304);
        assert_eq!(updated_tx_size(304, 43_000_000, 0), 300);
        assert_eq!(updated_tx_size(300, 0, 10), 300);
    }
}
