//! Reverse translation - native transaction bytes back into an operation list
//!
//! The envelope carries the operation list the transaction was built from,
//! so parsing prefers those operations verbatim. When the extra data does
//! not cover a native section (a transaction built elsewhere, or a
//! truncated envelope) the operations are synthesized from the decoded
//! body instead, with whatever the wire form still carries.

use crate::signers::operation_signers;
use std::collections::BTreeSet;
use tekton_codec::{
    Certificate, DRep, PolicyAssets, PoolRelay, TransactionExtraData, decode_envelope,
    decode_signed_transaction, decode_transaction_body, decode_vote_registration,
};
use tekton_common::address::{Address, StakeAddress, StakeAddressPayload, reward_address_from_hash};
use tekton_common::operations::{
    AccountIdentifier, Amount, CoinAction, CoinChange, CoinIdentifier, Currency, CurrencyMetadata,
    DRepParams, DRepType, Operation, OperationIdentifier, OperationMetadata, OperationType,
    PoolGovernanceVoteParams, PoolMargin, PoolMetadata, PoolRegistrationParams, PublicKey, Relay,
    TokenBundleItem, VoteChoice, VoteRationale, VoteRegistrationMetadata,
};
use tekton_common::{ConstructionError, Credential, NetworkId};
use tracing::warn;

/// The operation view of a previously constructed transaction
#[derive(Debug, Clone)]
pub struct ParsedTransaction {
    pub operations: Vec<Operation>,
    pub account_identifier_signers: Vec<AccountIdentifier>,
}

/// Parse an envelope back into operations. For signed transactions the
/// expected signers are derived from the recovered operations.
pub fn parse_transaction(
    network: NetworkId,
    envelope_hex: &str,
    signed: bool,
) -> Result<ParsedTransaction, ConstructionError> {
    let (inner_hex, extra) =
        decode_envelope(envelope_hex).map_err(|e| ConstructionError::deserialization(e.to_string()))?;
    let inner =
        hex::decode(&inner_hex).map_err(|e| ConstructionError::deserialization(e.to_string()))?;

    let (body, aux_hex) = if signed {
        let tx = decode_signed_transaction(&inner)
            .map_err(|e| ConstructionError::ParseSignedTransactionError(e.to_string()))?;
        let aux_hex = extra
            .transaction_metadata_hex
            .clone()
            .or_else(|| tx.auxiliary_data.as_ref().map(hex::encode));
        (tx.body, aux_hex)
    } else {
        let body = decode_transaction_body(&inner)
            .map_err(|e| ConstructionError::InvalidTransaction(e.to_string()))?;
        (body, extra.transaction_metadata_hex.clone())
    };

    let mut operations = Vec::new();

    // Inputs
    let extra_inputs = extra_of(&extra, |t| t == OperationType::Input);
    if extra_inputs.len() >= body.inputs.len() {
        for op in extra_inputs {
            let index = operations.len() as u64;
            operations.push(reuse(op, index));
        }
    } else {
        warn!(
            native = body.inputs.len(),
            carried = extra_inputs.len(),
            "input operations missing from extra data, synthesizing from the body"
        );
        for input in &body.inputs {
            let mut op = new_parsed(operations.len() as u64, OperationType::Input);
            op.coin_change = Some(CoinChange {
                coin_identifier: CoinIdentifier {
                    identifier: format!("{}:{}", hex::encode(&input.tx_hash), input.index),
                },
                coin_action: CoinAction::Spent,
            });
            operations.push(op);
        }
    }
    let input_identifiers: Vec<OperationIdentifier> =
        operations.iter().map(|op| op.operation_identifier.clone()).collect();

    // Outputs always come from the body, which is authoritative for
    // addresses and amounts
    for output in &body.outputs {
        let address = Address::from_output_bytes(&output.address)?.to_string()?;
        let mut op = new_parsed(operations.len() as u64, OperationType::Output);
        op.related_operations =
            (!input_identifiers.is_empty()).then(|| input_identifiers.clone());
        op.account = Some(AccountIdentifier { address });
        op.amount = Some(Amount::ada(output.value.coin as i128));
        if !output.value.assets.is_empty() {
            op.metadata = Some(OperationMetadata {
                token_bundle: Some(token_bundle_params(&output.value.assets)),
                ..Default::default()
            });
        }
        operations.push(op);
    }

    // Certificates
    let extra_certs = extra_of(&extra, is_certificate_type);
    if extra_certs.len() >= body.certificates.len() {
        for op in extra_certs {
            let index = operations.len() as u64;
            operations.push(reuse(op, index));
        }
    } else {
        warn!(
            native = body.certificates.len(),
            carried = extra_certs.len(),
            "certificate operations missing from extra data, synthesizing from the body"
        );
        for certificate in &body.certificates {
            let index = operations.len() as u64;
            operations.push(certificate_operation(network, certificate, index)?);
        }
    }

    // Withdrawals
    let extra_withdrawals = extra_of(&extra, |t| t == OperationType::Withdrawal);
    if extra_withdrawals.len() >= body.withdrawals.len() {
        for op in extra_withdrawals {
            let index = operations.len() as u64;
            operations.push(reuse(op, index));
        }
    } else {
        for (account, amount) in &body.withdrawals {
            let mut op = new_parsed(operations.len() as u64, OperationType::Withdrawal);
            op.account = Some(AccountIdentifier {
                address: StakeAddress::from_binary(account)?.to_string()?,
            });
            op.amount = Some(Amount::ada(-(*amount as i128)));
            operations.push(op);
        }
    }

    // Vote registration rides in the auxiliary data
    if let Some(aux_hex) = &aux_hex {
        let extra_votes = extra_of(&extra, |t| t == OperationType::VoteRegistration);
        if let Some(op) = extra_votes.first().copied() {
            let index = operations.len() as u64;
            operations.push(reuse(op, index));
        } else {
            let bytes = hex::decode(aux_hex)
                .map_err(|e| ConstructionError::deserialization(e.to_string()))?;
            let aux = decode_vote_registration(&bytes)
                .map_err(|e| ConstructionError::deserialization(e.to_string()))?;
            let mut op = new_parsed(operations.len() as u64, OperationType::VoteRegistration);
            op.metadata = Some(OperationMetadata {
                vote_registration_metadata: Some(VoteRegistrationMetadata {
                    stake_key: PublicKey::edwards(hex::encode(&aux.stake_key)),
                    voting_key: PublicKey::edwards(hex::encode(&aux.voting_key)),
                    reward_address: StakeAddress::from_binary(&aux.reward_address)?.to_string()?,
                    voting_nonce: aux.nonce,
                    voting_signature: hex::encode(&aux.signature),
                }),
                ..Default::default()
            });
            operations.push(op);
        }
    }

    // Pool governance votes
    let extra_gov = extra_of(&extra, |t| t == OperationType::PoolGovernanceVote);
    if extra_gov.len() >= body.voting_procedures.len() {
        for op in extra_gov {
            let index = operations.len() as u64;
            operations.push(reuse(op, index));
        }
    } else {
        warn!(
            native = body.voting_procedures.len(),
            carried = extra_gov.len(),
            "governance vote operations missing from extra data, pool credentials cannot be recovered"
        );
        for vote in &body.voting_procedures {
            let mut op = new_parsed(operations.len() as u64, OperationType::PoolGovernanceVote);
            op.account = Some(AccountIdentifier {
                address: hex::encode(&vote.pool_key_hash),
            });
            op.metadata = Some(OperationMetadata {
                pool_governance_vote_params: Some(PoolGovernanceVoteParams {
                    governance_action_hash: format!(
                        "{}{:02x}",
                        hex::encode(&vote.gov_action_tx_id),
                        vote.gov_action_index
                    ),
                    pool_credential: None,
                    vote: match vote.vote {
                        0 => VoteChoice::No,
                        1 => VoteChoice::Yes,
                        _ => VoteChoice::Abstain,
                    },
                    vote_rationale: vote.anchor.as_ref().map(|anchor| VoteRationale {
                        url: anchor.url.clone(),
                        data_hash: hex::encode(&anchor.data_hash),
                    }),
                }),
                ..Default::default()
            });
            operations.push(op);
        }
    }

    let mut signers = BTreeSet::new();
    if signed {
        for op in &operations {
            signers.extend(operation_signers(network, op)?);
        }
    }

    Ok(ParsedTransaction {
        operations,
        account_identifier_signers: signers
            .into_iter()
            .map(|address| AccountIdentifier { address })
            .collect(),
    })
}

const fn is_certificate_type(t: OperationType) -> bool {
    matches!(
        t,
        OperationType::StakeKeyRegistration
            | OperationType::StakeKeyDeregistration
            | OperationType::StakeDelegation
            | OperationType::PoolRegistration
            | OperationType::PoolRegistrationWithCert
            | OperationType::PoolRetirement
            | OperationType::DRepVoteDelegation
    )
}

fn extra_of(
    extra: &TransactionExtraData,
    pred: impl Fn(OperationType) -> bool,
) -> Vec<&Operation> {
    extra.operations.iter().filter(|op| pred(op.operation_type)).collect()
}

/// A carried operation with its index rewritten to the parse order
fn reuse(op: &Operation, index: u64) -> Operation {
    let mut op = op.clone();
    op.operation_identifier = OperationIdentifier::new(index);
    op.status = Some(String::new());
    op
}

fn new_parsed(index: u64, operation_type: OperationType) -> Operation {
    let mut op = Operation::new(index, operation_type);
    op.status = Some(String::new());
    op
}

fn token_bundle_params(assets: &[PolicyAssets]) -> Vec<TokenBundleItem> {
    assets
        .iter()
        .map(|policy| {
            let policy_id = hex::encode(&policy.policy_id);
            TokenBundleItem {
                tokens: policy
                    .assets
                    .iter()
                    .map(|(name, amount)| Amount {
                        value: amount.to_string(),
                        currency: Currency {
                            symbol: hex::encode(name),
                            decimals: 0,
                            metadata: Some(CurrencyMetadata {
                                policy_id: policy_id.clone(),
                            }),
                        },
                    })
                    .collect(),
                policy_id,
            }
        })
        .collect()
}

fn credential_stake_address(
    network: NetworkId,
    credential: &Credential,
) -> Result<String, ConstructionError> {
    let payload = match credential {
        Credential::AddrKeyHash(hash) => StakeAddressPayload::StakeKeyHash(hash.clone()),
        Credential::ScriptHash(hash) => StakeAddressPayload::ScriptHash(hash.clone()),
    };
    StakeAddress::new(payload, network.into()).to_string()
}

fn relay_params(relay: &PoolRelay) -> Relay {
    match relay {
        PoolRelay::SingleHostAddr { port, ipv4, ipv6 } => Relay {
            relay_type: "single_host_addr".into(),
            ipv4: ipv4.map(|ip| std::net::Ipv4Addr::from(ip).to_string()),
            ipv6: ipv6.map(|ip| std::net::Ipv6Addr::from(ip).to_string()),
            dns_name: None,
            port: *port,
        },
        PoolRelay::SingleHostName { port, dns_name } => Relay {
            relay_type: "single_host_name".into(),
            ipv4: None,
            ipv6: None,
            dns_name: Some(dns_name.clone()),
            port: *port,
        },
        PoolRelay::MultiHostName { dns_name } => Relay {
            relay_type: "multi_host_name".into(),
            ipv4: None,
            ipv6: None,
            dns_name: Some(dns_name.clone()),
            port: None,
        },
    }
}

/// Rebuild a certificate operation from its decoded form
fn certificate_operation(
    network: NetworkId,
    certificate: &Certificate,
    index: u64,
) -> Result<Operation, ConstructionError> {
    match certificate {
        Certificate::StakeRegistration(credential) => {
            let mut op = new_parsed(index, OperationType::StakeKeyRegistration);
            op.account = Some(AccountIdentifier {
                address: credential_stake_address(network, credential)?,
            });
            Ok(op)
        }
        Certificate::StakeDeregistration(credential) => {
            let mut op = new_parsed(index, OperationType::StakeKeyDeregistration);
            op.account = Some(AccountIdentifier {
                address: credential_stake_address(network, credential)?,
            });
            Ok(op)
        }
        Certificate::StakeDelegation {
            credential,
            pool_key_hash,
        } => {
            let mut op = new_parsed(index, OperationType::StakeDelegation);
            op.account = Some(AccountIdentifier {
                address: credential_stake_address(network, credential)?,
            });
            op.metadata = Some(OperationMetadata {
                pool_key_hash: Some(hex::encode(pool_key_hash)),
                ..Default::default()
            });
            Ok(op)
        }
        Certificate::PoolRegistration(pool) => {
            let mut owners = Vec::with_capacity(pool.owners.len());
            for owner in &pool.owners {
                owners.push(reward_address_from_hash(network, owner.clone()).to_string()?);
            }
            let mut op = new_parsed(index, OperationType::PoolRegistration);
            op.account = Some(AccountIdentifier {
                address: hex::encode(&pool.operator),
            });
            op.metadata = Some(OperationMetadata {
                pool_registration_params: Some(PoolRegistrationParams {
                    vrf_key_hash: hex::encode(&pool.vrf_key_hash),
                    reward_address: StakeAddress::from_binary(&pool.reward_account)?.to_string()?,
                    pledge: pool.pledge.to_string(),
                    cost: pool.cost.to_string(),
                    pool_owners: owners,
                    relays: pool.relays.iter().map(relay_params).collect(),
                    margin: Some(PoolMargin {
                        numerator: pool.margin.numerator.to_string(),
                        denominator: pool.margin.denominator.to_string(),
                    }),
                    margin_percentage: None,
                    pool_metadata: pool.metadata.as_ref().map(|metadata| PoolMetadata {
                        url: metadata.url.clone(),
                        hash: hex::encode(&metadata.hash),
                    }),
                }),
                ..Default::default()
            });
            Ok(op)
        }
        Certificate::PoolRetirement {
            pool_key_hash,
            epoch,
        } => {
            let mut op = new_parsed(index, OperationType::PoolRetirement);
            op.account = Some(AccountIdentifier {
                address: hex::encode(pool_key_hash),
            });
            op.metadata = Some(OperationMetadata {
                epoch: Some(*epoch),
                ..Default::default()
            });
            Ok(op)
        }
        Certificate::VoteDelegation { credential, drep } => {
            let mut op = new_parsed(index, OperationType::DRepVoteDelegation);
            op.account = Some(AccountIdentifier {
                address: credential_stake_address(network, credential)?,
            });
            let drep = match drep {
                DRep::KeyHash(hash) => DRepParams {
                    id: Some(hex::encode(hash)),
                    drep_type: DRepType::KeyHash,
                },
                DRep::ScriptHash(hash) => DRepParams {
                    id: Some(hex::encode(hash)),
                    drep_type: DRepType::ScriptHash,
                },
                DRep::Abstain => DRepParams {
                    id: None,
                    drep_type: DRepType::Abstain,
                },
                DRep::NoConfidence => DRepParams {
                    id: None,
                    drep_type: DRepType::NoConfidence,
                },
            };
            op.metadata = Some(OperationMetadata {
                drep: Some(drep),
                ..Default::default()
            });
            Ok(op)
        }
    }
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_unsigned_transaction;
    use crate::fees::implied_fee;
    use crate::translate::translate_operations;
    use crate::witness::{assemble_witness_set, dummy_signatures};
    use tekton_codec::{
        TransactionBody, TransactionInput, TransactionOutput, Value, encode_envelope,
        encode_signed_transaction, encode_transaction_body,
    };
    use tekton_common::protocol::DepositParameters;

    const PAYMENT_ADDR: &str = "addr1vx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzers66hrl8";

    fn transfer_ops() -> Vec<Operation> {
        let mut input = Operation::new(0, OperationType::Input);
        input.account = Some(AccountIdentifier {
            address: PAYMENT_ADDR.into(),
        });
        input.amount = Some(Amount::ada(-10_000_000));
        input.coin_change = Some(CoinChange {
            coin_identifier: CoinIdentifier {
                identifier: format!("{}:0", "2f".repeat(32)),
            },
            coin_action: CoinAction::Spent,
        });

        let mut output = Operation::new(1, OperationType::Output);
        output.account = Some(AccountIdentifier {
            address: PAYMENT_ADDR.into(),
        });
        output.amount = Some(Amount::ada(9_830_000));

        vec![input, output]
    }

    fn unsigned_envelope(ops: &[Operation]) -> String {
        let translated = translate_operations(NetworkId::Mainnet, ops).unwrap();
        let fee = implied_fee(&translated, &DepositParameters::default()).unwrap();
        let unsigned = build_unsigned_transaction(&translated, 1000, fee).unwrap();
        encode_envelope(
            &unsigned.body_hex,
            &TransactionExtraData {
                operations: ops.to_vec(),
                transaction_metadata_hex: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn unsigned_round_trip_keeps_operations() {
        let ops = transfer_ops();
        let parsed =
            parse_transaction(NetworkId::Mainnet, &unsigned_envelope(&ops), false).unwrap();

        assert_eq!(parsed.operations.len(), 2);
        assert_eq!(parsed.operations[0].operation_type, OperationType::Input);
        assert_eq!(parsed.operations[0].address(), Some(PAYMENT_ADDR));
        assert_eq!(
            parsed.operations[0].amount.as_ref().unwrap().value,
            "-10000000"
        );
        assert_eq!(parsed.operations[1].operation_type, OperationType::Output);
        // Unsigned transactions have no signers
        assert!(parsed.account_identifier_signers.is_empty());
    }

    #[test]
    fn signed_transactions_report_signers() {
        let ops = transfer_ops();
        let translated = translate_operations(NetworkId::Mainnet, &ops).unwrap();
        let fee = implied_fee(&translated, &DepositParameters::default()).unwrap();
        let unsigned = build_unsigned_transaction(&translated, 1000, fee).unwrap();

        let signatures = dummy_signatures(&unsigned.addresses).unwrap();
        let witness_set = assemble_witness_set(&signatures).unwrap();
        let signed = encode_signed_transaction(
            &hex::decode(&unsigned.body_hex).unwrap(),
            &witness_set,
            None,
        )
        .unwrap();
        let envelope = encode_envelope(
            &hex::encode(&signed),
            &TransactionExtraData {
                operations: ops,
                transaction_metadata_hex: None,
            },
        )
        .unwrap();

        let parsed = parse_transaction(NetworkId::Mainnet, &envelope, true).unwrap();
        assert_eq!(parsed.account_identifier_signers.len(), 1);
        assert_eq!(parsed.account_identifier_signers[0].address, PAYMENT_ADDR);
    }

    #[test]
    fn missing_operations_are_synthesized_from_the_body() {
        let body = TransactionBody {
            inputs: vec![TransactionInput {
                tx_hash: vec![0x2f; 32],
                index: 3,
            }],
            outputs: vec![TransactionOutput {
                // Mainnet enterprise header byte plus a key hash
                address: vec![0x61; 29],
                value: Value::coin_only(9_830_000),
            }],
            fee: 170_000,
            ttl: 1000,
            ..Default::default()
        };
        let body_hex = hex::encode(encode_transaction_body(&body).unwrap());
        let envelope =
            encode_envelope(&body_hex, &TransactionExtraData::default()).unwrap();

        let parsed = parse_transaction(NetworkId::Mainnet, &envelope, false).unwrap();
        assert_eq!(parsed.operations.len(), 2);

        let input = &parsed.operations[0];
        assert_eq!(input.operation_type, OperationType::Input);
        // Only the outpoint survives without extra data
        assert!(input.account.is_none());
        assert_eq!(
            input.coin_change.as_ref().unwrap().coin_identifier.identifier,
            format!("{}:3", "2f".repeat(32))
        );

        let output = &parsed.operations[1];
        assert_eq!(output.operation_type, OperationType::Output);
        assert_eq!(output.amount.as_ref().unwrap().value, "9830000");
        assert_eq!(
            output.related_operations.as_ref().unwrap(),
            &vec![OperationIdentifier::new(0)]
        );
    }

    #[test]
    fn certificates_synthesize_with_reward_addresses() {
        let body = TransactionBody {
            inputs: vec![TransactionInput {
                tx_hash: vec![0x2f; 32],
                index: 0,
            }],
            fee: 170_000,
            ttl: 1000,
            certificates: vec![
                Certificate::StakeRegistration(Credential::AddrKeyHash(vec![0x11; 28])),
                Certificate::StakeDelegation {
                    credential: Credential::AddrKeyHash(vec![0x11; 28]),
                    pool_key_hash: vec![0x22; 28],
                },
            ],
            ..Default::default()
        };
        let body_hex = hex::encode(encode_transaction_body(&body).unwrap());
        let envelope =
            encode_envelope(&body_hex, &TransactionExtraData::default()).unwrap();

        let parsed = parse_transaction(NetworkId::Mainnet, &envelope, false).unwrap();
        let registration = &parsed.operations[1];
        assert_eq!(
            registration.operation_type,
            OperationType::StakeKeyRegistration
        );
        assert!(registration.address().unwrap().starts_with("stake1"));

        let delegation = &parsed.operations[2];
        assert_eq!(delegation.operation_type, OperationType::StakeDelegation);
        assert_eq!(
            delegation
                .metadata
                .as_ref()
                .unwrap()
                .pool_key_hash
                .as_deref(),
            Some("22".repeat(28).as_str())
        );
    }

    #[test]
    fn withdrawals_synthesize_with_negative_amounts() {
        let body = TransactionBody {
            fee: 170_000,
            ttl: 1000,
            withdrawals: vec![(
                hex::decode("e1558f3ee09b26d88fac2eddc772a9eda94cce6dbadbe9fee439bd6001")
                    .unwrap(),
                1_500_000,
            )],
            ..Default::default()
        };
        let body_hex = hex::encode(encode_transaction_body(&body).unwrap());
        let envelope =
            encode_envelope(&body_hex, &TransactionExtraData::default()).unwrap();

        let parsed = parse_transaction(NetworkId::Mainnet, &envelope, false).unwrap();
        let withdrawal = &parsed.operations[0];
        assert_eq!(withdrawal.operation_type, OperationType::Withdrawal);
        assert!(withdrawal.address().unwrap().starts_with("stake1"));
        assert_eq!(withdrawal.amount.as_ref().unwrap().value, "-1500000");
    }

    #[test]
    fn garbage_envelopes_are_rejected() {
        let err = parse_transaction(NetworkId::Mainnet, "zz", false).unwrap_err();
        assert_eq!(err.code(), 5018);

        // Valid envelope around bytes that are not a transaction body
        let envelope = encode_envelope("00", &TransactionExtraData::default()).unwrap();
        let err = parse_transaction(NetworkId::Mainnet, &envelope, false).unwrap_err();
        assert_eq!(err.code(), 5019);

        let err = parse_transaction(NetworkId::Mainnet, &envelope, true).unwrap_err();
        assert_eq!(err.code(), 5003);
    }
}
