//! Operation translation - the generic operation list folded into native
//! transaction fragments plus the bookkeeping the fee calculator and the
//! signer derivation need.

use std::collections::BTreeSet;
use tekton_codec::{
    Certificate, DRep, PolicyAssets, PoolMetadataRef, PoolRegistration, PoolRelay,
    TransactionInput, TransactionOutput, UnitInterval, Value, VoteAnchor, VoteRegistrationAuxData,
    VotingProcedure, encode_vote_registration,
};
use tekton_common::address::{
    Address, StakeAddress, decode_pool_id, reward_address_from_hash, validate_public_key,
};
use tekton_common::operations::{
    DRepType, Operation, OperationType, PoolRegistrationParams, Relay, TokenBundleItem,
    VoteChoice,
};
use tekton_common::{ConstructionError, Credential, KeyHash, NetworkId};
use tracing::debug;

/// Native transaction fragments produced from an operation list
#[derive(Debug, Clone, Default)]
pub struct TranslatedOperations {
    pub inputs: Vec<TransactionInput>,
    pub input_amounts: Vec<i128>,
    pub outputs: Vec<TransactionOutput>,
    pub output_amounts: Vec<i128>,
    pub certificates: Vec<Certificate>,
    pub withdrawals: Vec<(Vec<u8>, u64)>,
    pub withdrawal_amounts: Vec<i128>,
    pub votes: Vec<VotingProcedure>,

    /// Encoded Catalyst auxiliary data, when a vote registration is present
    pub vote_registration_aux: Option<Vec<u8>>,

    /// Unique addresses that must witness the transaction
    pub addresses: BTreeSet<String>,

    pub stake_key_registrations: u64,
    pub stake_key_deregistrations: u64,
    pub pool_registrations: u64,
}

/// Fold an operation list into native fragments, validating each operation
/// against its type's requirements. Certificates keep encounter order.
pub fn translate_operations(
    network: NetworkId,
    operations: &[Operation],
) -> Result<TranslatedOperations, ConstructionError> {
    let mut acc = TranslatedOperations::default();

    for operation in operations {
        match operation.operation_type {
            OperationType::Input => translate_input(operation, &mut acc)?,
            OperationType::Output => translate_output(operation, &mut acc)?,
            OperationType::StakeKeyRegistration => {
                let credential = staking_credential(operation)?;
                acc.certificates.push(Certificate::StakeRegistration(credential));
                acc.stake_key_registrations += 1;
            }
            OperationType::StakeKeyDeregistration => {
                let credential = staking_credential(operation)?;
                acc.addresses.insert(credential_reward_address(network, &credential)?);
                acc.certificates.push(Certificate::StakeDeregistration(credential));
                acc.stake_key_deregistrations += 1;
            }
            OperationType::StakeDelegation => {
                let credential = staking_credential(operation)?;
                let pool_key_hash = required_pool_key(operation)?;
                acc.addresses.insert(credential_reward_address(network, &credential)?);
                acc.certificates.push(Certificate::StakeDelegation {
                    credential,
                    pool_key_hash,
                });
            }
            OperationType::Withdrawal => translate_withdrawal(network, operation, &mut acc)?,
            OperationType::PoolRegistration => translate_pool_registration(operation, &mut acc)?,
            OperationType::PoolRegistrationWithCert => {
                translate_pool_registration_cert(network, operation, &mut acc)?
            }
            OperationType::PoolRetirement => translate_pool_retirement(operation, &mut acc)?,
            OperationType::VoteRegistration => translate_vote_registration(operation, &mut acc)?,
            OperationType::DRepVoteDelegation => {
                translate_drep_delegation(network, operation, &mut acc)?
            }
            OperationType::PoolGovernanceVote => {
                translate_pool_governance_vote(operation, &mut acc)?
            }
        }
    }

    debug!(
        inputs = acc.inputs.len(),
        outputs = acc.outputs.len(),
        certificates = acc.certificates.len(),
        withdrawals = acc.withdrawals.len(),
        signers = acc.addresses.len(),
        "translated operations"
    );
    Ok(acc)
}

fn required_address(operation: &Operation) -> Result<&str, ConstructionError> {
    operation.address().ok_or_else(|| {
        ConstructionError::invalid_operation_data(format!(
            "operation {} has no account address",
            operation.operation_identifier.index
        ))
    })
}

fn required_amount(operation: &Operation) -> Result<i128, ConstructionError> {
    let amount = operation.amount.as_ref().ok_or_else(|| {
        ConstructionError::invalid_operation_data(format!(
            "operation {} has no amount",
            operation.operation_identifier.index
        ))
    })?;
    amount.value.parse::<i128>().map_err(|e| {
        ConstructionError::invalid_operation_data(format!(
            "unparseable amount {}: {e}",
            amount.value
        ))
    })
}

/// Pull the staking credential out of operation metadata and reduce it to
/// a key-hash credential
fn staking_credential(operation: &Operation) -> Result<Credential, ConstructionError> {
    let credential = operation
        .metadata
        .as_ref()
        .and_then(|m| m.staking_credential.as_ref())
        .ok_or(ConstructionError::StakingKeyMissing)?;
    let key = validate_public_key(&credential.hex_bytes)
        .map_err(|e| ConstructionError::InvalidStakingKeyFormat(e.to_string()))?;
    Ok(Credential::AddrKeyHash(tekton_common::crypto::keyhash_224(
        &key,
    )))
}

fn credential_reward_address(
    network: NetworkId,
    credential: &Credential,
) -> Result<String, ConstructionError> {
    reward_address_from_hash(network, credential.get_hash().to_vec()).to_string()
}

fn required_pool_key(operation: &Operation) -> Result<KeyHash, ConstructionError> {
    let pool_key = operation
        .metadata
        .as_ref()
        .and_then(|m| m.pool_key_hash.as_deref())
        .ok_or(ConstructionError::PoolKeyMissing)?;
    decode_pool_id(pool_key)
}

fn translate_input(
    operation: &Operation,
    acc: &mut TranslatedOperations,
) -> Result<(), ConstructionError> {
    let address = required_address(operation)?;
    let coin_change = operation.coin_change.as_ref().ok_or_else(|| {
        ConstructionError::invalid_operation_data(format!(
            "input operation {} has no coin_change",
            operation.operation_identifier.index
        ))
    })?;

    let identifier = &coin_change.coin_identifier.identifier;
    let (tx_hex, index) = identifier.split_once(':').ok_or_else(|| {
        ConstructionError::invalid_operation_data(format!("malformed coin identifier {identifier}"))
    })?;
    let tx_hash = hex::decode(tx_hex).map_err(|e| {
        ConstructionError::invalid_operation_data(format!("bad coin tx id {tx_hex}: {e}"))
    })?;
    if tx_hash.len() != 32 {
        return Err(ConstructionError::invalid_operation_data(format!(
            "coin tx id must be 32 bytes, got {}",
            tx_hash.len()
        )));
    }
    let index = index.parse::<u64>().map_err(|e| {
        ConstructionError::invalid_operation_data(format!("bad coin index {index}: {e}"))
    })?;

    let amount = required_amount(operation)?;
    if amount >= 0 {
        return Err(ConstructionError::invalid_operation_data(format!(
            "input amount must be negative, got {amount}"
        )));
    }

    acc.addresses.insert(address.to_string());
    acc.inputs.push(TransactionInput { tx_hash, index });
    acc.input_amounts.push(amount);
    Ok(())
}

fn translate_output(
    operation: &Operation,
    acc: &mut TranslatedOperations,
) -> Result<(), ConstructionError> {
    let address = Address::from_string(required_address(operation)?)?;
    let amount = required_amount(operation)?;
    if amount <= 0 {
        return Err(ConstructionError::invalid_operation_data(format!(
            "output amount must be positive, got {amount}"
        )));
    }
    let coin = u64::try_from(amount)
        .map_err(|e| ConstructionError::invalid_operation_data(e.to_string()))?;

    let assets = match operation.metadata.as_ref().and_then(|m| m.token_bundle.as_ref()) {
        Some(bundle) => translate_token_bundle(bundle)?,
        None => Vec::new(),
    };

    acc.outputs.push(TransactionOutput {
        address: address.to_bytes(),
        value: Value { coin, assets },
    });
    acc.output_amounts.push(amount);
    Ok(())
}

fn translate_token_bundle(
    bundle: &[TokenBundleItem],
) -> Result<Vec<PolicyAssets>, ConstructionError> {
    let mut policies = Vec::with_capacity(bundle.len());
    for item in bundle {
        let policy_id = hex::decode(&item.policy_id)
            .map_err(|e| ConstructionError::InvalidPolicyId(format!("{}: {e}", item.policy_id)))?;
        if policy_id.len() != 28 {
            return Err(ConstructionError::InvalidPolicyId(item.policy_id.clone()));
        }
        if item.tokens.is_empty() {
            return Err(ConstructionError::TokenBundleAssetsMissing);
        }

        let mut assets = Vec::with_capacity(item.tokens.len());
        for token in &item.tokens {
            let name = hex::decode(&token.currency.symbol).map_err(|_| {
                ConstructionError::InvalidTokenName(token.currency.symbol.clone())
            })?;
            if name.len() > 32 {
                return Err(ConstructionError::InvalidTokenName(
                    token.currency.symbol.clone(),
                ));
            }
            let amount = token.value.parse::<u64>().map_err(|_| {
                ConstructionError::TokenAssetValueMissing(token.currency.symbol.clone())
            })?;
            assets.push((name, amount));
        }
        policies.push(PolicyAssets { policy_id, assets });
    }
    Ok(policies)
}

fn translate_withdrawal(
    network: NetworkId,
    operation: &Operation,
    acc: &mut TranslatedOperations,
) -> Result<(), ConstructionError> {
    let credential = staking_credential(operation)?;
    let amount = required_amount(operation)?;
    if amount > 0 {
        return Err(ConstructionError::invalid_operation_data(format!(
            "withdrawal amount must be negative, got {amount}"
        )));
    }

    let stake = reward_address_from_hash(network, credential.get_hash().to_vec());
    acc.addresses.insert(stake.to_string()?);
    acc.withdrawals.push((stake.to_binary(), amount.unsigned_abs() as u64));
    acc.withdrawal_amounts.push(amount);
    Ok(())
}

fn parse_pool_int(value: &str, what: &str) -> Result<u64, ConstructionError> {
    value.parse::<u64>().map_err(|e| {
        ConstructionError::InvalidPoolRegistrationParams(format!("{what} {value}: {e}"))
    })
}

/// Margin given as a decimal percentage string, scaled to a rational
fn margin_from_percentage(percentage: &str) -> Result<UnitInterval, ConstructionError> {
    let invalid = |detail: &str| {
        ConstructionError::InvalidPoolRegistrationParams(format!(
            "margin_percentage {percentage}: {detail}"
        ))
    };

    let (integral, fraction) = percentage.split_once('.').unwrap_or((percentage, ""));
    if fraction.len() > 19 {
        return Err(invalid("too many decimal places"));
    }
    let denominator = 10u64
        .checked_pow(fraction.len() as u32)
        .ok_or_else(|| invalid("too many decimal places"))?;
    let integral: u64 = if integral.is_empty() {
        0
    } else {
        integral.parse().map_err(|_| invalid("not a decimal"))?
    };
    let fraction: u64 = if fraction.is_empty() {
        0
    } else {
        fraction.parse().map_err(|_| invalid("not a decimal"))?
    };
    let numerator = integral
        .checked_mul(denominator)
        .and_then(|v| v.checked_add(fraction))
        .ok_or_else(|| invalid("out of range"))?;
    Ok(UnitInterval {
        numerator,
        denominator,
    })
}

fn translate_relays(relays: &[Relay]) -> Result<Vec<PoolRelay>, ConstructionError> {
    let mut result = Vec::with_capacity(relays.len());
    for relay in relays {
        match relay.relay_type.as_str() {
            "single_host_addr" => {
                let ipv4 = match &relay.ipv4 {
                    Some(ip) => Some(
                        ip.parse::<std::net::Ipv4Addr>()
                            .map_err(|e| {
                                ConstructionError::InvalidPoolRelays(format!("{ip}: {e}"))
                            })?
                            .octets(),
                    ),
                    None => None,
                };
                let ipv6 = match &relay.ipv6 {
                    Some(ip) => Some(
                        ip.parse::<std::net::Ipv6Addr>()
                            .map_err(|e| {
                                ConstructionError::InvalidPoolRelays(format!("{ip}: {e}"))
                            })?
                            .octets(),
                    ),
                    None => None,
                };
                result.push(PoolRelay::SingleHostAddr {
                    port: relay.port,
                    ipv4,
                    ipv6,
                });
            }
            "single_host_name" => {
                let dns_name =
                    relay.dns_name.clone().ok_or(ConstructionError::DnsNameMissing)?;
                result.push(PoolRelay::SingleHostName {
                    port: relay.port,
                    dns_name,
                });
            }
            "multi_host_name" => {
                let dns_name =
                    relay.dns_name.clone().ok_or(ConstructionError::DnsNameMissing)?;
                result.push(PoolRelay::MultiHostName { dns_name });
            }
            other => {
                return Err(ConstructionError::InvalidPoolRelayType(other.to_string()));
            }
        }
    }
    Ok(result)
}

fn translate_pool_registration(
    operation: &Operation,
    acc: &mut TranslatedOperations,
) -> Result<(), ConstructionError> {
    let cold_key_address = required_address(operation)?;
    let operator = decode_pool_id(cold_key_address)?;
    let params: &PoolRegistrationParams = operation
        .metadata
        .as_ref()
        .and_then(|m| m.pool_registration_params.as_ref())
        .ok_or(ConstructionError::PoolRegistrationParamsMissing)?;

    let vrf_key_hash = hex::decode(&params.vrf_key_hash).map_err(|e| {
        ConstructionError::InvalidPoolRegistrationParams(format!(
            "vrf_key_hash {}: {e}",
            params.vrf_key_hash
        ))
    })?;
    let pledge = parse_pool_int(&params.pledge, "pledge")?;
    let cost = parse_pool_int(&params.cost, "cost")?;

    let margin = match (&params.margin, &params.margin_percentage) {
        (Some(margin), _) => UnitInterval {
            numerator: parse_pool_int(&margin.numerator, "margin numerator")?,
            denominator: parse_pool_int(&margin.denominator, "margin denominator")?,
        },
        (None, Some(percentage)) => margin_from_percentage(percentage)?,
        (None, None) => {
            return Err(ConstructionError::InvalidPoolRegistrationParams(
                "margin missing".into(),
            ))
        }
    };

    let reward = StakeAddress::from_string(&params.reward_address)?;

    let mut owners = Vec::with_capacity(params.pool_owners.len());
    for owner in &params.pool_owners {
        let stake = StakeAddress::from_string(owner)
            .map_err(|e| ConstructionError::InvalidPoolOwners(format!("{owner}: {e}")))?;
        owners.push(stake.get_hash().to_vec());
        acc.addresses.insert(owner.clone());
    }

    let relays = translate_relays(&params.relays)?;

    let metadata = match &params.pool_metadata {
        Some(metadata) => Some(PoolMetadataRef {
            url: metadata.url.clone(),
            hash: hex::decode(&metadata.hash).map_err(|e| {
                ConstructionError::InvalidPoolMetadata(format!("{}: {e}", metadata.hash))
            })?,
        }),
        None => None,
    };

    acc.addresses.insert(params.reward_address.clone());
    acc.addresses.insert(cold_key_address.to_string());
    acc.certificates.push(Certificate::PoolRegistration(PoolRegistration {
        operator,
        vrf_key_hash,
        pledge,
        cost,
        margin,
        reward_account: reward.to_binary(),
        owners,
        relays,
        metadata,
    }));
    acc.pool_registrations += 1;
    Ok(())
}

fn translate_pool_registration_cert(
    network: NetworkId,
    operation: &Operation,
    acc: &mut TranslatedOperations,
) -> Result<(), ConstructionError> {
    let cert_hex = operation
        .metadata
        .as_ref()
        .and_then(|m| m.pool_registration_cert.as_deref())
        .ok_or(ConstructionError::PoolCertMissing)?;
    let cert_bytes = hex::decode(cert_hex)
        .map_err(|e| ConstructionError::InvalidPoolCert(e.to_string()))?;
    let certificate: Certificate = minicbor::decode(&cert_bytes)
        .map_err(|e| ConstructionError::InvalidPoolCert(e.to_string()))?;

    let Certificate::PoolRegistration(pool) = &certificate else {
        return Err(ConstructionError::InvalidPoolCertType);
    };

    // Signers come out of the certificate itself
    let reward = StakeAddress::from_binary(&pool.reward_account)?;
    acc.addresses.insert(reward.to_string()?);
    for owner in &pool.owners {
        acc.addresses.insert(reward_address_from_hash(network, owner.clone()).to_string()?);
    }
    if let Some(address) = operation.address() {
        acc.addresses.insert(address.to_string());
    }

    acc.certificates.push(certificate);
    acc.pool_registrations += 1;
    Ok(())
}

fn translate_pool_retirement(
    operation: &Operation,
    acc: &mut TranslatedOperations,
) -> Result<(), ConstructionError> {
    let address = required_address(operation)?;
    let pool_key_hash = decode_pool_id(address)?;
    let epoch = operation
        .metadata
        .as_ref()
        .and_then(|m| m.epoch)
        .ok_or(ConstructionError::MissingMetadataParametersForPoolRetirement)?;

    acc.addresses.insert(address.to_string());
    acc.certificates.push(Certificate::PoolRetirement {
        pool_key_hash,
        epoch,
    });
    Ok(())
}

fn translate_vote_registration(
    operation: &Operation,
    acc: &mut TranslatedOperations,
) -> Result<(), ConstructionError> {
    // A transaction carries at most one Catalyst registration; first wins
    if acc.vote_registration_aux.is_some() {
        debug!(
            index = operation.operation_identifier.index,
            "ignoring duplicate vote registration operation"
        );
        return Ok(());
    }

    let metadata = operation
        .metadata
        .as_ref()
        .and_then(|m| m.vote_registration_metadata.as_ref())
        .ok_or(ConstructionError::MissingVoteRegistrationMetadata)?;

    let voting_key = validate_public_key(&metadata.voting_key.hex_bytes)?;
    let stake_key = validate_public_key(&metadata.stake_key.hex_bytes)
        .map_err(|e| ConstructionError::InvalidStakingKeyFormat(e.to_string()))?;

    let reward_address = Address::from_string(&metadata.reward_address)?;
    let Address::Stake(stake) = &reward_address else {
        return Err(ConstructionError::InvalidAddress(format!(
            "{} is not a reward address",
            metadata.reward_address
        )));
    };

    let signature = hex::decode(&metadata.voting_signature)
        .map_err(|e| ConstructionError::InvalidVotingSignature(e.to_string()))?;
    if signature.len() != 64 {
        return Err(ConstructionError::InvalidVotingSignature(format!(
            "expected 64 bytes, got {}",
            signature.len()
        )));
    }

    let aux = VoteRegistrationAuxData {
        voting_key,
        stake_key,
        reward_address: stake.to_binary(),
        nonce: metadata.voting_nonce,
        signature,
    };
    acc.vote_registration_aux = Some(
        encode_vote_registration(&aux)
            .map_err(|e| ConstructionError::CantEncodeExtraData(e.to_string()))?,
    );
    Ok(())
}

fn translate_drep_delegation(
    network: NetworkId,
    operation: &Operation,
    acc: &mut TranslatedOperations,
) -> Result<(), ConstructionError> {
    let credential = staking_credential(operation)?;
    let params = operation
        .metadata
        .as_ref()
        .and_then(|m| m.drep.as_ref())
        .ok_or(ConstructionError::MissingDrep)?;

    let drep = match params.drep_type {
        DRepType::Abstain => DRep::Abstain,
        DRepType::NoConfidence => DRep::NoConfidence,
        DRepType::KeyHash | DRepType::ScriptHash => {
            let id = params.id.as_deref().ok_or(ConstructionError::MissingDrep)?;
            let bytes = hex::decode(id)
                .map_err(|_| ConstructionError::InvalidDrepIdLength(id.to_string()))?;
            let hash = match bytes.len() {
                28 => bytes,
                // CIP-129 ids carry a header byte declaring the kind
                29 => {
                    let expected = match params.drep_type {
                        DRepType::KeyHash => 0x22,
                        _ => 0x23,
                    };
                    if bytes[0] != expected {
                        return Err(ConstructionError::MismatchDrepType(id.to_string()));
                    }
                    bytes[1..].to_vec()
                }
                _ => return Err(ConstructionError::InvalidDrepIdLength(id.to_string())),
            };
            match params.drep_type {
                DRepType::KeyHash => DRep::KeyHash(hash),
                _ => DRep::ScriptHash(hash),
            }
        }
    };

    acc.addresses.insert(credential_reward_address(network, &credential)?);
    acc.certificates.push(Certificate::VoteDelegation { credential, drep });
    Ok(())
}

fn translate_pool_governance_vote(
    operation: &Operation,
    acc: &mut TranslatedOperations,
) -> Result<(), ConstructionError> {
    let address = required_address(operation)?;
    let pool_key_hash = decode_pool_id(address)?;
    let params = operation
        .metadata
        .as_ref()
        .and_then(|m| m.pool_governance_vote_params.as_ref())
        .ok_or_else(|| {
            ConstructionError::InvalidGovernanceVote("vote parameters missing".into())
        })?;

    // The supplied credential must be the pool's cold key
    let pool_credential = params.pool_credential.as_ref().ok_or_else(|| {
        ConstructionError::InvalidGovernanceVote("pool credential missing".into())
    })?;
    let credential_key = validate_public_key(&pool_credential.hex_bytes)?;
    if tekton_common::crypto::keyhash_224(&credential_key) != pool_key_hash {
        return Err(ConstructionError::InvalidGovernanceVote(
            "pool credential does not match the pool key hash".into(),
        ));
    }

    let action = params.governance_action_hash.as_str();
    if action.len() != 66 {
        return Err(ConstructionError::InvalidGovernanceVote(format!(
            "governance action hash must be 66 hex chars, got {}",
            action.len()
        )));
    }
    // ASCII check first, so the slices below stay on char boundaries
    if !action.is_ascii() {
        return Err(ConstructionError::InvalidGovernanceVote(
            "governance action hash is not hex".into(),
        ));
    }
    let gov_action_tx_id = hex::decode(&action[..64])
        .map_err(|e| ConstructionError::InvalidGovernanceVote(e.to_string()))?;
    let gov_action_index = u64::from_str_radix(&action[64..], 16)
        .map_err(|e| ConstructionError::InvalidGovernanceVote(e.to_string()))?;

    let vote = match params.vote {
        VoteChoice::No => 0,
        VoteChoice::Yes => 1,
        VoteChoice::Abstain => 2,
    };

    let anchor = match &params.vote_rationale {
        Some(rationale) => Some(VoteAnchor {
            url: rationale.url.clone(),
            data_hash: hex::decode(&rationale.data_hash)
                .map_err(|e| ConstructionError::InvalidGovernanceVote(e.to_string()))?,
        }),
        None => None,
    };

    acc.addresses.insert(address.to_string());
    acc.votes.push(VotingProcedure {
        pool_key_hash,
        gov_action_tx_id,
        gov_action_index,
        vote,
        anchor,
    });
    Ok(())
}
