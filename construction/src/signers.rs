//! Per-operation signer derivation, used when parsing signed transactions

use tekton_codec::Certificate;
use tekton_common::address::{StakeAddress, reward_address_from_hash, validate_public_key};
use tekton_common::crypto::keyhash_224;
use tekton_common::operations::{Operation, OperationType};
use tekton_common::{ConstructionError, NetworkId};

/// Addresses expected to sign for one operation
pub fn operation_signers(
    network: NetworkId,
    operation: &Operation,
) -> Result<Vec<String>, ConstructionError> {
    match operation.operation_type {
        // Outputs and vote registrations carry no signature
        OperationType::Output | OperationType::VoteRegistration => Ok(Vec::new()),

        OperationType::PoolRegistration => {
            let mut signers = Vec::new();
            if let Some(params) =
                operation.metadata.as_ref().and_then(|m| m.pool_registration_params.as_ref())
            {
                signers.extend(params.pool_owners.iter().cloned());
                signers.push(params.reward_address.clone());
            }
            if let Some(address) = operation.address() {
                signers.push(address.to_string());
            }
            Ok(signers)
        }

        OperationType::PoolRegistrationWithCert => {
            let mut signers = Vec::new();
            if let Some(cert_hex) =
                operation.metadata.as_ref().and_then(|m| m.pool_registration_cert.as_deref())
            {
                let bytes = hex::decode(cert_hex)
                    .map_err(|e| ConstructionError::InvalidPoolCert(e.to_string()))?;
                let certificate: Certificate = minicbor::decode(&bytes)
                    .map_err(|e| ConstructionError::InvalidPoolCert(e.to_string()))?;
                if let Certificate::PoolRegistration(pool) = certificate {
                    signers.push(StakeAddress::from_binary(&pool.reward_account)?.to_string()?);
                    for owner in pool.owners {
                        signers.push(reward_address_from_hash(network, owner).to_string()?);
                    }
                }
            }
            if let Some(address) = operation.address() {
                signers.push(address.to_string());
            }
            Ok(signers)
        }

        // Credential-bearing operations answer with the reward address the
        // credential derives to; anything else with its own account address
        _ => {
            if let Some(credential) =
                operation.metadata.as_ref().and_then(|m| m.staking_credential.as_ref())
            {
                let key = validate_public_key(&credential.hex_bytes)
                    .map_err(|e| ConstructionError::InvalidStakingKeyFormat(e.to_string()))?;
                let stake = reward_address_from_hash(network, keyhash_224(&key));
                return Ok(vec![stake.to_string()?]);
            }
            Ok(operation.address().map(str::to_string).into_iter().collect())
        }
    }
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;
    use tekton_common::operations::*;

    #[test]
    fn outputs_have_no_signers() {
        let mut op = Operation::new(0, OperationType::Output);
        op.account = Some(AccountIdentifier {
            address: "addr1vx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzers66hrl8".into(),
        });
        assert!(operation_signers(NetworkId::Mainnet, &op).unwrap().is_empty());
    }

    #[test]
    fn inputs_sign_with_their_account() {
        let mut op = Operation::new(0, OperationType::Input);
        op.account = Some(AccountIdentifier {
            address: "addr1vx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzers66hrl8".into(),
        });
        let signers = operation_signers(NetworkId::Mainnet, &op).unwrap();
        assert_eq!(signers.len(), 1);
        assert!(signers[0].starts_with("addr1"));
    }

    #[test]
    fn credential_operations_sign_with_reward_address() {
        let mut op = Operation::new(0, OperationType::StakeDelegation);
        op.metadata = Some(OperationMetadata {
            staking_credential: Some(PublicKey::edwards("1b".repeat(32))),
            ..Default::default()
        });
        let signers = operation_signers(NetworkId::Mainnet, &op).unwrap();
        assert_eq!(signers.len(), 1);
        assert!(signers[0].starts_with("stake1"));
    }

    #[test]
    fn pool_registration_signers_include_owners_and_reward() {
        let mut op = Operation::new(0, OperationType::PoolRegistration);
        op.account = Some(AccountIdentifier {
            address: "1b".repeat(28),
        });
        op.metadata = Some(OperationMetadata {
            pool_registration_params: Some(PoolRegistrationParams {
                vrf_key_hash: "2c".repeat(32),
                reward_address: "stake1uyehkck0lajq8gr28t9uxnuvgcqrc6070x3k9r8048z8y5gh6ffgw"
                    .into(),
                pledge: "0".into(),
                cost: "0".into(),
                pool_owners: vec![
                    "stake1uyehkck0lajq8gr28t9uxnuvgcqrc6070x3k9r8048z8y5gh6ffgw".into(),
                ],
                relays: vec![],
                margin: None,
                margin_percentage: Some("0".into()),
                pool_metadata: None,
            }),
            ..Default::default()
        });
        let signers = operation_signers(NetworkId::Mainnet, &op).unwrap();
        assert_eq!(signers.len(), 3);
    }
}
