//! Generic operation model for the construction engine
//!
//! Operations describe transaction effects in the flat account/amount form
//! used by construction clients; the codec crate owns the native wire form.

use serde::{Deserialize, Serialize};

pub const ADA_SYMBOL: &str = "ADA";
pub const ADA_DECIMALS: u32 = 6;

/// Operation kinds understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    #[serde(rename = "input")]
    Input,
    #[serde(rename = "output")]
    Output,
    #[serde(rename = "stakeKeyRegistration")]
    StakeKeyRegistration,
    #[serde(rename = "stakeKeyDeregistration")]
    StakeKeyDeregistration,
    #[serde(rename = "stakeDelegation")]
    StakeDelegation,
    #[serde(rename = "withdrawal")]
    Withdrawal,
    #[serde(rename = "poolRegistration")]
    PoolRegistration,
    #[serde(rename = "poolRegistrationWithCert")]
    PoolRegistrationWithCert,
    #[serde(rename = "poolRetirement")]
    PoolRetirement,
    #[serde(rename = "voteRegistration")]
    VoteRegistration,
    #[serde(rename = "dRepVoteDelegation")]
    DRepVoteDelegation,
    #[serde(rename = "poolGovernanceVote")]
    PoolGovernanceVote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationIdentifier {
    pub index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_index: Option<u64>,
}

impl OperationIdentifier {
    pub fn new(index: u64) -> Self {
        Self {
            index,
            network_index: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentifier {
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyMetadata {
    pub policy_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub symbol: String,
    pub decimals: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CurrencyMetadata>,
}

impl Currency {
    pub fn ada() -> Self {
        Self {
            symbol: ADA_SYMBOL.to_string(),
            decimals: ADA_DECIMALS,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: Currency,
}

impl Amount {
    pub fn ada(value: i128) -> Self {
        Self {
            value: value.to_string(),
            currency: Currency::ada(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinIdentifier {
    /// "txid:index"
    pub identifier: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoinAction {
    #[serde(rename = "coin_spent")]
    Spent,
    #[serde(rename = "coin_created")]
    Created,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinChange {
    pub coin_identifier: CoinIdentifier,
    pub coin_action: CoinAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveType {
    #[serde(rename = "edwards25519")]
    Edwards25519,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub hex_bytes: String,
    pub curve_type: CurveType,
}

impl PublicKey {
    pub fn edwards(hex_bytes: impl Into<String>) -> Self {
        Self {
            hex_bytes: hex_bytes.into(),
            curve_type: CurveType::Edwards25519,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundleItem {
    pub policy_id: String,
    pub tokens: Vec<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMargin {
    pub numerator: String,
    pub denominator: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMetadata {
    pub url: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    #[serde(rename = "type")]
    pub relay_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRegistrationParams {
    pub vrf_key_hash: String,
    pub reward_address: String,
    pub pledge: String,
    pub cost: String,
    pub pool_owners: Vec<String>,
    pub relays: Vec<Relay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<PoolMargin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_percentage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_metadata: Option<PoolMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRegistrationMetadata {
    pub stake_key: PublicKey,
    pub voting_key: PublicKey,
    pub reward_address: String,
    pub voting_nonce: u64,
    pub voting_signature: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DRepType {
    #[serde(rename = "key_hash")]
    KeyHash,
    #[serde(rename = "script_hash")]
    ScriptHash,
    #[serde(rename = "abstain")]
    Abstain,
    #[serde(rename = "no_confidence")]
    NoConfidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DRepParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub drep_type: DRepType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    #[serde(rename = "yes")]
    Yes,
    #[serde(rename = "no")]
    No,
    #[serde(rename = "abstain")]
    Abstain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRationale {
    pub url: String,
    pub data_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolGovernanceVoteParams {
    /// 64 hex chars of governance action tx id + 2 hex chars of index
    pub governance_action_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_credential: Option<PublicKey>,
    pub vote: VoteChoice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_rationale: Option<VoteRationale>,
}

/// Kind-specific operation metadata - all fields optional, validated by
/// the translator per operation type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staking_credential: Option<PublicKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_key_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_bundle: Option<Vec<TokenBundleItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_registration_cert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_registration_params: Option<PoolRegistrationParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_registration_metadata: Option<VoteRegistrationMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drep: Option<DRepParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_governance_vote_params: Option<PoolGovernanceVoteParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal_amount: Option<Amount>,
}

/// A single transaction effect in generic form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_identifier: OperationIdentifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_operations: Option<Vec<OperationIdentifier>>,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coin_change: Option<CoinChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<OperationMetadata>,
}

impl Operation {
    /// Minimal operation with just an index and a type
    pub fn new(index: u64, operation_type: OperationType) -> Self {
        Self {
            operation_identifier: OperationIdentifier::new(index),
            related_operations: None,
            operation_type,
            status: None,
            account: None,
            amount: None,
            coin_change: None,
            metadata: None,
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.account.as_ref().map(|a| a.address.as_str())
    }
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_type_wire_names() {
        let json = serde_json::to_string(&OperationType::StakeKeyRegistration).unwrap();
        assert_eq!(json, "\"stakeKeyRegistration\"");
        let parsed: OperationType = serde_json::from_str("\"dRepVoteDelegation\"").unwrap();
        assert_eq!(parsed, OperationType::DRepVoteDelegation);
    }

    #[test]
    fn unknown_operation_type_is_rejected() {
        let parsed: Result<OperationType, _> = serde_json::from_str("\"teleport\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn operation_json_round_trip() {
        let mut op = Operation::new(0, OperationType::Input);
        op.account = Some(AccountIdentifier {
            address: "addr1vx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzers66hrl8".into(),
        });
        op.amount = Some(Amount::ada(-10_000_000));
        op.coin_change = Some(CoinChange {
            coin_identifier: CoinIdentifier {
                identifier: format!("{}:0", "2f".repeat(32)),
            },
            coin_action: CoinAction::Spent,
        });

        let json = serde_json::to_string(&op).unwrap();
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);

        // Optional fields stay off the wire
        assert!(!json.contains("metadata"));
        assert!(json.contains("coin_spent"));
    }
}
