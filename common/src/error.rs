//! Error definitions for the construction engine
//!
//! Every error carries a stable (code, message, retriable) triple so that
//! callers can match on codes across releases. Details appended to the
//! Display output are informational only and not part of the contract.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    #[error("Invalid public key format: {0}")]
    InvalidPublicKeyFormat(String),

    #[error("Public key is missing")]
    PublicKeyMissing,

    #[error("Transaction inputs parameters errors in operations array: {0}")]
    InvalidOperationData(String),

    #[error("The transaction you are trying to build has more outputs than inputs")]
    OutputsExceedInputs,

    #[error("Cannot create unsigned transaction probably because of unsynced blockchain: {0}")]
    CantCreateUnsignedTransaction(String),

    #[error("Transaction extra data cannot be encoded: {0}")]
    CantEncodeExtraData(String),

    #[error("Provided address is invalid: {0}")]
    InvalidAddress(String),

    #[error("Provided address type is invalid: {0}")]
    InvalidAddressType(String),

    #[error("Invalid staking key format: {0}")]
    InvalidStakingKeyFormat(String),

    #[error("Staking key is required for this type of address")]
    StakingKeyMissing,

    #[error("Provided operation type is invalid: {0}")]
    InvalidOperationType(String),

    #[error("Pool key hash is required to operate")]
    PoolKeyMissing,

    #[error("Assets are required for token bundle")]
    TokenBundleAssetsMissing,

    #[error("Asset value is required for token asset: {0}")]
    TokenAssetValueMissing(String),

    #[error("Invalid policy id: {0}")]
    InvalidPolicyId(String),

    #[error("Invalid token name: {0}")]
    InvalidTokenName(String),

    #[error("Provided pool key hash has invalid format: {0}")]
    InvalidPoolKeyHash(String),

    #[error("Pool registration certificate is required for pool registration")]
    PoolCertMissing,

    #[error("Invalid pool registration certificate format: {0}")]
    InvalidPoolCert(String),

    #[error("Invalid certificate type. Expected pool registration certificate")]
    InvalidPoolCertType,

    #[error("Pool registration parameters were expected")]
    PoolRegistrationParamsMissing,

    #[error("Pool relays are invalid: {0}")]
    InvalidPoolRelays(String),

    #[error("Pool metadata is invalid: {0}")]
    InvalidPoolMetadata(String),

    #[error("Dns name expected for pool relay")]
    DnsNameMissing,

    #[error("Invalid pool relay type: {0}")]
    InvalidPoolRelayType(String),

    #[error("Invalid pool owners received: {0}")]
    InvalidPoolOwners(String),

    #[error("Invalid pool registration parameters received: {0}")]
    InvalidPoolRegistrationParams(String),

    #[error("Mandatory parameter is missing: Epoch")]
    MissingMetadataParametersForPoolRetirement,

    #[error("DRep is missing")]
    MissingDrep,

    #[error("Drep id has invalid length: {0}")]
    InvalidDrepIdLength(String),

    #[error("Drep type is invalid: {0}")]
    InvalidDrepType(String),

    #[error("Drep id does not match the drep type: {0}")]
    MismatchDrepType(String),

    #[error("Governance vote is invalid: {0}")]
    InvalidGovernanceVote(String),

    #[error("An error occurred: {0}")]
    UnspecifiedError(String),

    #[error("Address generation error: {0}")]
    AddressGenerationError(String),

    #[error("Cannot parse signed transaction: {0}")]
    ParseSignedTransactionError(String),

    #[error("Cannot create signed transaction probably because of unsynced blockchain: {0}")]
    CantCreateSignedTransaction(String),

    #[error("Cannot build witnesses set for transaction probably because of provided signatures: {0}")]
    CantBuildWitnessesSet(String),

    #[error("Invalid voting signature: {0}")]
    InvalidVotingSignature(String),

    #[error("Missing vote registration metadata")]
    MissingVoteRegistrationMetadata,

    #[error("Missing chain code")]
    ChainCodeMissing,

    #[error("Cannot deserialize provided data: {0}")]
    GeneralDeserializationError(String),

    #[error("Provided transaction is invalid: {0}")]
    InvalidTransaction(String),
}

impl ConstructionError {
    /// Stable numeric code for the error
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidNetwork(_) => 4000,
            Self::InvalidPublicKeyFormat(_) => 4007,
            Self::PublicKeyMissing => 4008,
            Self::InvalidOperationData(_) => 4009,
            Self::OutputsExceedInputs => 4010,
            Self::CantCreateUnsignedTransaction(_) => 4012,
            Self::CantEncodeExtraData(_) => 4012,
            Self::InvalidAddress(_) => 4015,
            Self::InvalidAddressType(_) => 4016,
            Self::InvalidStakingKeyFormat(_) => 4017,
            Self::StakingKeyMissing => 4018,
            Self::InvalidOperationType(_) => 4019,
            Self::PoolKeyMissing => 4020,
            Self::TokenBundleAssetsMissing => 4021,
            Self::TokenAssetValueMissing(_) => 4022,
            Self::InvalidPolicyId(_) => 4023,
            Self::InvalidTokenName(_) => 4024,
            Self::InvalidPoolKeyHash(_) => 4025,
            Self::PoolCertMissing => 4026,
            Self::InvalidPoolCert(_) => 4027,
            Self::InvalidPoolCertType => 4028,
            Self::PoolRegistrationParamsMissing => 4029,
            Self::InvalidPoolRelays(_) => 4030,
            Self::InvalidPoolMetadata(_) => 4031,
            Self::DnsNameMissing => 4032,
            Self::InvalidPoolRelayType(_) => 4033,
            Self::InvalidPoolOwners(_) => 4034,
            Self::InvalidPoolRegistrationParams(_) => 4035,
            Self::MissingMetadataParametersForPoolRetirement => 4036,
            Self::MissingDrep => 4037,
            Self::InvalidDrepIdLength(_) => 4038,
            Self::InvalidDrepType(_) => 4039,
            Self::MismatchDrepType(_) => 4040,
            Self::InvalidGovernanceVote(_) => 4041,
            Self::UnspecifiedError(_) => 5000,
            Self::AddressGenerationError(_) => 5002,
            Self::ParseSignedTransactionError(_) => 5003,
            Self::CantCreateSignedTransaction(_) => 5004,
            Self::CantBuildWitnessesSet(_) => 5005,
            Self::InvalidVotingSignature(_) => 5008,
            Self::MissingVoteRegistrationMetadata => 5011,
            Self::ChainCodeMissing => 5012,
            Self::GeneralDeserializationError(_) => 5018,
            Self::InvalidTransaction(_) => 5019,
        }
    }

    /// Whether a caller may usefully retry the same request
    pub fn retriable(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress(_) | Self::InvalidAddressType(_) | Self::InvalidOperationType(_)
        )
    }

    // Convenience constructors for the detail-carrying variants that get
    // built from foreign errors all over the codebase
    pub fn invalid_address(detail: impl Into<String>) -> Self {
        Self::InvalidAddress(detail.into())
    }

    pub fn invalid_operation_data(detail: impl Into<String>) -> Self {
        Self::InvalidOperationData(detail.into())
    }

    pub fn deserialization(detail: impl Into<String>) -> Self {
        Self::GeneralDeserializationError(detail.into())
    }
}
