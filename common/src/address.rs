//! Cardano address definitions for Tekton
//!
//! Covers the address forms the construction engine has to produce and
//! recognize: Shelley payment addresses, stake (reward) addresses, Byron
//! bootstrap addresses, and bare pool cold key hashes.

use crate::crypto::keyhash_224;
use crate::error::ConstructionError;
use crate::types::{Credential, KeyHash, NetworkId, ScriptHash};
use std::fmt::{Display, Formatter};

const CRC32: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

/// a Byron-era address
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ByronAddress {
    /// Raw payload - the full base58-decoded bytes including CRC framing
    pub payload: Vec<u8>,
}

impl ByronAddress {
    /// Read from base58 string format, validating the CBOR envelope and CRC
    pub fn from_string(text: &str) -> Result<Self, ConstructionError> {
        let payload = bs58::decode(text)
            .into_vec()
            .map_err(|e| ConstructionError::InvalidAddress(format!("{text}: {e}")))?;

        let mut d = minicbor::Decoder::new(&payload);
        let inner = (|| -> Result<Vec<u8>, minicbor::decode::Error> {
            if d.array()? != Some(2) {
                return Err(minicbor::decode::Error::message("expected 2-element array"));
            }
            if d.tag()?.as_u64() != 24 {
                return Err(minicbor::decode::Error::message("expected tag 24"));
            }
            let inner = d.bytes()?.to_vec();
            let crc = d.u32()?;
            if CRC32.checksum(&inner) != crc {
                return Err(minicbor::decode::Error::message("CRC mismatch"));
            }
            Ok(inner)
        })()
        .map_err(|e| ConstructionError::InvalidAddress(format!("{text}: {e}")))?;

        // Inner payload must be [root hash, attributes, type]
        let mut d = minicbor::Decoder::new(&inner);
        let valid = d.array().ok().flatten() == Some(3) && d.bytes().map(|b| b.len() == 28).unwrap_or(false);
        if !valid {
            return Err(ConstructionError::InvalidAddress(format!(
                "{text}: malformed Byron payload"
            )));
        }

        Ok(ByronAddress { payload })
    }

    /// Convert to base58 string form
    pub fn to_string(&self) -> String {
        bs58::encode(&self.payload).into_string()
    }

    /// Extract the raw attribute bytes - carried verbatim into bootstrap
    /// witnesses
    pub fn attributes(&self) -> Result<Vec<u8>, ConstructionError> {
        let mut d = minicbor::Decoder::new(&self.payload);
        (|| -> Result<Vec<u8>, minicbor::decode::Error> {
            d.array()?;
            d.tag()?;
            let inner = d.bytes()?.to_vec();

            let mut d = minicbor::Decoder::new(&inner);
            d.array()?;
            d.bytes()?;
            let start = d.position();
            d.skip()?;
            let end = d.position();
            Ok(inner[start..end].to_vec())
        })()
        .map_err(|e| ConstructionError::InvalidAddress(format!("Byron attributes: {e}")))
    }
}

/// Address network identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AddressNetwork {
    /// Mainnet
    Main,

    /// Testnet
    Test,
}

impl From<NetworkId> for AddressNetwork {
    fn from(network: NetworkId) -> Self {
        match network {
            NetworkId::Mainnet => Self::Main,
            NetworkId::Testnet => Self::Test,
        }
    }
}

impl Default for AddressNetwork {
    fn default() -> Self {
        Self::Main
    }
}

/// A Shelley-era address - payment part
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ShelleyAddressPaymentPart {
    /// Payment to a key
    PaymentKeyHash(KeyHash),

    /// Payment to a script
    ScriptHash(ScriptHash),
}

/// A Shelley-era address - delegation part
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ShelleyAddressDelegationPart {
    /// No delegation (enterprise addresses)
    None,

    /// Delegation to stake key
    StakeKeyHash(KeyHash),

    /// Delegation to script key
    ScriptHash(ScriptHash),
}

/// A Shelley-era address
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ShelleyAddress {
    /// Network id
    pub network: AddressNetwork,

    /// Payment part
    pub payment: ShelleyAddressPaymentPart,

    /// Delegation part
    pub delegation: ShelleyAddressDelegationPart,
}

impl ShelleyAddress {
    /// Read from string format
    pub fn from_string(text: &str) -> Result<Self, ConstructionError> {
        let (hrp, data) = bech32::decode(text)
            .map_err(|e| ConstructionError::InvalidAddress(format!("{text}: {e}")))?;

        Self::from_bytes_with_network(&data, hrp.as_str().contains("test"))
            .map_err(|e| ConstructionError::InvalidAddress(format!("{text}: {e}")))
    }

    /// Read from binary format (header byte + hashes)
    pub fn from_bytes(data: &[u8]) -> Result<Self, ConstructionError> {
        let Some(header) = data.first() else {
            return Err(ConstructionError::InvalidAddress("empty address data".into()));
        };
        Self::from_bytes_with_network(data, header & 0x01 == 0)
    }

    fn from_bytes_with_network(data: &[u8], testnet: bool) -> Result<Self, ConstructionError> {
        let Some(header) = data.first() else {
            return Err(ConstructionError::InvalidAddress("empty address data".into()));
        };
        let header = *header;

        let network = match testnet {
            true => AddressNetwork::Test,
            false => AddressNetwork::Main,
        };

        let payment_len = 29;
        if data.len() < payment_len {
            return Err(ConstructionError::InvalidAddress(format!(
                "short address data: {} bytes",
                data.len()
            )));
        }

        let payment = match (header >> 4) & 0x01 {
            0 => ShelleyAddressPaymentPart::PaymentKeyHash(data[1..29].to_vec()),
            _ => ShelleyAddressPaymentPart::ScriptHash(data[1..29].to_vec()),
        };

        let delegation = match (header >> 5) & 0x03 {
            0 | 1 if data.len() < 57 => {
                return Err(ConstructionError::InvalidAddress(format!(
                    "short delegated address data: {} bytes",
                    data.len()
                )))
            }
            0 => ShelleyAddressDelegationPart::StakeKeyHash(data[29..57].to_vec()),
            1 => ShelleyAddressDelegationPart::ScriptHash(data[29..57].to_vec()),
            3 => ShelleyAddressDelegationPart::None,
            _ => {
                return Err(ConstructionError::InvalidAddress(
                    "pointer addresses are not supported".into(),
                ))
            }
        };

        Ok(ShelleyAddress {
            network,
            payment,
            delegation,
        })
    }

    /// Convert to binary format (header byte + hashes)
    pub fn to_bytes(&self) -> Vec<u8> {
        let network_bits = match self.network {
            AddressNetwork::Main => 1u8,
            AddressNetwork::Test => 0u8,
        };

        let (payment_hash, payment_bits): (&Vec<u8>, u8) = match &self.payment {
            ShelleyAddressPaymentPart::PaymentKeyHash(data) => (data, 0),
            ShelleyAddressPaymentPart::ScriptHash(data) => (data, 1),
        };

        let (delegation_hash, delegation_bits): (&Vec<u8>, u8) = match &self.delegation {
            ShelleyAddressDelegationPart::None => (&Vec::new(), 3),
            ShelleyAddressDelegationPart::StakeKeyHash(hash) => (hash, 0),
            ShelleyAddressDelegationPart::ScriptHash(hash) => (hash, 1),
        };

        let mut data = vec![network_bits | (payment_bits << 4) | (delegation_bits << 5)];
        data.extend(payment_hash);
        data.extend(delegation_hash);
        data
    }

    /// Convert to addr1xxx form
    pub fn to_string(&self) -> Result<String, ConstructionError> {
        let hrp = match self.network {
            AddressNetwork::Main => "addr",
            AddressNetwork::Test => "addr_test",
        };
        encode_bech32(hrp, &self.to_bytes())
    }
}

/// Payload of a stake address
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StakeAddressPayload {
    /// Stake key
    StakeKeyHash(KeyHash),

    /// Script hash
    ScriptHash(ScriptHash),
}

/// A stake (reward) address
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct StakeAddress {
    /// Network id
    pub network: AddressNetwork,

    /// Payload
    pub payload: StakeAddressPayload,
}

impl StakeAddress {
    pub fn new(payload: StakeAddressPayload, network: AddressNetwork) -> Self {
        StakeAddress { network, payload }
    }

    pub fn get_hash(&self) -> &[u8] {
        match &self.payload {
            StakeAddressPayload::StakeKeyHash(hash) => hash,
            StakeAddressPayload::ScriptHash(hash) => hash,
        }
    }

    pub fn get_credential(&self) -> Credential {
        match &self.payload {
            StakeAddressPayload::StakeKeyHash(hash) => Credential::AddrKeyHash(hash.clone()),
            StakeAddressPayload::ScriptHash(hash) => Credential::ScriptHash(hash.clone()),
        }
    }

    /// Convert to string stake1xxx format
    pub fn to_string(&self) -> Result<String, ConstructionError> {
        let hrp = match self.network {
            AddressNetwork::Main => "stake",
            AddressNetwork::Test => "stake_test",
        };
        encode_bech32(hrp, &self.to_binary())
    }

    /// Read from a string format ("stake1xxx...")
    pub fn from_string(text: &str) -> Result<Self, ConstructionError> {
        let (_, data) = bech32::decode(text)
            .map_err(|e| ConstructionError::InvalidAddress(format!("{text}: {e}")))?;
        Self::from_binary(&data)
    }

    /// Convert to binary format (29 bytes)
    pub fn to_binary(&self) -> Vec<u8> {
        let network_bits = match self.network {
            AddressNetwork::Main => 0b1u8,
            AddressNetwork::Test => 0b0u8,
        };

        let (stake_bits, stake_hash): (u8, &Vec<u8>) = match &self.payload {
            StakeAddressPayload::StakeKeyHash(data) => (0b1110, data),
            StakeAddressPayload::ScriptHash(data) => (0b1111, data),
        };

        let mut data = vec![network_bits | (stake_bits << 4)];
        data.extend(stake_hash);
        data
    }

    /// Read from binary format (29 bytes)
    pub fn from_binary(data: &[u8]) -> Result<Self, ConstructionError> {
        if data.len() != 29 {
            return Err(ConstructionError::InvalidAddress(format!(
                "bad stake address length: {}",
                data.len()
            )));
        }

        let network = match data[0] & 0x01 {
            0b1 => AddressNetwork::Main,
            _ => AddressNetwork::Test,
        };

        let payload = match (data[0] >> 4) & 0x0F {
            0b1110 => StakeAddressPayload::StakeKeyHash(data[1..].to_vec()),
            0b1111 => StakeAddressPayload::ScriptHash(data[1..].to_vec()),
            _ => {
                return Err(ConstructionError::InvalidAddress(format!(
                    "unknown header byte {:x} in stake address",
                    data[0]
                )))
            }
        };

        Ok(StakeAddress { network, payload })
    }
}

impl Display for StakeAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.to_string() {
            Ok(text) => write!(f, "{text}"),
            Err(_) => write!(f, "<invalid stake address>"),
        }
    }
}

/// A Cardano address, classified by era and role
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Address {
    Byron(ByronAddress),
    Shelley(ShelleyAddress),
    Stake(StakeAddress),

    /// A bare 28-byte pool cold key hash, given as hex
    PoolKeyHash(KeyHash),
}

impl Address {
    /// Read from string format, classifying the era
    pub fn from_string(text: &str) -> Result<Self, ConstructionError> {
        if text.starts_with("addr1") || text.starts_with("addr_test1") {
            Ok(Self::Shelley(ShelleyAddress::from_string(text)?))
        } else if text.starts_with("stake1") || text.starts_with("stake_test1") {
            Ok(Self::Stake(StakeAddress::from_string(text)?))
        } else if text.len() == 56 && text.chars().all(|c| c.is_ascii_hexdigit()) {
            let hash =
                hex::decode(text).map_err(|e| ConstructionError::InvalidAddress(e.to_string()))?;
            Ok(Self::PoolKeyHash(hash))
        } else {
            Ok(Self::Byron(ByronAddress::from_string(text)?))
        }
    }

    /// Convert to standard string representation
    pub fn to_string(&self) -> Result<String, ConstructionError> {
        match self {
            Self::Byron(byron) => Ok(byron.to_string()),
            Self::Shelley(shelley) => shelley.to_string(),
            Self::Stake(stake) => stake.to_string(),
            Self::PoolKeyHash(hash) => Ok(hex::encode(hash)),
        }
    }

    /// Binary form as used in transaction outputs and reward accounts
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Byron(byron) => byron.payload.clone(),
            Self::Shelley(shelley) => shelley.to_bytes(),
            Self::Stake(stake) => stake.to_binary(),
            Self::PoolKeyHash(hash) => hash.clone(),
        }
    }

    /// Read output address bytes back into an address. Byron output
    /// addresses keep their full CBOR payload on the wire, which starts
    /// with an array header no Shelley header byte can produce.
    pub fn from_output_bytes(data: &[u8]) -> Result<Self, ConstructionError> {
        match data.first() {
            Some(0x82) => Ok(Self::Byron(ByronAddress {
                payload: data.to_vec(),
            })),
            Some(b) if (b >> 5) == 0b111 => Ok(Self::Stake(StakeAddress::from_binary(data)?)),
            Some(_) => Ok(Self::Shelley(ShelleyAddress::from_bytes(data)?)),
            None => Err(ConstructionError::InvalidAddress("empty address bytes".into())),
        }
    }
}

fn encode_bech32(hrp: &str, data: &[u8]) -> Result<String, ConstructionError> {
    let hrp = bech32::Hrp::parse(hrp)
        .map_err(|e| ConstructionError::AddressGenerationError(e.to_string()))?;
    bech32::encode::<bech32::Bech32>(hrp, data)
        .map_err(|e| ConstructionError::AddressGenerationError(e.to_string()))
}

// -- Key handling and derivation --

/// Validate an Edwards25519 public key given as hex and reduce it to its
/// 32-byte form. Extended 64-byte keys contribute their first 32 bytes.
pub fn validate_public_key(hex_bytes: &str) -> Result<Vec<u8>, ConstructionError> {
    let bytes = hex::decode(hex_bytes)
        .map_err(|e| ConstructionError::InvalidPublicKeyFormat(e.to_string()))?;
    match bytes.len() {
        32 => Ok(bytes),
        64 => Ok(bytes[..32].to_vec()),
        n => Err(ConstructionError::InvalidPublicKeyFormat(format!(
            "expected 32 or 64 bytes, got {n}"
        ))),
    }
}

/// Derive a base address from payment and staking public keys
pub fn base_address(network: NetworkId, payment_key: &[u8], staking_key: &[u8]) -> ShelleyAddress {
    ShelleyAddress {
        network: network.into(),
        payment: ShelleyAddressPaymentPart::PaymentKeyHash(keyhash_224(payment_key)),
        delegation: ShelleyAddressDelegationPart::StakeKeyHash(keyhash_224(staking_key)),
    }
}

/// Derive an enterprise address from a payment public key
pub fn enterprise_address(network: NetworkId, payment_key: &[u8]) -> ShelleyAddress {
    ShelleyAddress {
        network: network.into(),
        payment: ShelleyAddressPaymentPart::PaymentKeyHash(keyhash_224(payment_key)),
        delegation: ShelleyAddressDelegationPart::None,
    }
}

/// Derive a reward (stake) address from a staking public key
pub fn reward_address(network: NetworkId, staking_key: &[u8]) -> StakeAddress {
    reward_address_from_hash(network, keyhash_224(staking_key))
}

/// Build a reward address around an existing stake key hash
pub fn reward_address_from_hash(network: NetworkId, hash: KeyHash) -> StakeAddress {
    StakeAddress {
        network: network.into(),
        payload: StakeAddressPayload::StakeKeyHash(hash),
    }
}

/// Decode a pool id given either as 56 hex chars or in pool1 bech32 form
pub fn decode_pool_id(text: &str) -> Result<KeyHash, ConstructionError> {
    if text.starts_with("pool1") {
        let (_, data) = bech32::decode(text)
            .map_err(|e| ConstructionError::InvalidPoolKeyHash(format!("{text}: {e}")))?;
        if data.len() != 28 {
            return Err(ConstructionError::InvalidPoolKeyHash(format!(
                "bad pool id length: {}",
                data.len()
            )));
        }
        Ok(data)
    } else {
        let data = hex::decode(text)
            .map_err(|e| ConstructionError::InvalidPoolKeyHash(format!("{text}: {e}")))?;
        if data.len() != 28 {
            return Err(ConstructionError::InvalidPoolKeyHash(format!(
                "bad pool key hash length: {}",
                data.len()
            )));
        }
        Ok(data)
    }
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keyhash_224;

    // Standard keys from CIP-19
    fn test_payment_key() -> Vec<u8> {
        let payment_key = "addr_vk1w0l2sr2zgfm26ztc6nl9xy8ghsk5sh6ldwemlpmp9xylzy4dtf7st80zhd";
        let (_, pubkey) = bech32::decode(payment_key).expect("Invalid Bech32 string");
        pubkey
    }

    fn test_stake_key() -> Vec<u8> {
        let stake_key = "stake_vk1px4j0r2fk7ux5p23shz8f3y5y2qam7s954rgf3lg5merqcj6aetsft99wu";
        let (_, pubkey) = bech32::decode(stake_key).expect("Invalid Bech32 string");
        pubkey
    }

    // Test vectors from CIP-19
    #[test]
    fn base_address_type_0() {
        let address = base_address(NetworkId::Mainnet, &test_payment_key(), &test_stake_key());
        let text = address.to_string().unwrap();
        assert_eq!(text, "addr1qx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer3n0d3vllmyqwsx5wktcd8cc3sq835lu7drv2xwl2wywfgse35a3x");

        let unpacked = ShelleyAddress::from_string(&text).unwrap();
        assert_eq!(address, unpacked);
    }

    #[test]
    fn enterprise_address_type_6() {
        let address = enterprise_address(NetworkId::Mainnet, &test_payment_key());
        let text = address.to_string().unwrap();
        assert_eq!(
            text,
            "addr1vx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzers66hrl8"
        );

        let unpacked = ShelleyAddress::from_string(&text).unwrap();
        assert_eq!(address, unpacked);
    }

    #[test]
    fn reward_address_type_14() {
        let address = reward_address(NetworkId::Mainnet, &test_stake_key());
        let text = address.to_string().unwrap();
        assert_eq!(
            text,
            "stake1uyehkck0lajq8gr28t9uxnuvgcqrc6070x3k9r8048z8y5gh6ffgw"
        );

        let unpacked = StakeAddress::from_string(&text).unwrap();
        assert_eq!(address, unpacked);
    }

    #[test]
    fn testnet_enterprise_address() {
        let address = enterprise_address(NetworkId::Testnet, &test_payment_key());
        let text = address.to_string().unwrap();
        assert!(text.starts_with("addr_test1"));

        let unpacked = ShelleyAddress::from_string(&text).unwrap();
        assert_eq!(unpacked.network, AddressNetwork::Test);
    }

    #[test]
    fn shelley_address_bytes_round_trip() {
        let address = base_address(NetworkId::Mainnet, &test_payment_key(), &test_stake_key());
        let bytes = address.to_bytes();
        assert_eq!(bytes.len(), 57);
        assert_eq!(ShelleyAddress::from_bytes(&bytes).unwrap(), address);
    }

    #[test]
    fn stake_address_from_binary_mainnet_stake() {
        // First withdrawal on Mainnet
        let binary =
            hex::decode("e1558f3ee09b26d88fac2eddc772a9eda94cce6dbadbe9fee439bd6001").unwrap();
        let sa = StakeAddress::from_binary(&binary).unwrap();
        assert_eq!(sa.network, AddressNetwork::Main);
        assert_eq!(
            hex::encode(sa.get_hash()),
            "558f3ee09b26d88fac2eddc772a9eda94cce6dbadbe9fee439bd6001"
        );
        assert_eq!(sa.to_binary(), binary);
    }

    #[test]
    fn stake_address_rejects_bad_length() {
        assert!(StakeAddress::from_binary(&[0xe1, 0x00, 0x01]).is_err());
    }

    #[test]
    fn byron_address_round_trip() {
        // Well-known mainnet bootstrap address with empty attributes
        let text = "Ae2tdPwUPEZFRbyhz3cpfC2CumGzNkFBN2L42rcUc2yjQpEkxDbkPodpMAi";
        let address = ByronAddress::from_string(text).unwrap();
        assert_eq!(address.to_string(), text);

        // Empty attribute map is a single CBOR byte
        assert_eq!(address.attributes().unwrap(), vec![0xa0]);
    }

    #[test]
    fn byron_address_rejects_garbage() {
        assert!(ByronAddress::from_string("not-an-address").is_err());
        // Valid base58 but not a Byron CBOR payload
        assert!(ByronAddress::from_string("1111111111").is_err());
    }

    #[test]
    fn classify_addresses() {
        let pool_hex = "1b268f4cba3faa7e36d8a0cc4adca2096fb856119412ee7330f692b5";
        assert!(matches!(
            Address::from_string(pool_hex).unwrap(),
            Address::PoolKeyHash(_)
        ));
        assert!(matches!(
            Address::from_string("stake1uyehkck0lajq8gr28t9uxnuvgcqrc6070x3k9r8048z8y5gh6ffgw")
                .unwrap(),
            Address::Stake(_)
        ));
        assert!(matches!(
            Address::from_string("Ae2tdPwUPEZFRbyhz3cpfC2CumGzNkFBN2L42rcUc2yjQpEkxDbkPodpMAi")
                .unwrap(),
            Address::Byron(_)
        ));
    }

    #[test]
    fn validate_public_key_lengths() {
        assert_eq!(validate_public_key(&"00".repeat(32)).unwrap().len(), 32);
        assert_eq!(validate_public_key(&"00".repeat(64)).unwrap().len(), 32);
        assert!(validate_public_key(&"00".repeat(31)).is_err());
        assert!(validate_public_key("zz").is_err());
    }

    #[test]
    fn decode_pool_id_forms() {
        let hash = decode_pool_id("1b268f4cba3faa7e36d8a0cc4adca2096fb856119412ee7330f692b5").unwrap();
        assert_eq!(hash.len(), 28);
        assert!(decode_pool_id("1b268f").is_err());
    }
}
