//! Certificate codec - stake, pool and governance certificates
//!
//! Tags follow the Shelley/Conway certificate CDDL. Only the certificate
//! kinds the construction engine emits are covered.

use minicbor::data::{Tag, Type};
use minicbor::{Decode, Decoder, Encode, Encoder};
use tekton_common::Credential;

const TAG_STAKE_REGISTRATION: u64 = 0;
const TAG_STAKE_DEREGISTRATION: u64 = 1;
const TAG_STAKE_DELEGATION: u64 = 2;
const TAG_POOL_REGISTRATION: u64 = 3;
const TAG_POOL_RETIREMENT: u64 = 4;
const TAG_VOTE_DELEGATION: u64 = 9;

const RATIONAL_TAG: u64 = 30;

/// Margin as a rational number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitInterval {
    pub numerator: u64,
    pub denominator: u64,
}

/// Pool relay forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolRelay {
    SingleHostAddr {
        port: Option<u16>,
        ipv4: Option<[u8; 4]>,
        ipv6: Option<[u8; 16]>,
    },
    SingleHostName {
        port: Option<u16>,
        dns_name: String,
    },
    MultiHostName {
        dns_name: String,
    },
}

/// Off-chain pool metadata reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolMetadataRef {
    pub url: String,
    pub hash: Vec<u8>,
}

/// Pool registration certificate body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRegistration {
    pub operator: Vec<u8>,
    pub vrf_key_hash: Vec<u8>,
    pub pledge: u64,
    pub cost: u64,
    pub margin: UnitInterval,

    /// 29-byte reward account address
    pub reward_account: Vec<u8>,

    /// Owner stake key hashes
    pub owners: Vec<Vec<u8>>,
    pub relays: Vec<PoolRelay>,
    pub metadata: Option<PoolMetadataRef>,
}

/// Delegation target for governance vote delegation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DRep {
    KeyHash(Vec<u8>),
    ScriptHash(Vec<u8>),
    Abstain,
    NoConfidence,
}

/// A certificate in a transaction body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Certificate {
    StakeRegistration(Credential),
    StakeDeregistration(Credential),
    StakeDelegation {
        credential: Credential,
        pool_key_hash: Vec<u8>,
    },
    PoolRegistration(PoolRegistration),
    PoolRetirement {
        pool_key_hash: Vec<u8>,
        epoch: u64,
    },
    VoteDelegation {
        credential: Credential,
        drep: DRep,
    },
}

pub fn encode_credential<W: minicbor::encode::Write>(
    credential: &Credential,
    e: &mut Encoder<W>,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    match credential {
        Credential::AddrKeyHash(hash) => e.array(2)?.u8(0)?.bytes(hash)?,
        Credential::ScriptHash(hash) => e.array(2)?.u8(1)?.bytes(hash)?,
    };
    Ok(())
}

pub fn decode_credential(d: &mut Decoder) -> Result<Credential, minicbor::decode::Error> {
    if d.array()? != Some(2) {
        return Err(minicbor::decode::Error::message("expected credential pair"));
    }
    match d.u64()? {
        0 => Ok(Credential::AddrKeyHash(d.bytes()?.to_vec())),
        1 => Ok(Credential::ScriptHash(d.bytes()?.to_vec())),
        n => Err(minicbor::decode::Error::message(format!(
            "unknown credential kind {n}"
        ))),
    }
}

fn encode_nullable_u16<W: minicbor::encode::Write>(
    v: &Option<u16>,
    e: &mut Encoder<W>,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    match v {
        Some(v) => e.u16(*v)?,
        None => e.null()?,
    };
    Ok(())
}

fn decode_nullable_u16(d: &mut Decoder) -> Result<Option<u16>, minicbor::decode::Error> {
    if d.datatype()? == Type::Null {
        d.skip()?;
        Ok(None)
    } else {
        Ok(Some(d.u16()?))
    }
}

fn decode_nullable_bytes(d: &mut Decoder) -> Result<Option<Vec<u8>>, minicbor::decode::Error> {
    if d.datatype()? == Type::Null {
        d.skip()?;
        Ok(None)
    } else {
        Ok(Some(d.bytes()?.to_vec()))
    }
}

impl<C> Encode<C> for PoolRelay {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Self::SingleHostAddr { port, ipv4, ipv6 } => {
                e.array(4)?.u8(0)?;
                encode_nullable_u16(port, e)?;
                match ipv4 {
                    Some(ip) => e.bytes(ip)?,
                    None => e.null()?,
                };
                match ipv6 {
                    Some(ip) => e.bytes(ip)?,
                    None => e.null()?,
                };
            }
            Self::SingleHostName { port, dns_name } => {
                e.array(3)?.u8(1)?;
                encode_nullable_u16(port, e)?;
                e.str(dns_name)?;
            }
            Self::MultiHostName { dns_name } => {
                e.array(2)?.u8(2)?.str(dns_name)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for PoolRelay {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;
        match d.u64()? {
            0 => {
                let port = decode_nullable_u16(d)?;
                let ipv4 = match decode_nullable_bytes(d)? {
                    Some(b) => Some(<[u8; 4]>::try_from(b.as_slice()).map_err(|_| {
                        minicbor::decode::Error::message("bad ipv4 length in relay")
                    })?),
                    None => None,
                };
                let ipv6 = match decode_nullable_bytes(d)? {
                    Some(b) => Some(<[u8; 16]>::try_from(b.as_slice()).map_err(|_| {
                        minicbor::decode::Error::message("bad ipv6 length in relay")
                    })?),
                    None => None,
                };
                Ok(Self::SingleHostAddr { port, ipv4, ipv6 })
            }
            1 => Ok(Self::SingleHostName {
                port: decode_nullable_u16(d)?,
                dns_name: d.str()?.to_string(),
            }),
            2 => Ok(Self::MultiHostName {
                dns_name: d.str()?.to_string(),
            }),
            n => Err(minicbor::decode::Error::message(format!(
                "unknown relay kind {n}"
            ))),
        }
    }
}

impl<C> Encode<C> for DRep {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Self::KeyHash(hash) => e.array(2)?.u8(0)?.bytes(hash)?,
            Self::ScriptHash(hash) => e.array(2)?.u8(1)?.bytes(hash)?,
            Self::Abstain => e.array(1)?.u8(2)?,
            Self::NoConfidence => e.array(1)?.u8(3)?,
        };
        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for DRep {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;
        match d.u64()? {
            0 => Ok(Self::KeyHash(d.bytes()?.to_vec())),
            1 => Ok(Self::ScriptHash(d.bytes()?.to_vec())),
            2 => Ok(Self::Abstain),
            3 => Ok(Self::NoConfidence),
            n => Err(minicbor::decode::Error::message(format!(
                "unknown drep kind {n}"
            ))),
        }
    }
}

impl<C> Encode<C> for Certificate {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Self::StakeRegistration(credential) => {
                e.array(2)?.u64(TAG_STAKE_REGISTRATION)?;
                encode_credential(credential, e)?;
            }
            Self::StakeDeregistration(credential) => {
                e.array(2)?.u64(TAG_STAKE_DEREGISTRATION)?;
                encode_credential(credential, e)?;
            }
            Self::StakeDelegation {
                credential,
                pool_key_hash,
            } => {
                e.array(3)?.u64(TAG_STAKE_DELEGATION)?;
                encode_credential(credential, e)?;
                e.bytes(pool_key_hash)?;
            }
            Self::PoolRegistration(pool) => {
                e.array(10)?.u64(TAG_POOL_REGISTRATION)?;
                e.bytes(&pool.operator)?;
                e.bytes(&pool.vrf_key_hash)?;
                e.u64(pool.pledge)?;
                e.u64(pool.cost)?;
                e.tag(Tag::new(RATIONAL_TAG))?;
                e.array(2)?.u64(pool.margin.numerator)?.u64(pool.margin.denominator)?;
                e.bytes(&pool.reward_account)?;
                e.array(pool.owners.len() as u64)?;
                for owner in &pool.owners {
                    e.bytes(owner)?;
                }
                e.array(pool.relays.len() as u64)?;
                for relay in &pool.relays {
                    relay.encode(e, ctx)?;
                }
                match &pool.metadata {
                    Some(metadata) => {
                        e.array(2)?.str(&metadata.url)?.bytes(&metadata.hash)?;
                    }
                    None => {
                        e.null()?;
                    }
                }
            }
            Self::PoolRetirement {
                pool_key_hash,
                epoch,
            } => {
                e.array(3)?.u64(TAG_POOL_RETIREMENT)?.bytes(pool_key_hash)?.u64(*epoch)?;
            }
            Self::VoteDelegation { credential, drep } => {
                e.array(3)?.u64(TAG_VOTE_DELEGATION)?;
                encode_credential(credential, e)?;
                drep.encode(e, ctx)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for Certificate {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;
        match d.u64()? {
            TAG_STAKE_REGISTRATION => Ok(Self::StakeRegistration(decode_credential(d)?)),
            TAG_STAKE_DEREGISTRATION => Ok(Self::StakeDeregistration(decode_credential(d)?)),
            TAG_STAKE_DELEGATION => Ok(Self::StakeDelegation {
                credential: decode_credential(d)?,
                pool_key_hash: d.bytes()?.to_vec(),
            }),
            TAG_POOL_REGISTRATION => {
                let operator = d.bytes()?.to_vec();
                let vrf_key_hash = d.bytes()?.to_vec();
                let pledge = d.u64()?;
                let cost = d.u64()?;
                let tag = d.tag()?;
                if tag.as_u64() != RATIONAL_TAG {
                    return Err(minicbor::decode::Error::message(format!(
                        "expected rational tag for pool margin, got {}",
                        tag.as_u64()
                    )));
                }
                if d.array()? != Some(2) {
                    return Err(minicbor::decode::Error::message("malformed pool margin"));
                }
                let margin = UnitInterval {
                    numerator: d.u64()?,
                    denominator: d.u64()?,
                };
                let reward_account = d.bytes()?.to_vec();

                let n = d.array()?.ok_or_else(|| {
                    minicbor::decode::Error::message("indefinite pool owner array")
                })?;
                let mut owners = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    owners.push(d.bytes()?.to_vec());
                }

                let n = d.array()?.ok_or_else(|| {
                    minicbor::decode::Error::message("indefinite pool relay array")
                })?;
                let mut relays = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    relays.push(PoolRelay::decode(d, ctx)?);
                }

                let metadata = if d.datatype()? == Type::Null {
                    d.skip()?;
                    None
                } else {
                    if d.array()? != Some(2) {
                        return Err(minicbor::decode::Error::message("malformed pool metadata"));
                    }
                    Some(PoolMetadataRef {
                        url: d.str()?.to_string(),
                        hash: d.bytes()?.to_vec(),
                    })
                };

                Ok(Self::PoolRegistration(PoolRegistration {
                    operator,
                    vrf_key_hash,
                    pledge,
                    cost,
                    margin,
                    reward_account,
                    owners,
                    relays,
                    metadata,
                }))
            }
            TAG_POOL_RETIREMENT => Ok(Self::PoolRetirement {
                pool_key_hash: d.bytes()?.to_vec(),
                epoch: d.u64()?,
            }),
            TAG_VOTE_DELEGATION => Ok(Self::VoteDelegation {
                credential: decode_credential(d)?,
                drep: DRep::decode(d, ctx)?,
            }),
            n => Err(minicbor::decode::Error::message(format!(
                "unsupported certificate kind {n}"
            ))),
        }
    }
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(cert: &Certificate) {
        let bytes = minicbor::to_vec(cert).unwrap();
        let decoded: Certificate = minicbor::decode(&bytes).unwrap();
        assert_eq!(&decoded, cert);
    }

    fn key_credential() -> Credential {
        Credential::AddrKeyHash(vec![0x11; 28])
    }

    #[test]
    fn stake_certificates() {
        round_trip(&Certificate::StakeRegistration(key_credential()));
        round_trip(&Certificate::StakeDeregistration(key_credential()));
        round_trip(&Certificate::StakeDelegation {
            credential: key_credential(),
            pool_key_hash: vec![0x22; 28],
        });
    }

    #[test]
    fn stake_registration_bytes() {
        let cert = Certificate::StakeRegistration(key_credential());
        let bytes = minicbor::to_vec(&cert).unwrap();
        // [0, [0, h'11...']]
        assert_eq!(&bytes[..5], &[0x82, 0x00, 0x82, 0x00, 0x58]);
    }

    #[test]
    fn pool_registration_round_trip() {
        round_trip(&Certificate::PoolRegistration(PoolRegistration {
            operator: vec![0x33; 28],
            vrf_key_hash: vec![0x44; 32],
            pledge: 5_000_000_000,
            cost: 340_000_000,
            margin: UnitInterval {
                numerator: 3,
                denominator: 100,
            },
            reward_account: vec![0xe1; 29],
            owners: vec![vec![0x55; 28], vec![0x66; 28]],
            relays: vec![
                PoolRelay::SingleHostAddr {
                    port: Some(3001),
                    ipv4: Some([10, 0, 0, 1]),
                    ipv6: None,
                },
                PoolRelay::SingleHostName {
                    port: None,
                    dns_name: "relay.example.com".into(),
                },
                PoolRelay::MultiHostName {
                    dns_name: "relays.example.com".into(),
                },
            ],
            metadata: Some(PoolMetadataRef {
                url: "https://example.com/pool.json".into(),
                hash: vec![0x77; 32],
            }),
        }));
    }

    #[test]
    fn pool_retirement_round_trip() {
        round_trip(&Certificate::PoolRetirement {
            pool_key_hash: vec![0x88; 28],
            epoch: 312,
        });
    }

    #[test]
    fn vote_delegation_round_trip() {
        round_trip(&Certificate::VoteDelegation {
            credential: key_credential(),
            drep: DRep::KeyHash(vec![0x99; 28]),
        });
        round_trip(&Certificate::VoteDelegation {
            credential: key_credential(),
            drep: DRep::Abstain,
        });
        round_trip(&Certificate::VoteDelegation {
            credential: key_credential(),
            drep: DRep::NoConfidence,
        });
    }
}
