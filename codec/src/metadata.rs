//! Catalyst vote registration auxiliary data codec
//!
//! CIP-15 layout: label 61284 carries the registration map, label 61285 the
//! registration signature. The auxiliary data wrapper is the Shelley-MA
//! `[metadata, auxiliary_scripts]` pair with an empty script list.

use anyhow::{Result, anyhow, bail};
use minicbor::{Decoder, Encoder};

pub const CATALYST_REGISTRATION_LABEL: u64 = 61284;
pub const CATALYST_SIGNATURE_LABEL: u64 = 61285;

const FIELD_VOTING_KEY: u8 = 1;
const FIELD_STAKE_KEY: u8 = 2;
const FIELD_REWARD_ADDRESS: u8 = 3;
const FIELD_NONCE: u8 = 4;
const FIELD_SIGNATURE: u8 = 1;

/// Decoded vote registration auxiliary data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRegistrationAuxData {
    pub voting_key: Vec<u8>,
    pub stake_key: Vec<u8>,

    /// Binary reward address receiving voting rewards
    pub reward_address: Vec<u8>,
    pub nonce: u64,
    pub signature: Vec<u8>,
}

/// Encode vote registration auxiliary data to its wire bytes
pub fn encode_vote_registration(data: &VoteRegistrationAuxData) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut e = Encoder::new(&mut buf);

    e.array(2)?;
    e.map(2)?;
    e.u64(CATALYST_REGISTRATION_LABEL)?;
    e.map(4)?
        .u8(FIELD_VOTING_KEY)?
        .bytes(&data.voting_key)?
        .u8(FIELD_STAKE_KEY)?
        .bytes(&data.stake_key)?
        .u8(FIELD_REWARD_ADDRESS)?
        .bytes(&data.reward_address)?
        .u8(FIELD_NONCE)?
        .u64(data.nonce)?;
    e.u64(CATALYST_SIGNATURE_LABEL)?;
    e.map(1)?.u8(FIELD_SIGNATURE)?.bytes(&data.signature)?;

    // No auxiliary scripts
    e.array(0)?;

    Ok(buf)
}

/// Decode vote registration auxiliary data
pub fn decode_vote_registration(bytes: &[u8]) -> Result<VoteRegistrationAuxData> {
    let mut d = Decoder::new(bytes);

    if d.array()? != Some(2) {
        bail!("expected [metadata, scripts] auxiliary data pair");
    }
    let labels = d.map()?.ok_or_else(|| anyhow!("indefinite metadata map"))?;

    let mut voting_key = None;
    let mut stake_key = None;
    let mut reward_address = None;
    let mut nonce = None;
    let mut signature = None;

    for _ in 0..labels {
        match d.u64()? {
            CATALYST_REGISTRATION_LABEL => {
                let fields = d.map()?.ok_or_else(|| anyhow!("indefinite registration map"))?;
                for _ in 0..fields {
                    match d.u8()? {
                        FIELD_VOTING_KEY => voting_key = Some(d.bytes()?.to_vec()),
                        FIELD_STAKE_KEY => stake_key = Some(d.bytes()?.to_vec()),
                        FIELD_REWARD_ADDRESS => reward_address = Some(d.bytes()?.to_vec()),
                        FIELD_NONCE => nonce = Some(d.u64()?),
                        _ => d.skip()?,
                    }
                }
            }
            CATALYST_SIGNATURE_LABEL => {
                let fields = d.map()?.ok_or_else(|| anyhow!("indefinite signature map"))?;
                for _ in 0..fields {
                    match d.u8()? {
                        FIELD_SIGNATURE => signature = Some(d.bytes()?.to_vec()),
                        _ => d.skip()?,
                    }
                }
            }
            _ => d.skip()?,
        }
    }

    Ok(VoteRegistrationAuxData {
        voting_key: voting_key.ok_or_else(|| anyhow!("missing voting key"))?,
        stake_key: stake_key.ok_or_else(|| anyhow!("missing stake key"))?,
        reward_address: reward_address.ok_or_else(|| anyhow!("missing reward address"))?,
        nonce: nonce.ok_or_else(|| anyhow!("missing nonce"))?,
        signature: signature.ok_or_else(|| anyhow!("missing signature"))?,
    })
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;

    fn test_data() -> VoteRegistrationAuxData {
        VoteRegistrationAuxData {
            voting_key: vec![0x0a; 32],
            stake_key: vec![0x0b; 32],
            reward_address: vec![0xe1; 29],
            nonce: 26_912_766,
            signature: vec![0x0c; 64],
        }
    }

    #[test]
    fn vote_registration_round_trip() {
        let data = test_data();
        let bytes = encode_vote_registration(&data).unwrap();
        assert_eq!(decode_vote_registration(&bytes).unwrap(), data);
    }

    #[test]
    fn wrapper_shape() {
        let bytes = encode_vote_registration(&test_data()).unwrap();
        // array(2), map(2), then label 61284 as uint16
        assert_eq!(&bytes[..5], &[0x82, 0xa2, 0x19, 0xef, 0x64]);
        // ends with the empty script array
        assert_eq!(*bytes.last().unwrap(), 0x80);
    }

    #[test]
    fn missing_fields_are_rejected() {
        // [{61285: {1: h''}}, []] - no registration map
        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        e.array(2).unwrap();
        e.map(1).unwrap();
        e.u64(CATALYST_SIGNATURE_LABEL).unwrap();
        e.map(1).unwrap().u8(1).unwrap().bytes(&[]).unwrap();
        e.array(0).unwrap();

        assert!(decode_vote_registration(&buf).is_err());
    }
}
