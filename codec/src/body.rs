//! Transaction body codec
//!
//! The body is a CBOR map with integer keys, encoded canonically: definite
//! lengths, keys ascending, withdrawal and multiasset map keys sorted
//! bytewise. The TTL entry (key 3) is always written, zero included, so the
//! signing hash is stable across the build-then-estimate flow.

use crate::certs::Certificate;
use crate::value::{TransactionInput, TransactionOutput};
use minicbor::data::Type;
use minicbor::{Decode, Decoder, Encode, Encoder};
use std::collections::BTreeMap;

const KEY_INPUTS: u8 = 0;
const KEY_OUTPUTS: u8 = 1;
const KEY_FEE: u8 = 2;
const KEY_TTL: u8 = 3;
const KEY_CERTIFICATES: u8 = 4;
const KEY_WITHDRAWALS: u8 = 5;
const KEY_AUX_DATA_HASH: u8 = 7;
const KEY_VOTING_PROCEDURES: u8 = 19;

/// Voter kind marker for stake pools in the voting procedures map
const VOTER_POOL: u8 = 4;

/// Anchor attached to a governance vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteAnchor {
    pub url: String,
    pub data_hash: Vec<u8>,
}

/// A single pool vote on a governance action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingProcedure {
    pub pool_key_hash: Vec<u8>,
    pub gov_action_tx_id: Vec<u8>,
    pub gov_action_index: u64,

    /// 0 = no, 1 = yes, 2 = abstain
    pub vote: u8,
    pub anchor: Option<VoteAnchor>,
}

/// A transaction body ready for encoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionBody {
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub fee: u64,
    pub ttl: u64,
    pub certificates: Vec<Certificate>,

    /// (29-byte reward address, amount) pairs
    pub withdrawals: Vec<(Vec<u8>, u64)>,
    pub auxiliary_data_hash: Option<Vec<u8>>,
    pub voting_procedures: Vec<VotingProcedure>,
}

impl<C> Encode<C> for TransactionBody {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let mut keys = 4u64; // inputs, outputs, fee, ttl
        if !self.certificates.is_empty() {
            keys += 1;
        }
        if !self.withdrawals.is_empty() {
            keys += 1;
        }
        if self.auxiliary_data_hash.is_some() {
            keys += 1;
        }
        if !self.voting_procedures.is_empty() {
            keys += 1;
        }
        e.map(keys)?;

        e.u8(KEY_INPUTS)?.array(self.inputs.len() as u64)?;
        for input in &self.inputs {
            input.encode(e, ctx)?;
        }

        e.u8(KEY_OUTPUTS)?.array(self.outputs.len() as u64)?;
        for output in &self.outputs {
            output.encode(e, ctx)?;
        }

        e.u8(KEY_FEE)?.u64(self.fee)?;
        e.u8(KEY_TTL)?.u64(self.ttl)?;

        if !self.certificates.is_empty() {
            e.u8(KEY_CERTIFICATES)?.array(self.certificates.len() as u64)?;
            for cert in &self.certificates {
                cert.encode(e, ctx)?;
            }
        }

        if !self.withdrawals.is_empty() {
            let mut withdrawals = self.withdrawals.clone();
            withdrawals.sort_by(|a, b| a.0.cmp(&b.0));
            e.u8(KEY_WITHDRAWALS)?.map(withdrawals.len() as u64)?;
            for (account, amount) in &withdrawals {
                e.bytes(account)?.u64(*amount)?;
            }
        }

        if let Some(hash) = &self.auxiliary_data_hash {
            e.u8(KEY_AUX_DATA_HASH)?.bytes(hash)?;
        }

        if !self.voting_procedures.is_empty() {
            encode_voting_procedures(&self.voting_procedures, e)?;
        }

        Ok(())
    }
}

fn encode_voting_procedures<W: minicbor::encode::Write>(
    votes: &[VotingProcedure],
    e: &mut Encoder<W>,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    // Group by voter, sort voters and action ids for canonical ordering
    let mut by_voter: BTreeMap<&[u8], BTreeMap<(&[u8], u64), &VotingProcedure>> = BTreeMap::new();
    for vote in votes {
        by_voter
            .entry(&vote.pool_key_hash)
            .or_default()
            .insert((&vote.gov_action_tx_id, vote.gov_action_index), vote);
    }

    e.u8(KEY_VOTING_PROCEDURES)?.map(by_voter.len() as u64)?;
    for (pool, actions) in &by_voter {
        e.array(2)?.u8(VOTER_POOL)?.bytes(pool)?;
        e.map(actions.len() as u64)?;
        for ((tx_id, index), vote) in actions {
            e.array(2)?.bytes(tx_id)?.u64(*index)?;
            e.array(2)?.u8(vote.vote)?;
            match &vote.anchor {
                Some(anchor) => {
                    e.array(2)?.str(&anchor.url)?.bytes(&anchor.data_hash)?;
                }
                None => {
                    e.null()?;
                }
            }
        }
    }
    Ok(())
}

fn decode_voting_procedures(
    d: &mut Decoder,
) -> Result<Vec<VotingProcedure>, minicbor::decode::Error> {
    let voters = d
        .map()?
        .ok_or_else(|| minicbor::decode::Error::message("indefinite voting procedures map"))?;
    let mut votes = Vec::new();
    for _ in 0..voters {
        if d.array()? != Some(2) {
            return Err(minicbor::decode::Error::message("malformed voter"));
        }
        let kind = d.u64()?;
        if kind != VOTER_POOL as u64 {
            return Err(minicbor::decode::Error::message(format!(
                "unsupported voter kind {kind}"
            )));
        }
        let pool_key_hash = d.bytes()?.to_vec();

        let actions = d
            .map()?
            .ok_or_else(|| minicbor::decode::Error::message("indefinite vote map"))?;
        for _ in 0..actions {
            if d.array()? != Some(2) {
                return Err(minicbor::decode::Error::message("malformed action id"));
            }
            let gov_action_tx_id = d.bytes()?.to_vec();
            let gov_action_index = d.u64()?;

            if d.array()? != Some(2) {
                return Err(minicbor::decode::Error::message("malformed vote"));
            }
            let vote = d.u8()?;
            let anchor = if d.datatype()? == Type::Null {
                d.skip()?;
                None
            } else {
                if d.array()? != Some(2) {
                    return Err(minicbor::decode::Error::message("malformed vote anchor"));
                }
                Some(VoteAnchor {
                    url: d.str()?.to_string(),
                    data_hash: d.bytes()?.to_vec(),
                })
            };

            votes.push(VotingProcedure {
                pool_key_hash: pool_key_hash.clone(),
                gov_action_tx_id,
                gov_action_index,
                vote,
                anchor,
            });
        }
    }
    Ok(votes)
}

impl<'b, C> Decode<'b, C> for TransactionBody {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let entries = d
            .map()?
            .ok_or_else(|| minicbor::decode::Error::message("indefinite body map"))?;

        let mut body = TransactionBody::default();
        for _ in 0..entries {
            match d.u8()? {
                KEY_INPUTS => {
                    let n = d.array()?.ok_or_else(|| {
                        minicbor::decode::Error::message("indefinite input array")
                    })?;
                    for _ in 0..n {
                        body.inputs.push(TransactionInput::decode(d, ctx)?);
                    }
                }
                KEY_OUTPUTS => {
                    let n = d.array()?.ok_or_else(|| {
                        minicbor::decode::Error::message("indefinite output array")
                    })?;
                    for _ in 0..n {
                        body.outputs.push(TransactionOutput::decode(d, ctx)?);
                    }
                }
                KEY_FEE => body.fee = d.u64()?,
                KEY_TTL => body.ttl = d.u64()?,
                KEY_CERTIFICATES => {
                    let n = d.array()?.ok_or_else(|| {
                        minicbor::decode::Error::message("indefinite certificate array")
                    })?;
                    for _ in 0..n {
                        body.certificates.push(Certificate::decode(d, ctx)?);
                    }
                }
                KEY_WITHDRAWALS => {
                    let n = d.map()?.ok_or_else(|| {
                        minicbor::decode::Error::message("indefinite withdrawal map")
                    })?;
                    for _ in 0..n {
                        body.withdrawals.push((d.bytes()?.to_vec(), d.u64()?));
                    }
                }
                KEY_AUX_DATA_HASH => body.auxiliary_data_hash = Some(d.bytes()?.to_vec()),
                KEY_VOTING_PROCEDURES => {
                    body.voting_procedures = decode_voting_procedures(d)?;
                }
                // Tolerate body fields we don't construct ourselves
                _ => d.skip()?,
            }
        }
        Ok(body)
    }
}

/// Encode a body to its canonical bytes
pub fn encode_transaction_body(body: &TransactionBody) -> anyhow::Result<Vec<u8>> {
    Ok(minicbor::to_vec(body)?)
}

/// Decode body bytes
pub fn decode_transaction_body(bytes: &[u8]) -> anyhow::Result<TransactionBody> {
    Ok(minicbor::decode(bytes)?)
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use tekton_common::Credential;

    fn simple_body() -> TransactionBody {
        TransactionBody {
            inputs: vec![TransactionInput {
                tx_hash: vec![0x2f; 32],
                index: 0,
            }],
            outputs: vec![TransactionOutput {
                address: vec![0x61; 29],
                value: Value::coin_only(9_830_000),
            }],
            fee: 170_000,
            ttl: 0,
            ..Default::default()
        }
    }

    #[test]
    fn zero_ttl_is_explicit() {
        let bytes = encode_transaction_body(&simple_body()).unwrap();
        // Map of 4 entries, ending with key 3 -> 0
        assert_eq!(bytes[0], 0xa4);
        assert_eq!(&bytes[bytes.len() - 2..], &[0x03, 0x00]);

        let decoded = decode_transaction_body(&bytes).unwrap();
        assert_eq!(decoded.ttl, 0);
    }

    #[test]
    fn ttl_changes_size_by_uint_length_only() {
        let zero = encode_transaction_body(&simple_body()).unwrap();

        let mut body = simple_body();
        body.ttl = 1000; // needs a 2-byte uint payload after the 0x19 header
        let nonzero = encode_transaction_body(&body).unwrap();

        assert_eq!(nonzero.len(), zero.len() + 2);
    }

    #[test]
    fn body_round_trip_with_all_sections() {
        let mut body = simple_body();
        body.ttl = 43_000_000;
        body.certificates = vec![Certificate::StakeRegistration(Credential::AddrKeyHash(
            vec![0x11; 28],
        ))];
        body.withdrawals = vec![(vec![0xe1; 29], 1_500_000)];
        body.auxiliary_data_hash = Some(vec![0xab; 32]);
        body.voting_procedures = vec![VotingProcedure {
            pool_key_hash: vec![0x22; 28],
            gov_action_tx_id: vec![0x33; 32],
            gov_action_index: 0,
            vote: 1,
            anchor: None,
        }];

        let bytes = encode_transaction_body(&body).unwrap();
        let decoded = decode_transaction_body(&bytes).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn withdrawals_are_sorted_on_the_wire() {
        let mut body = simple_body();
        body.withdrawals = vec![(vec![0xe2; 29], 2), (vec![0xe1; 29], 1)];
        let bytes = encode_transaction_body(&body).unwrap();
        let decoded = decode_transaction_body(&bytes).unwrap();
        assert_eq!(decoded.withdrawals[0].0, vec![0xe1; 29]);
        assert_eq!(decoded.withdrawals[1].0, vec![0xe2; 29]);
    }

    #[test]
    fn unknown_body_keys_are_skipped() {
        // {0: [], 1: [], 2: 0, 3: 0, 8: 99}
        let bytes = hex::decode("a50080018002000300081863").unwrap();
        let body = decode_transaction_body(&bytes).unwrap();
        assert!(body.inputs.is_empty());
        assert_eq!(body.ttl, 0);
    }
}
