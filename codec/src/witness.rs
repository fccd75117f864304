//! Witness set codec and signed transaction assembly

use crate::body::TransactionBody;
use anyhow::{Result, anyhow, bail};
use minicbor::data::Type;
use minicbor::{Decode, Decoder, Encode, Encoder};

const KEY_VKEY_WITNESSES: u8 = 0;
const KEY_BOOTSTRAP_WITNESSES: u8 = 2;

/// A Shelley-era key witness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VKeyWitness {
    pub vkey: Vec<u8>,
    pub signature: Vec<u8>,
}

/// A Byron-era bootstrap witness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapWitness {
    pub vkey: Vec<u8>,
    pub signature: Vec<u8>,
    pub chain_code: Vec<u8>,

    /// Address attributes, carried verbatim from the Byron address payload
    pub attributes: Vec<u8>,
}

/// The witness set of a signed transaction - empty groups are omitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WitnessSet {
    pub vkey_witnesses: Vec<VKeyWitness>,
    pub bootstrap_witnesses: Vec<BootstrapWitness>,
}

impl WitnessSet {
    pub fn is_empty(&self) -> bool {
        self.vkey_witnesses.is_empty() && self.bootstrap_witnesses.is_empty()
    }
}

impl<C> Encode<C> for VKeyWitness {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?.bytes(&self.vkey)?.bytes(&self.signature)?;
        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for VKeyWitness {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        if d.array()? != Some(2) {
            return Err(minicbor::decode::Error::message("malformed vkey witness"));
        }
        Ok(Self {
            vkey: d.bytes()?.to_vec(),
            signature: d.bytes()?.to_vec(),
        })
    }
}

impl<C> Encode<C> for BootstrapWitness {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(4)?
            .bytes(&self.vkey)?
            .bytes(&self.signature)?
            .bytes(&self.chain_code)?
            .bytes(&self.attributes)?;
        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for BootstrapWitness {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        if d.array()? != Some(4) {
            return Err(minicbor::decode::Error::message(
                "malformed bootstrap witness",
            ));
        }
        Ok(Self {
            vkey: d.bytes()?.to_vec(),
            signature: d.bytes()?.to_vec(),
            chain_code: d.bytes()?.to_vec(),
            attributes: d.bytes()?.to_vec(),
        })
    }
}

impl<C> Encode<C> for WitnessSet {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let mut keys = 0u64;
        if !self.vkey_witnesses.is_empty() {
            keys += 1;
        }
        if !self.bootstrap_witnesses.is_empty() {
            keys += 1;
        }
        e.map(keys)?;

        if !self.vkey_witnesses.is_empty() {
            e.u8(KEY_VKEY_WITNESSES)?.array(self.vkey_witnesses.len() as u64)?;
            for witness in &self.vkey_witnesses {
                witness.encode(e, ctx)?;
            }
        }

        if !self.bootstrap_witnesses.is_empty() {
            e.u8(KEY_BOOTSTRAP_WITNESSES)?.array(self.bootstrap_witnesses.len() as u64)?;
            for witness in &self.bootstrap_witnesses {
                witness.encode(e, ctx)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for WitnessSet {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let entries = d
            .map()?
            .ok_or_else(|| minicbor::decode::Error::message("indefinite witness set map"))?;
        let mut set = WitnessSet::default();
        for _ in 0..entries {
            match d.u8()? {
                KEY_VKEY_WITNESSES => {
                    let n = d.array()?.ok_or_else(|| {
                        minicbor::decode::Error::message("indefinite vkey witness array")
                    })?;
                    for _ in 0..n {
                        set.vkey_witnesses.push(VKeyWitness::decode(d, ctx)?);
                    }
                }
                KEY_BOOTSTRAP_WITNESSES => {
                    let n = d.array()?.ok_or_else(|| {
                        minicbor::decode::Error::message("indefinite bootstrap witness array")
                    })?;
                    for _ in 0..n {
                        set.bootstrap_witnesses.push(BootstrapWitness::decode(d, ctx)?);
                    }
                }
                // Script and datum witness groups are not our concern
                _ => d.skip()?,
            }
        }
        Ok(set)
    }
}

/// A decoded signed transaction, keeping the raw body byte span so hashes
/// computed over it match the original signing hash exactly
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub body: TransactionBody,
    pub body_bytes: Vec<u8>,
    pub witness_set: WitnessSet,
    pub auxiliary_data: Option<Vec<u8>>,
}

/// Assemble a signed transaction, splicing the unsigned body bytes in
/// verbatim rather than re-encoding them
pub fn encode_signed_transaction(
    body_bytes: &[u8],
    witness_set: &WitnessSet,
    auxiliary_data: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut e = Encoder::new(&mut buf);
    e.array(4)?;
    e.writer_mut().extend_from_slice(body_bytes);
    witness_set.encode(&mut e, &mut ())?;
    e.bool(true)?;
    match auxiliary_data {
        Some(bytes) => {
            e.writer_mut().extend_from_slice(bytes);
        }
        None => {
            e.null()?;
        }
    }
    Ok(buf)
}

/// Decode a signed transaction wrapper
pub fn decode_signed_transaction(bytes: &[u8]) -> Result<SignedTransaction> {
    let mut d = Decoder::new(bytes);
    let len = d.array()?.ok_or_else(|| anyhow!("indefinite transaction array"))?;
    if len != 4 {
        bail!("expected 4-element signed transaction, got {len} elements");
    }

    let body_start = d.position();
    let body: TransactionBody = d.decode()?;
    let body_end = d.position();

    let witness_set: WitnessSet = d.decode()?;
    let _is_valid = d.bool()?;

    let auxiliary_data = if d.datatype()? == Type::Null {
        d.skip()?;
        None
    } else {
        let aux_start = d.position();
        d.skip()?;
        Some(bytes[aux_start..d.position()].to_vec())
    };

    Ok(SignedTransaction {
        body,
        body_bytes: bytes[body_start..body_end].to_vec(),
        witness_set,
        auxiliary_data,
    })
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::encode_transaction_body;
    use crate::value::{TransactionInput, TransactionOutput, Value};

    fn test_body_bytes() -> Vec<u8> {
        encode_transaction_body(&TransactionBody {
            inputs: vec![TransactionInput {
                tx_hash: vec![0x2f; 32],
                index: 0,
            }],
            outputs: vec![TransactionOutput {
                address: vec![0x61; 29],
                value: Value::coin_only(9_830_000),
            }],
            fee: 170_000,
            ttl: 1000,
            ..Default::default()
        })
        .unwrap()
    }

    fn vkey_witness() -> VKeyWitness {
        VKeyWitness {
            vkey: vec![0u8; 32],
            signature: vec![0u8; 64],
        }
    }

    #[test]
    fn empty_groups_are_omitted() {
        let set = WitnessSet {
            vkey_witnesses: vec![vkey_witness()],
            bootstrap_witnesses: vec![],
        };
        let bytes = minicbor::to_vec(&set).unwrap();
        assert_eq!(&bytes[..2], &[0xa1, 0x00]); // map(1), key 0

        let decoded: WitnessSet = minicbor::decode(&bytes).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn bootstrap_witnesses_round_trip() {
        let set = WitnessSet {
            vkey_witnesses: vec![],
            bootstrap_witnesses: vec![BootstrapWitness {
                vkey: vec![1u8; 32],
                signature: vec![2u8; 64],
                chain_code: vec![3u8; 32],
                attributes: vec![0xa0],
            }],
        };
        let bytes = minicbor::to_vec(&set).unwrap();
        assert_eq!(&bytes[..2], &[0xa1, 0x02]); // map(1), key 2

        let decoded: WitnessSet = minicbor::decode(&bytes).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn signed_transaction_keeps_body_bytes() {
        let body_bytes = test_body_bytes();
        let set = WitnessSet {
            vkey_witnesses: vec![vkey_witness()],
            bootstrap_witnesses: vec![],
        };

        let signed = encode_signed_transaction(&body_bytes, &set, None).unwrap();
        assert_eq!(signed[0], 0x84);

        let decoded = decode_signed_transaction(&signed).unwrap();
        assert_eq!(decoded.body_bytes, body_bytes);
        assert_eq!(decoded.witness_set, set);
        assert!(decoded.auxiliary_data.is_none());
        assert_eq!(decoded.body.fee, 170_000);
    }

    #[test]
    fn signed_transaction_carries_auxiliary_data() {
        let body_bytes = test_body_bytes();

        // [{}, null] shaped filler; any valid CBOR item works
        let aux = vec![0x82, 0xa0, 0xf6];
        let signed =
            encode_signed_transaction(&body_bytes, &WitnessSet::default(), Some(&aux)).unwrap();
        let decoded = decode_signed_transaction(&signed).unwrap();
        assert_eq!(decoded.auxiliary_data, Some(aux));
    }

    #[test]
    fn rejects_wrong_arity() {
        // array(2) [ 0, 0 ]
        assert!(decode_signed_transaction(&[0x82, 0x00, 0x00]).is_err());
    }
}
