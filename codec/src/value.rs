//! Transaction inputs, outputs and multi-asset values

use minicbor::data::Type;
use minicbor::{Decode, Decoder, Encode, Encoder};

/// Reference to a UTxO being spent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInput {
    pub tx_hash: Vec<u8>,
    pub index: u64,
}

impl<C> Encode<C> for TransactionInput {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?.bytes(&self.tx_hash)?.u64(self.index)?;
        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for TransactionInput {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        if d.array()? != Some(2) {
            return Err(minicbor::decode::Error::message(
                "expected 2-element input array",
            ));
        }
        Ok(Self {
            tx_hash: d.bytes()?.to_vec(),
            index: d.u64()?,
        })
    }
}

/// All assets under one policy id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyAssets {
    pub policy_id: Vec<u8>,

    /// (asset name, amount) pairs
    pub assets: Vec<(Vec<u8>, u64)>,
}

/// Output value - plain coin, or coin plus a multi-asset bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub coin: u64,
    pub assets: Vec<PolicyAssets>,
}

impl Value {
    pub fn coin_only(coin: u64) -> Self {
        Self {
            coin,
            assets: Vec::new(),
        }
    }
}

impl<C> Encode<C> for Value {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if self.assets.is_empty() {
            e.u64(self.coin)?;
            return Ok(());
        }

        // Canonical form needs both map levels sorted bytewise
        let mut policies = self.assets.clone();
        policies.sort_by(|a, b| a.policy_id.cmp(&b.policy_id));

        e.array(2)?.u64(self.coin)?;
        e.map(policies.len() as u64)?;
        for policy in &policies {
            e.bytes(&policy.policy_id)?;
            let mut assets = policy.assets.clone();
            assets.sort_by(|a, b| a.0.cmp(&b.0));
            e.map(assets.len() as u64)?;
            for (name, amount) in &assets {
                e.bytes(name)?.u64(*amount)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for Value {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            Type::U8 | Type::U16 | Type::U32 | Type::U64 => Ok(Value::coin_only(d.u64()?)),
            Type::Array => {
                if d.array()? != Some(2) {
                    return Err(minicbor::decode::Error::message(
                        "expected [coin, multiasset] value",
                    ));
                }
                let coin = d.u64()?;
                let n = d
                    .map()?
                    .ok_or_else(|| minicbor::decode::Error::message("indefinite multiasset map"))?;
                let mut assets = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    let policy_id = d.bytes()?.to_vec();
                    let m = d.map()?.ok_or_else(|| {
                        minicbor::decode::Error::message("indefinite asset map")
                    })?;
                    let mut names = Vec::with_capacity(m as usize);
                    for _ in 0..m {
                        names.push((d.bytes()?.to_vec(), d.u64()?));
                    }
                    assets.push(PolicyAssets {
                        policy_id,
                        assets: names,
                    });
                }
                Ok(Value { coin, assets })
            }
            t => Err(minicbor::decode::Error::message(format!(
                "unexpected value type {t}"
            ))),
        }
    }
}

/// A transaction output - address bytes plus value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutput {
    pub address: Vec<u8>,
    pub value: Value,
}

impl<C> Encode<C> for TransactionOutput {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?.bytes(&self.address)?;
        self.value.encode(e, ctx)
    }
}

impl<'b, C> Decode<'b, C> for TransactionOutput {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        if d.array()? != Some(2) {
            return Err(minicbor::decode::Error::message(
                "expected 2-element output array",
            ));
        }
        Ok(Self {
            address: d.bytes()?.to_vec(),
            value: Value::decode(d, ctx)?,
        })
    }
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T>(value: &T) -> T
    where
        T: for<'b> Decode<'b, ()> + Encode<()> + PartialEq + std::fmt::Debug,
    {
        let bytes = minicbor::to_vec(value).unwrap();
        minicbor::decode(&bytes).unwrap()
    }

    #[test]
    fn input_encoding() {
        let input = TransactionInput {
            tx_hash: vec![0x2f; 32],
            index: 1,
        };
        let bytes = minicbor::to_vec(&input).unwrap();
        // array(2), bytes(32), uint 1
        assert_eq!(bytes[0], 0x82);
        assert_eq!(bytes[1], 0x58);
        assert_eq!(bytes[2], 0x20);
        assert_eq!(*bytes.last().unwrap(), 0x01);
        assert_eq!(round_trip(&input), input);
    }

    #[test]
    fn plain_coin_value_is_a_bare_uint() {
        let value = Value::coin_only(9_830_000);
        let bytes = minicbor::to_vec(&value).unwrap();
        assert_eq!(bytes[0], 0x1a); // uint32 follows
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn multiasset_value_sorts_policies() {
        let value = Value {
            coin: 2_000_000,
            assets: vec![
                PolicyAssets {
                    policy_id: vec![0xbb; 28],
                    assets: vec![(b"tokB".to_vec(), 5)],
                },
                PolicyAssets {
                    policy_id: vec![0xaa; 28],
                    assets: vec![(b"tokA2".to_vec(), 2), (b"tokA1".to_vec(), 1)],
                },
            ],
        };
        let bytes = minicbor::to_vec(&value).unwrap();
        let decoded: Value = minicbor::decode(&bytes).unwrap();

        // Decoder preserves wire order, which must be sorted
        assert_eq!(decoded.assets[0].policy_id, vec![0xaa; 28]);
        assert_eq!(decoded.assets[0].assets[0].0, b"tokA1".to_vec());
        assert_eq!(decoded.assets[1].policy_id, vec![0xbb; 28]);
    }

    #[test]
    fn output_round_trip() {
        let output = TransactionOutput {
            address: vec![0x61; 29],
            value: Value::coin_only(42),
        };
        assert_eq!(round_trip(&output), output);
    }
}
