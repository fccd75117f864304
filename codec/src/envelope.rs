//! Extra-data envelope codec
//!
//! Unsigned and signed transactions travel between construction steps as a
//! hex string of `[inner_hex, {"operations": ..., "transactionMetadataHex":
//! ...}]`, keeping the original operation list available for parsing. The
//! envelope is produced and consumed only by this engine; the operation
//! list is carried as a JSON text string.

use anyhow::{Result, anyhow, bail};
use minicbor::{Decoder, Encoder};
use tekton_common::operations::Operation;

const OPERATIONS_KEY: &str = "operations";
const METADATA_HEX_KEY: &str = "transactionMetadataHex";

/// Out-of-band data carried next to the native transaction bytes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionExtraData {
    pub operations: Vec<Operation>,
    pub transaction_metadata_hex: Option<String>,
}

/// Wrap transaction bytes (as hex) and extra data into an envelope hex string
pub fn encode_envelope(inner_hex: &str, extra: &TransactionExtraData) -> Result<String> {
    let operations_json = serde_json::to_string(&extra.operations)?;

    let mut buf = Vec::new();
    let mut e = Encoder::new(&mut buf);
    e.array(2)?.str(inner_hex)?;

    let keys = 1 + extra.transaction_metadata_hex.is_some() as u64;
    e.map(keys)?;
    e.str(OPERATIONS_KEY)?.str(&operations_json)?;
    if let Some(metadata_hex) = &extra.transaction_metadata_hex {
        e.str(METADATA_HEX_KEY)?.str(metadata_hex)?;
    }

    Ok(hex::encode(buf))
}

/// Unwrap an envelope hex string into the inner transaction hex and extra data
pub fn decode_envelope(envelope_hex: &str) -> Result<(String, TransactionExtraData)> {
    let bytes = hex::decode(envelope_hex)?;
    let mut d = Decoder::new(&bytes);

    let len = d.array()?.ok_or_else(|| anyhow!("indefinite envelope array"))?;
    if len != 2 {
        bail!("expected 2-element envelope, got {len} elements");
    }
    let inner_hex = d.str()?.to_string();

    let entries = d.map()?.ok_or_else(|| anyhow!("indefinite extra data map"))?;
    let mut extra = TransactionExtraData::default();
    for _ in 0..entries {
        match d.str()? {
            OPERATIONS_KEY => extra.operations = serde_json::from_str(d.str()?)?,
            METADATA_HEX_KEY => extra.transaction_metadata_hex = Some(d.str()?.to_string()),
            _ => d.skip()?,
        }
    }

    Ok((inner_hex, extra))
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;
    use tekton_common::operations::{AccountIdentifier, Amount, OperationType};

    #[test]
    fn envelope_round_trip() {
        let mut op = Operation::new(0, OperationType::Output);
        op.account = Some(AccountIdentifier {
            address: "addr1vx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzers66hrl8".into(),
        });
        op.amount = Some(Amount::ada(9_830_000));

        let extra = TransactionExtraData {
            operations: vec![op],
            transaction_metadata_hex: Some("82a0f6".into()),
        };

        let envelope = encode_envelope("a40080018002000300", &extra).unwrap();
        let (inner, decoded) = decode_envelope(&envelope).unwrap();
        assert_eq!(inner, "a40080018002000300");
        assert_eq!(decoded, extra);
    }

    #[test]
    fn metadata_key_is_optional() {
        let extra = TransactionExtraData::default();
        let envelope = encode_envelope("00", &extra).unwrap();
        let (_, decoded) = decode_envelope(&envelope).unwrap();
        assert!(decoded.transaction_metadata_hex.is_none());
        assert!(decoded.operations.is_empty());
    }

    #[test]
    fn rejects_non_hex() {
        assert!(decode_envelope("zz").is_err());
    }
}
