//! Small CBOR helpers

/// Encoded length in bytes of a CBOR unsigned integer, header included
pub fn cbor_uint_len(value: u64) -> u64 {
    match value {
        0..=23 => 1,
        24..=0xff => 2,
        0x100..=0xffff => 3,
        0x10000..=0xffff_ffff => 5,
        _ => 9,
    }
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_lengths() {
        assert_eq!(cbor_uint_len(0), 1);
        assert_eq!(cbor_uint_len(23), 1);
        assert_eq!(cbor_uint_len(24), 2);
        assert_eq!(cbor_uint_len(255), 2);
        assert_eq!(cbor_uint_len(1000), 3);
        assert_eq!(cbor_uint_len(43_000_000), 5);
        assert_eq!(cbor_uint_len(u64::MAX), 9);
    }
}
