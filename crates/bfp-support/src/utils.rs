use crate::constants::DIGEST_LEN;
use crate::error::{BfpError, Result};

/// Big-endian, zero-padded encoding of `value` in exactly `width` bytes.
pub fn int_to_fixed_bytes(field: &'static str, value: u64, width: usize) -> Result<Vec<u8>> {
    let bytes = value.to_be_bytes();
    let start = bytes.len() - width;
    if bytes[..start].iter().any(|b| *b != 0) {
        return Err(BfpError::field(
            field,
            format!("{value} does not fit in {width} byte(s)"),
        ));
    }
    Ok(bytes[start..].to_vec())
}

/// Reads a big-endian unsigned integer of up to eight bytes.
pub fn int_from_be_bytes(field: &'static str, bytes: &[u8]) -> Result<u64> {
    if bytes.len() > 8 {
        return Err(BfpError::invalid_script(format!(
            "{field} is {} bytes wide",
            bytes.len()
        )));
    }
    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Parses a 64 character hex digest.
pub fn digest_from_hex(field: &'static str, s: &str) -> Result<[u8; DIGEST_LEN]> {
    if s.len() != DIGEST_LEN * 2 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(BfpError::field(
            field,
            "must be provided as a 64 character hex string",
        ));
    }
    let mut out = [0u8; DIGEST_LEN];
    hex::decode_to_slice(s, &mut out).map_err(|e| BfpError::field(field, e.to_string()))?;
    Ok(out)
}

pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

pub mod hex_opt_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => serializer.serialize_some(&hex::encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = <Option<String>>::deserialize(deserializer)?;
        s.map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

pub mod hex_opt_digest {
    use crate::constants::DIGEST_LEN;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(digest: &Option<[u8; DIGEST_LEN]>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match digest {
            Some(d) => serializer.serialize_some(&hex::encode(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<[u8; DIGEST_LEN]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = <Option<String>>::deserialize(deserializer)?;
        s.map(|s| {
            let mut out = [0u8; DIGEST_LEN];
            hex::decode_to_slice(&s, &mut out).map_err(serde::de::Error::custom)?;
            Ok(out)
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_padding() {
        assert_eq!(int_to_fixed_bytes("file_size", 5, 2).unwrap(), vec![0, 5]);
        assert_eq!(int_to_fixed_bytes("file_size", 0x1234, 2).unwrap(), vec![0x12, 0x34]);
        assert_eq!(int_to_fixed_bytes("chunk_count", 255, 1).unwrap(), vec![255]);
    }

    #[test]
    fn test_fixed_width_overflow() {
        let err = int_to_fixed_bytes("chunk_count", 256, 1).unwrap_err();
        assert!(matches!(err, BfpError::FieldValidation { field: "chunk_count", .. }));
        assert!(int_to_fixed_bytes("file_size", 65536, 2).is_err());
    }

    #[test]
    fn test_int_from_be_bytes() {
        assert_eq!(int_from_be_bytes("file_size", &[]).unwrap(), 0);
        assert_eq!(int_from_be_bytes("file_size", &[0x01, 0x00]).unwrap(), 256);
        assert!(int_from_be_bytes("file_size", &[1; 9]).is_err());
    }

    #[test]
    fn test_digest_from_hex() {
        let hex = "ab".repeat(32);
        assert_eq!(digest_from_hex("file_sha256", &hex).unwrap(), [0xab; 32]);

        let non_hex = "zz".repeat(32);
        assert!(matches!(
            digest_from_hex("file_sha256", &non_hex),
            Err(BfpError::FieldValidation { field: "file_sha256", .. })
        ));
        assert!(digest_from_hex("file_sha256", "abcd").is_err());
    }
}
