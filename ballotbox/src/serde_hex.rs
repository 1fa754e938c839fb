// Hex encodings for big integers and digests, for use in `#[serde(with)]`
use crate::*;
use num_bigint_dig::BigUint;
use serde::{de, Deserialize, Deserializer, Serializer};

/// Parse a big-endian hex string into a BigUint
pub fn biguint_from_hex(s: &str) -> Result<BigUint, Error> {
    let bytes = hex::decode(s.trim()).map_err(|_| Error::BadHex)?;
    if bytes.is_empty() {
        return Err(Error::BadHex);
    }
    Ok(BigUint::from_bytes_be(&bytes))
}

pub fn biguint_to_hex(value: &BigUint) -> String {
    hex::encode(value.to_bytes_be())
}

// a single-purpose module for use in `#[serde(with)]`
pub mod biguint_hex {
    use super::*;

    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&biguint_to_hex(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        biguint_from_hex(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_hex() {
        assert!(biguint_from_hex("zz").is_err());
        assert!(biguint_from_hex("").is_err());
        assert!(biguint_from_hex("abc").is_err());
    }

    #[test]
    fn leading_zeroes_are_dropped() {
        let value = biguint_from_hex("0001ff").unwrap();
        assert_eq!(value, BigUint::from(511u32));
        assert_eq!(biguint_to_hex(&value), "01ff");
    }
}
