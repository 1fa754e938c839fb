use crate::*;
use num_bigint_dig::BigUint;
use std::fmt;
use std::str::FromStr;

/// `H(m) * r^e mod n`, sent by the voter to the authority
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BlindedToken(#[serde(with = "biguint_hex")] pub BigUint);

/// `token^d mod n`, returned by the authority
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BlindSignature(#[serde(with = "biguint_hex")] pub BigUint);

/// An unblinded RSA signature over `H(voteMessage)`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature(#[serde(with = "biguint_hex")] pub BigUint);

macro_rules! hex_newtype {
    ($name:ident, $err:expr) => {
        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                biguint_from_hex(s).map($name).map_err(|_| $err)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", biguint_to_hex(&self.0))
            }
        }
    };
}

hex_newtype!(BlindedToken, Error::MalformedToken);
hex_newtype!(BlindSignature, Error::BadHex);

// A signature that doesn't parse is reported exactly like one that doesn't verify
hex_newtype!(Signature, Error::InvalidSignature);
