use crate::*;
use num_bigint_dig::BigUint;
use num_traits::Zero;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use std::path::Path;

pub const DEFAULT_KEY_BITS: usize = 2048;

/// The authority's RSA keypair.
///
/// Generated once and persisted. Regenerating it invalidates every
/// outstanding blinded request and every signature already issued, so the
/// only way to get a fresh key is the explicit `regenerate` call.
///
/// The private half zeroizes itself on drop and is never printed, even by `Debug`.
pub struct SigningKeyMaterial {
    private: RsaPrivateKey,
    public: AuthorityPublicKey,
}

impl SigningKeyMaterial {
    /// Generate a new keypair with a modulus of `bits` bits
    pub fn generate(bits: usize) -> Result<Self, Error> {
        let mut csprng = rand::rngs::OsRng;
        let private = RsaPrivateKey::new(&mut csprng, bits)?;
        Ok(Self::from_private(private))
    }

    /// Replace an existing key. Every outstanding blind signature becomes worthless.
    pub fn regenerate(bits: usize) -> Result<Self, Error> {
        warn!(
            "ballotbox: regenerating authority signing key ({} bits); previously issued signatures will no longer verify",
            bits
        );
        Self::generate(bits)
    }

    fn from_private(private: RsaPrivateKey) -> Self {
        let public = AuthorityPublicKey {
            n: private.n().clone(),
            e: private.e().clone(),
        };
        SigningKeyMaterial { private, public }
    }

    /// Export the private key as PKCS#8 PEM
    pub fn to_pem(&self) -> Result<String, Error> {
        let pem = self.private.to_pkcs8_pem(LineEnding::LF)?;
        Ok(pem.to_string())
    }

    /// Import a private key from PKCS#8 PEM
    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        let private = RsaPrivateKey::from_pkcs8_pem(pem)?;
        private.validate()?;
        Ok(Self::from_private(private))
    }

    /// Load the key stored at `path`, generating and saving one only if no file exists.
    ///
    /// A file that exists but can't be parsed is an error: silently replacing
    /// it would void every signature issued under the old key.
    pub fn load_or_generate<P: AsRef<Path>>(path: P, bits: usize) -> Result<Self, Error> {
        let path = path.as_ref();
        if path.exists() {
            let pem = std::fs::read_to_string(path)?;
            let key = Self::from_pem(&pem).map_err(|e| Error::KeyUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            info!("ballotbox: loaded authority key from {}", path.display());
            return Ok(key);
        }

        info!(
            "ballotbox: no authority key at {}, generating a {}-bit key",
            path.display(),
            bits
        );
        let key = Self::generate(bits)?;
        key.save(path)?;
        Ok(key)
    }

    /// Write the PEM-encoded private key to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let pem = self.to_pem()?;
        std::fs::write(path, pem)?;
        Ok(())
    }

    pub fn public_key(&self) -> &AuthorityPublicKey {
        &self.public
    }

    /// Compute `value^d mod n`
    pub(crate) fn sign_raw(&self, value: &BigUint) -> BigUint {
        value.modpow(self.private.d(), &self.public.n)
    }
}

impl fmt::Debug for SigningKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SigningKeyMaterial")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// The public half of the authority's key, published to voter clients
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthorityPublicKey {
    #[serde(with = "biguint_hex")]
    pub n: BigUint,

    #[serde(with = "biguint_hex")]
    pub e: BigUint,
}

impl AuthorityPublicKey {
    /// Build a public key from its components, rejecting malformed values
    pub fn new(n: BigUint, e: BigUint) -> Result<Self, Error> {
        let checked = RsaPublicKey::new(n, e)?;
        Ok(AuthorityPublicKey {
            n: checked.n().clone(),
            e: checked.e().clone(),
        })
    }

    /// Size of the modulus in bytes
    pub fn size(&self) -> usize {
        (self.n.bits() + 7) / 8
    }

    /// Whether `value` is in the range `1..n`
    pub fn in_range(&self, value: &BigUint) -> bool {
        !value.is_zero() && value < &self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::test_key;

    #[test]
    fn pem_round_trip_keeps_public_key() {
        let key = test_key();
        let pem = key.to_pem().unwrap();
        let loaded = SigningKeyMaterial::from_pem(&pem).unwrap();
        assert_eq!(loaded.public_key(), key.public_key());
    }

    #[test]
    fn debug_does_not_leak_private_exponent() {
        let key = test_key();
        let printed = format!("{:?}", key);
        assert!(!printed.contains(&biguint_to_hex(key.private.d())));
        assert!(!printed.contains(&format!("{}", key.private.d())));
    }

    #[test]
    fn load_or_generate_refuses_corrupt_key_file() {
        let path = std::env::temp_dir().join(format!("ballotbox-corrupt-{}.pem", uuid::Uuid::new_v4()));
        std::fs::write(&path, "not a key").unwrap();

        let result = SigningKeyMaterial::load_or_generate(&path, 512);
        assert!(matches!(result, Err(Error::KeyUnreadable { .. })));

        // The corrupt file must be left alone
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not a key");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_or_generate_reuses_existing_key() {
        let path = std::env::temp_dir().join(format!("ballotbox-key-{}.pem", uuid::Uuid::new_v4()));
        test_key().save(&path).unwrap();

        let loaded = SigningKeyMaterial::load_or_generate(&path, 512).unwrap();
        assert_eq!(loaded.public_key(), test_key().public_key());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn range_check() {
        let public = test_key().public_key();
        assert!(!public.in_range(&BigUint::from(0u32)));
        assert!(public.in_range(&BigUint::from(1u32)));
        assert!(!public.in_range(&public.n));
    }
}
