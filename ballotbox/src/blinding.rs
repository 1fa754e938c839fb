//! Voter-side blinding transform.
//!
//! The voter hashes their vote message to an integer modulo `n`, multiplies
//! it by `r^e` for a random `r`, and sends only the product to the
//! authority. The signature that comes back is `H(m)^d * r`, so multiplying
//! by `r^-1` leaves a plain RSA signature on `H(m)` that the authority has
//! never seen.

use crate::*;
use num_bigint_dig::{BigUint, ModInverse, RandBigInt};
use num_traits::{One, Zero};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

const FDH_DOMAIN: &[u8] = b"ballotbox-vote-fdh-v1";

/// Full-domain hash of `message` into the range `0..n`
pub fn hash_message(public_key: &AuthorityPublicKey, message: &[u8]) -> BigUint {
    let len = public_key.size();
    let mut expanded = Vec::with_capacity(len + 32);
    let mut counter: u32 = 0;
    while expanded.len() < len {
        let mut hasher = Sha256::new();
        hasher.update(FDH_DOMAIN);
        hasher.update(counter.to_be_bytes());
        hasher.update(message);
        expanded.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    expanded.truncate(len);

    BigUint::from_bytes_be(&expanded) % &public_key.n
}

/// The secret `r` used to blind one vote message.
///
/// Must never leave the voter's client. It is consumed by `unblind` and
/// zeroed when dropped, since anyone holding it could link the blinded
/// request to the final signature.
pub struct BlindingFactor {
    r: BigUint,
    r_inv: BigUint,
}

impl Drop for BlindingFactor {
    fn drop(&mut self) {
        self.r.zeroize();
        self.r_inv.zeroize();
    }
}

/// Blind `vote_message` for submission to the authority.
///
/// Returns the token to send and the factor to keep.
pub fn blind(
    vote_message: &[u8],
    public_key: &AuthorityPublicKey,
) -> Result<(BlindedToken, BlindingFactor), Error> {
    let mut csprng = rand::rngs::OsRng;
    blind_with_rng(&mut csprng, vote_message, public_key)
}

pub(crate) fn blind_with_rng<R: rand::RngCore + rand::CryptoRng>(
    rng: &mut R,
    vote_message: &[u8],
    public_key: &AuthorityPublicKey,
) -> Result<(BlindedToken, BlindingFactor), Error> {
    let n = &public_key.n;
    let hashed = hash_message(public_key, vote_message);

    // Pick r coprime to n; for a real modulus the first draw almost always works
    let factor = loop {
        let mut r = rng.gen_biguint_below(n);
        if r.is_zero() || r.is_one() {
            continue;
        }
        let inverse = r.clone().mod_inverse(n).and_then(|inv| inv.to_biguint());
        match inverse {
            Some(r_inv) => break BlindingFactor { r, r_inv },
            None => r.zeroize(),
        }
    };

    let mut r_e = factor.r.modpow(&public_key.e, n);
    let blinded = (hashed * &r_e) % n;
    r_e.zeroize();

    Ok((BlindedToken(blinded), factor))
}

/// Remove the blinding factor from the authority's signature.
///
/// Takes the factor by value so it's dropped (and zeroed) here.
pub fn unblind(
    blind_signature: &BlindSignature,
    factor: BlindingFactor,
    public_key: &AuthorityPublicKey,
) -> Signature {
    let n = &public_key.n;
    let unblinded = (&blind_signature.0 * &factor.r_inv) % n;
    Signature(unblinded)
}

/// Check `signature^e mod n == H(vote_message)`
pub fn verify(
    public_key: &AuthorityPublicKey,
    vote_message: &[u8],
    signature: &Signature,
) -> Result<(), Error> {
    if !public_key.in_range(&signature.0) {
        return Err(Error::InvalidSignature);
    }

    let expected = hash_message(public_key, vote_message);
    let recovered = signature.0.modpow(&public_key.e, &public_key.n);
    if recovered == expected {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}

/// Sign `H(vote_message)` directly, without blinding
pub fn sign_direct(key: &SigningKeyMaterial, vote_message: &[u8]) -> Signature {
    let hashed = hash_message(key.public_key(), vote_message);
    Signature(key.sign_raw(&hashed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::test_key;

    #[test]
    fn unblinded_signature_matches_direct_signature() {
        let key = test_key();
        let public = key.public_key();
        let message = b"{\"partyId\":\"green\"}";

        let (token, factor) = blind(message, public).unwrap();
        let blind_sig = BlindSignature(key.sign_raw(&token.0));
        let signature = unblind(&blind_sig, factor, public);

        assert_eq!(signature, sign_direct(key, message));
        verify(public, message, &signature).unwrap();
    }

    #[test]
    fn blinded_token_hides_message_hash() {
        let key = test_key();
        let public = key.public_key();
        let message = b"same message";

        let (first, _f1) = blind(message, public).unwrap();
        let (second, _f2) = blind(message, public).unwrap();

        // Fresh randomness each time, and never the bare hash
        assert_ne!(first, second);
        assert_ne!(first.0, hash_message(public, message));
    }

    #[test]
    fn signature_for_other_message_is_rejected() {
        let key = test_key();
        let public = key.public_key();
        let signature = sign_direct(key, b"vote for A");

        assert!(matches!(
            verify(public, b"vote for B", &signature),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn out_of_range_signature_is_rejected() {
        let public = test_key().public_key();
        let zero = Signature(BigUint::zero());
        let too_big = Signature(&public.n + BigUint::one());

        assert!(verify(public, b"m", &zero).is_err());
        assert!(verify(public, b"m", &too_big).is_err());
    }

    #[test]
    fn hash_is_reduced_mod_n() {
        let public = test_key().public_key();
        for message in [&b""[..], &b"a"[..], &b"a much longer message than the others"[..]].iter() {
            assert!(hash_message(public, message) < public.n);
        }
    }
}
