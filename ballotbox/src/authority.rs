use crate::*;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Marks that a voter has consumed their one authorization for an election.
///
/// Deliberately carries nothing about the vote itself.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityRecord {
    pub voter_id: String,
    pub election_id: Uuid,
}

/// Persistence for eligibility records
pub trait EligibilityStore: Send + Sync {
    /// Atomically insert `record` if absent.
    ///
    /// Returns `Error::AlreadyAuthorized` if the record already exists. Exactly
    /// one of any number of concurrent inserts of the same record succeeds.
    fn insert(&self, record: EligibilityRecord) -> Result<(), Error>;

    /// Whether the voter already holds an authorization for the election
    fn contains(&self, voter_id: &str, election_id: Uuid) -> Result<bool, Error>;

    /// Number of authorizations issued for the election
    fn count(&self, election_id: Uuid) -> Result<usize, Error>;
}

/// A simple eligibility store that keeps records in memory
#[derive(Default)]
pub struct MemEligibilityStore {
    inner: Mutex<HashSet<EligibilityRecord>>,
}

impl EligibilityStore for MemEligibilityStore {
    fn insert(&self, record: EligibilityRecord) -> Result<(), Error> {
        let mut records = self.inner.lock()?;
        if records.insert(record) {
            Ok(())
        } else {
            Err(Error::AlreadyAuthorized)
        }
    }

    fn contains(&self, voter_id: &str, election_id: Uuid) -> Result<bool, Error> {
        let records = self.inner.lock()?;
        let probe = EligibilityRecord {
            voter_id: voter_id.to_owned(),
            election_id,
        };
        Ok(records.contains(&probe))
    }

    fn count(&self, election_id: Uuid) -> Result<usize, Error> {
        let records = self.inner.lock()?;
        Ok(records
            .iter()
            .filter(|r| r.election_id == election_id)
            .count())
    }
}

impl From<Vec<EligibilityRecord>> for MemEligibilityStore {
    fn from(item: Vec<EligibilityRecord>) -> Self {
        MemEligibilityStore {
            inner: Mutex::new(item.into_iter().collect()),
        }
    }
}

impl<S: EligibilityStore + ?Sized> EligibilityStore for Arc<S> {
    fn insert(&self, record: EligibilityRecord) -> Result<(), Error> {
        (**self).insert(record)
    }

    fn contains(&self, voter_id: &str, election_id: Uuid) -> Result<bool, Error> {
        (**self).contains(voter_id, election_id)
    }

    fn count(&self, election_id: Uuid) -> Result<usize, Error> {
        (**self).count(election_id)
    }
}

/// The authorization authority.
///
/// Signs blinded tokens, at most once per voter per election. It never sees
/// vote content: the decision depends only on `(voter, election)`.
pub struct Authority<E: EligibilityStore> {
    key: Arc<SigningKeyMaterial>,
    eligibility: E,
}

impl<E: EligibilityStore> Authority<E> {
    pub fn new(key: Arc<SigningKeyMaterial>, eligibility: E) -> Self {
        Authority { key, eligibility }
    }

    pub fn public_key(&self) -> &AuthorityPublicKey {
        self.key.public_key()
    }

    /// Record the voter's eligibility and sign their blinded token.
    ///
    /// Fails with `AlreadyAuthorized` without signing anything if the voter
    /// has already been authorized for this election. Once this returns the
    /// authorization is spent even if the voter never submits a vote.
    pub fn issue_blind_signature(
        &self,
        voter_id: &str,
        election_id: Uuid,
        blinded_token: &BlindedToken,
    ) -> Result<BlindSignature, Error> {
        // Reject garbage before spending the voter's authorization on it
        if !self.key.public_key().in_range(&blinded_token.0) {
            return Err(Error::MalformedToken);
        }

        let record = EligibilityRecord {
            voter_id: voter_id.to_owned(),
            election_id,
        };
        if let Err(e) = self.eligibility.insert(record) {
            if let Error::AlreadyAuthorized = e {
                info!(
                    "ballotbox: refused repeat authorization for election {}",
                    election_id
                );
            }
            return Err(e);
        }

        let signed = self.key.sign_raw(&blinded_token.0);
        debug!("ballotbox: issued blind signature for election {}", election_id);

        Ok(BlindSignature(signed))
    }

    /// Whether the voter has already been authorized (the "already voted" flag)
    pub fn has_authorization(&self, voter_id: &str, election_id: Uuid) -> Result<bool, Error> {
        self.eligibility.contains(voter_id, election_id)
    }

    pub fn authorizations_issued(&self, election_id: Uuid) -> Result<usize, Error> {
        self.eligibility.count(election_id)
    }

    pub fn eligibility(&self) -> &E {
        &self.eligibility
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::shared_test_key;
    use num_bigint_dig::BigUint;

    fn authority() -> Authority<MemEligibilityStore> {
        Authority::new(shared_test_key(), MemEligibilityStore::default())
    }

    #[test]
    fn second_request_is_refused() {
        let authority = authority();
        let election_id = Uuid::new_v4();
        let public = authority.public_key().clone();

        let (token, _factor) = blind(b"ballot one", &public).unwrap();
        authority
            .issue_blind_signature("voter-1", election_id, &token)
            .unwrap();

        let (token, _factor) = blind(b"ballot two", &public).unwrap();
        let second = authority.issue_blind_signature("voter-1", election_id, &token);
        assert!(matches!(second, Err(Error::AlreadyAuthorized)));
        assert_eq!(authority.authorizations_issued(election_id).unwrap(), 1);
    }

    #[test]
    fn eligibility_is_per_election() {
        let authority = authority();
        let public = authority.public_key().clone();
        let (token, _factor) = blind(b"ballot", &public).unwrap();

        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        authority.issue_blind_signature("voter-1", first, &token).unwrap();
        authority.issue_blind_signature("voter-1", second, &token).unwrap();

        assert!(authority.has_authorization("voter-1", first).unwrap());
        assert!(!authority.has_authorization("voter-2", first).unwrap());
    }

    #[test]
    fn malformed_token_does_not_consume_eligibility() {
        let authority = authority();
        let election_id = Uuid::new_v4();
        let too_big = BlindedToken(&authority.public_key().n + BigUint::from(1u32));

        let result = authority.issue_blind_signature("voter-1", election_id, &too_big);
        assert!(matches!(result, Err(Error::MalformedToken)));
        assert!(!authority.has_authorization("voter-1", election_id).unwrap());
    }

    #[test]
    fn store_loads_existing_records() {
        let election_id = Uuid::new_v4();
        let records = vec![
            EligibilityRecord {
                voter_id: "a".into(),
                election_id,
            },
            EligibilityRecord {
                voter_id: "b".into(),
                election_id,
            },
        ];

        let store = MemEligibilityStore::from(records);
        assert_eq!(store.count(election_id).unwrap(), 2);
        assert!(store.contains("a", election_id).unwrap());
        assert!(matches!(
            store.insert(EligibilityRecord {
                voter_id: "b".into(),
                election_id,
            }),
            Err(Error::AlreadyAuthorized)
        ));
    }
}
