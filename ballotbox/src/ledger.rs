use crate::*;
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::convert::TryInto;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// SHA-256 digest of a ledger entry
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntryHash(pub [u8; 32]);

impl fmt::Display for EntryHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for EntryHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| Error::BadHex)?;
        let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| Error::BadHex)?;
        Ok(EntryHash(bytes))
    }
}

impl Serialize for EntryHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntryHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EntryHash::from_str(&s).map_err(de::Error::custom)
    }
}

/// The bytes that go into an entry's digest
#[derive(Serialize)]
struct EntryPayload<'a> {
    election_id: Uuid,
    vote_message: &'a str,
    signature: &'a Signature,
    previous_entry_hash: Option<&'a EntryHash>,
}

/// One accepted ballot. Never holds anything about the voter who cast it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BallotEntry {
    /// Position in the election's chain, starting at zero
    pub index: usize,
    pub election_id: Uuid,
    pub vote_message: String,
    pub signature: Signature,

    /// `None` only for the first entry of an election
    pub previous_entry_hash: Option<EntryHash>,
    pub current_entry_hash: EntryHash,
    pub created_at: DateTime<Utc>,
}

impl BallotEntry {
    /// Create an entry chained onto `previous_entry_hash`
    pub fn new(
        index: usize,
        election_id: Uuid,
        vote_message: &str,
        signature: Signature,
        previous_entry_hash: Option<EntryHash>,
    ) -> Result<Self, Error> {
        let current_entry_hash = Self::compute_hash(
            election_id,
            vote_message,
            &signature,
            previous_entry_hash.as_ref(),
        )?;

        Ok(BallotEntry {
            index,
            election_id,
            vote_message: vote_message.to_owned(),
            signature,
            previous_entry_hash,
            current_entry_hash,
            created_at: Utc::now(),
        })
    }

    pub fn compute_hash(
        election_id: Uuid,
        vote_message: &str,
        signature: &Signature,
        previous_entry_hash: Option<&EntryHash>,
    ) -> Result<EntryHash, Error> {
        let payload = EntryPayload {
            election_id,
            vote_message,
            signature,
            previous_entry_hash,
        };
        let serialized = serde_cbor::to_vec(&payload)?;
        let digest = Sha256::digest(&serialized);

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Ok(EntryHash(bytes))
    }

    /// Recompute the digest from the stored fields
    pub fn recompute_hash(&self) -> Result<EntryHash, Error> {
        Self::compute_hash(
            self.election_id,
            &self.vote_message,
            &self.signature,
            self.previous_entry_hash.as_ref(),
        )
    }
}

/// Append-only storage for ballot entries, one hash chain per election
pub trait LedgerStore: Send + Sync {
    /// Append an entry to the election's chain.
    ///
    /// `build` receives the tail's hash (`None` for an empty chain) and the
    /// index the new entry will take. The read of the tail, the call to
    /// `build` and the append happen as one step: no other append to the
    /// same chain can run in between. An entry whose signature is already in
    /// the chain is rejected with `DuplicateBallot`.
    ///
    /// `commit` runs once the entry has passed those checks and before it is
    /// stored. If it fails, nothing is appended.
    fn append<F, C, T>(
        &self,
        election_id: Uuid,
        build: F,
        commit: C,
    ) -> Result<(BallotEntry, T), Error>
    where
        F: FnOnce(Option<&EntryHash>, usize) -> Result<BallotEntry, Error>,
        C: FnOnce(&BallotEntry) -> Result<T, Error>;

    /// All entries for an election, in append order
    fn entries(&self, election_id: Uuid) -> Result<Vec<BallotEntry>, Error>;

    /// Number of entries for an election
    fn len(&self, election_id: Uuid) -> Result<usize, Error>;
}

#[derive(Default)]
struct Chain {
    entries: Vec<BallotEntry>,
    signatures: HashSet<Signature>,
}

/// A simple ledger that keeps every chain in memory behind a single lock
#[derive(Default)]
pub struct MemLedger {
    inner: Mutex<HashMap<Uuid, Chain>>,
}

impl LedgerStore for MemLedger {
    fn append<F, C, T>(
        &self,
        election_id: Uuid,
        build: F,
        commit: C,
    ) -> Result<(BallotEntry, T), Error>
    where
        F: FnOnce(Option<&EntryHash>, usize) -> Result<BallotEntry, Error>,
        C: FnOnce(&BallotEntry) -> Result<T, Error>,
    {
        let mut chains = self.inner.lock()?;
        let chain = chains.entry(election_id).or_default();

        let tail = chain.entries.last().map(|e| e.current_entry_hash);
        let index = chain.entries.len();
        let entry = build(tail.as_ref(), index)?;

        if entry.previous_entry_hash != tail || entry.index != index {
            return Err(Error::ChainIntegrityViolation { index });
        }
        if chain.signatures.contains(&entry.signature) {
            return Err(Error::DuplicateBallot);
        }

        let committed = commit(&entry)?;

        chain.signatures.insert(entry.signature.clone());
        chain.entries.push(entry.clone());
        Ok((entry, committed))
    }

    fn entries(&self, election_id: Uuid) -> Result<Vec<BallotEntry>, Error> {
        let chains = self.inner.lock()?;
        Ok(chains
            .get(&election_id)
            .map(|c| c.entries.clone())
            .unwrap_or_default())
    }

    fn len(&self, election_id: Uuid) -> Result<usize, Error> {
        let chains = self.inner.lock()?;
        Ok(chains.get(&election_id).map_or(0, |c| c.entries.len()))
    }
}

/// Load previously persisted entries as-is, without re-checking the chain.
///
/// Use `verify_chain` on the result to audit what was loaded.
impl From<Vec<BallotEntry>> for MemLedger {
    fn from(item: Vec<BallotEntry>) -> Self {
        let mut chains: HashMap<Uuid, Chain> = HashMap::new();
        for entry in item {
            let chain = chains.entry(entry.election_id).or_default();
            chain.signatures.insert(entry.signature.clone());
            chain.entries.push(entry);
        }
        MemLedger {
            inner: Mutex::new(chains),
        }
    }
}

impl<S: LedgerStore> LedgerStore for Arc<S> {
    fn append<F, C, T>(
        &self,
        election_id: Uuid,
        build: F,
        commit: C,
    ) -> Result<(BallotEntry, T), Error>
    where
        F: FnOnce(Option<&EntryHash>, usize) -> Result<BallotEntry, Error>,
        C: FnOnce(&BallotEntry) -> Result<T, Error>,
    {
        (**self).append(election_id, build, commit)
    }

    fn entries(&self, election_id: Uuid) -> Result<Vec<BallotEntry>, Error> {
        (**self).entries(election_id)
    }

    fn len(&self, election_id: Uuid) -> Result<usize, Error> {
        (**self).len(election_id)
    }
}

/// The ballot box: verifies submitted votes, appends them to the ledger and issues receipts.
///
/// Nothing here is keyed by voter identity.
pub struct BallotBox<L: LedgerStore, R: ReceiptStore, N: Notary> {
    public_key: AuthorityPublicKey,
    ledger: L,
    receipts: R,
    notary: N,
}

impl<L: LedgerStore, R: ReceiptStore, N: Notary> BallotBox<L, R, N> {
    pub fn new(public_key: AuthorityPublicKey, ledger: L, receipts: R, notary: N) -> Self {
        BallotBox {
            public_key,
            ledger,
            receipts,
            notary,
        }
    }

    /// Accept a vote and return its receipt code.
    ///
    /// The signature must verify against the authority's key over exactly
    /// `vote_message`, and the message must name `election_id`; there is no
    /// fallback. The entry and its receipt are stored together or not at
    /// all, so a rejected or failed vote leaves no trace in the ledger.
    pub fn submit_vote(
        &self,
        vote_message: &str,
        signature: &Signature,
        election_id: Uuid,
    ) -> Result<String, Error> {
        verify(&self.public_key, vote_message.as_bytes(), signature)?;

        // A signed ballot is only good for the election it names
        match VoteMessage::parse(vote_message) {
            Ok(vote) if vote.election_id == election_id => {}
            _ => {
                debug!(
                    "ballotbox: ballot submitted to election {} it doesn't name",
                    election_id
                );
                return Err(Error::InvalidSignature);
            }
        }

        let (entry, receipt) = self.ledger.append(
            election_id,
            |previous, index| {
                BallotEntry::new(
                    index,
                    election_id,
                    vote_message,
                    signature.clone(),
                    previous.copied(),
                )
            },
            |entry| issue_receipt(&self.receipts, entry),
        )?;

        info!(
            "ballotbox: recorded ballot {} in election {}",
            entry.index, election_id
        );

        // Notarization is best-effort and never affects the vote
        if let Err(e) =
            self.notary
                .notarize(election_id, &entry.current_entry_hash, &receipt.receipt_code)
        {
            warn!(
                "ballotbox: failed to notarize entry {} of election {}: {}",
                entry.index, election_id, e
            );
        }

        Ok(receipt.receipt_code)
    }

    pub fn public_key(&self) -> &AuthorityPublicKey {
        &self.public_key
    }
}
