use crate::*;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rand::seq::SliceRandom;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Words used to make receipt codes easier to read out
pub const RECEIPT_WORDS: &[&str] = &[
    "ROCKET", "APPLE", "TIGER", "OCEAN", "SUN", "MOON", "CEDAR", "FALCON", "HARBOR", "EMBER",
    "MAPLE", "COMET",
];

/// Proof that a ballot was recorded. Holds nothing about the voter or the vote.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub receipt_code: String,
    pub election_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Format a receipt code as `WORD-xxxxxxxx-xxxx` from an entry hash
pub fn receipt_code(word: &str, hash: &EntryHash) -> String {
    let hex = hash.to_string();
    format!("{}-{}-{}", word, &hex[0..8], &hex[8..12])
}

/// Persistence for receipts, keyed by code
pub trait ReceiptStore: Send + Sync {
    /// Insert `receipt` unless its code is taken. Returns whether it was inserted.
    fn insert(&self, receipt: Receipt) -> Result<bool, Error>;

    fn get(&self, receipt_code: &str) -> Result<Option<Receipt>, Error>;

    /// All receipts for an election, in issue order
    fn list(&self, election_id: Uuid) -> Result<Vec<Receipt>, Error>;
}

/// A simple receipt store that keeps receipts in memory
#[derive(Default)]
pub struct MemReceiptStore {
    inner: Mutex<IndexMap<String, Receipt>>,
}

impl ReceiptStore for MemReceiptStore {
    fn insert(&self, receipt: Receipt) -> Result<bool, Error> {
        let mut receipts = self.inner.lock()?;
        if receipts.contains_key(&receipt.receipt_code) {
            return Ok(false);
        }
        receipts.insert(receipt.receipt_code.clone(), receipt);
        Ok(true)
    }

    fn get(&self, receipt_code: &str) -> Result<Option<Receipt>, Error> {
        let receipts = self.inner.lock()?;
        Ok(receipts.get(receipt_code).cloned())
    }

    fn list(&self, election_id: Uuid) -> Result<Vec<Receipt>, Error> {
        let receipts = self.inner.lock()?;
        Ok(receipts
            .values()
            .filter(|r| r.election_id == election_id)
            .cloned()
            .collect())
    }
}

impl<S: ReceiptStore + ?Sized> ReceiptStore for Arc<S> {
    fn insert(&self, receipt: Receipt) -> Result<bool, Error> {
        (**self).insert(receipt)
    }

    fn get(&self, receipt_code: &str) -> Result<Option<Receipt>, Error> {
        (**self).get(receipt_code)
    }

    fn list(&self, election_id: Uuid) -> Result<Vec<Receipt>, Error> {
        (**self).list(election_id)
    }
}

/// Derive a receipt for a freshly appended entry and store it.
///
/// Words are tried in random order; if every short code is taken the full
/// entry hash is used, which can only collide for the same entry.
pub fn issue_receipt<R: ReceiptStore>(store: &R, entry: &BallotEntry) -> Result<Receipt, Error> {
    let mut words: Vec<&str> = RECEIPT_WORDS.to_vec();
    words.shuffle(&mut rand::thread_rng());

    let candidates = words
        .iter()
        .map(|word| receipt_code(word, &entry.current_entry_hash))
        .chain(std::iter::once(format!(
            "{}-{}",
            RECEIPT_WORDS[0], entry.current_entry_hash
        )));

    for code in candidates {
        let receipt = Receipt {
            receipt_code: code,
            election_id: entry.election_id,
            created_at: entry.created_at,
        };
        if store.insert(receipt.clone())? {
            return Ok(receipt);
        }
        debug!("ballotbox: receipt code collision, retrying");
    }

    Err(Error::ReceiptCodeExhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint_dig::BigUint;

    fn entry(seed: u32) -> BallotEntry {
        BallotEntry::new(
            0,
            Uuid::new_v4(),
            "{}",
            Signature(BigUint::from(seed)),
            None,
        )
        .unwrap()
    }

    #[test]
    fn code_format() {
        let hash = EntryHash([0xab; 32]);
        assert_eq!(receipt_code("SUN", &hash), "SUN-abababab-abab");
    }

    #[test]
    fn issued_receipt_is_retrievable() {
        let store = MemReceiptStore::default();
        let entry = entry(1);
        let receipt = issue_receipt(&store, &entry).unwrap();

        let hex = entry.current_entry_hash.to_string();
        assert!(receipt.receipt_code.ends_with(&format!("-{}-{}", &hex[0..8], &hex[8..12])));
        assert_eq!(store.get(&receipt.receipt_code).unwrap(), Some(receipt.clone()));
        assert_eq!(store.list(entry.election_id).unwrap(), vec![receipt]);
        assert!(store.get("MOON-00000000-0000").unwrap().is_none());
    }

    #[test]
    fn collisions_fall_back_to_other_codes() {
        let store = MemReceiptStore::default();
        let entry = entry(2);

        let mut codes = Vec::new();
        for _ in 0..=RECEIPT_WORDS.len() {
            codes.push(issue_receipt(&store, &entry).unwrap().receipt_code);
        }
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), RECEIPT_WORDS.len() + 1);

        // Every code is now taken
        assert!(matches!(
            issue_receipt(&store, &entry),
            Err(Error::ReceiptCodeExhausted)
        ));
    }
}
