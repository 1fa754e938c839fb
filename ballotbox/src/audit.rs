use crate::*;
use uuid::Uuid;

/// What went wrong at the first broken entry
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChainViolation {
    /// The first entry points at a predecessor
    GenesisHasPrevious,

    /// `previousEntryHash` doesn't match the preceding entry's hash
    LinkMismatch,

    /// The stored hash doesn't match the entry's contents
    DigestMismatch,

    /// The entry is filed under another election or out of position
    Misplaced,
}

/// Result of walking one election's chain
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChainReport {
    pub election_id: Uuid,
    pub verified: bool,
    pub entries_checked: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub broken_at_index: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<ChainViolation>,
}

impl ChainReport {
    /// Turn a failed report into `Error::ChainIntegrityViolation`
    pub fn into_result(self) -> Result<ChainReport, Error> {
        match self.broken_at_index {
            Some(index) => Err(Error::ChainIntegrityViolation { index }),
            None => Ok(self),
        }
    }
}

/// Walk `entries` in append order and report the first broken link.
///
/// Entry 0 must have no previous hash; every later entry must point at the
/// hash of the one before it, and every stored hash must match its contents.
/// A failure is logged on the audit target and never repaired.
pub fn verify_chain(election_id: Uuid, entries: &[BallotEntry]) -> Result<ChainReport, Error> {
    let mut failure = None;

    for (i, entry) in entries.iter().enumerate() {
        let expected_previous = if i == 0 {
            None
        } else {
            Some(entries[i - 1].current_entry_hash)
        };

        let violation = if entry.election_id != election_id || entry.index != i {
            Some(ChainViolation::Misplaced)
        } else if entry.previous_entry_hash != expected_previous {
            if i == 0 {
                Some(ChainViolation::GenesisHasPrevious)
            } else {
                Some(ChainViolation::LinkMismatch)
            }
        } else if entry.recompute_hash()? != entry.current_entry_hash {
            Some(ChainViolation::DigestMismatch)
        } else {
            None
        };

        if let Some(violation) = violation {
            failure = Some((i, violation));
            break;
        }
    }

    if let Some((index, violation)) = failure {
        error!(
            target: "ballotbox::audit",
            "hash chain for election {} broken at entry {}: {:?}",
            election_id, index, violation
        );
    }

    Ok(ChainReport {
        election_id,
        verified: failure.is_none(),
        entries_checked: entries.len(),
        broken_at_index: failure.map(|(i, _)| i),
        violation: failure.map(|(_, v)| v),
    })
}
