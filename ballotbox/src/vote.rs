use crate::*;
use chrono::Utc;
use rand::RngCore;
use uuid::Uuid;

/// The plaintext a voter signs blindly and later submits to the ledger.
///
/// The nonce makes every message unique, so two voters choosing the same
/// party never produce the same signed message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteMessage {
    pub election_id: Uuid,
    pub party_id: String,
    pub timestamp: i64,
    pub nonce: String,
}

impl VoteMessage {
    /// Create a new vote for `party_id` with a fresh nonce
    pub fn new(election_id: Uuid, party_id: &str) -> Self {
        let mut nonce = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        VoteMessage {
            election_id,
            party_id: party_id.to_owned(),
            timestamp: Utc::now().timestamp_millis(),
            nonce: hex::encode(nonce),
        }
    }

    /// The exact string the voter blinds, signs and submits
    pub fn to_message(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a submitted vote message
    pub fn parse(message: &str) -> Result<Self, Error> {
        serde_json::from_str(message).map_err(|e| Error::MalformedVoteMessage(e.to_string()))
    }

    /// Check the vote against an election's registered parties, returning the party id.
    pub fn validate(&self, election: &Election) -> Result<&str, Error> {
        if self.election_id != election.id {
            return Err(Error::ElectionMismatch);
        }
        if election.get_party(&self.party_id).is_none() {
            return Err(Error::PartyUnregistered(self.party_id.clone()));
        }
        Ok(&self.party_id)
    }
}
