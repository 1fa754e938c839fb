use crate::*;
use indexmap::IndexMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// A party standing in an election
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: String,
    pub name: String,
    pub symbol: String,
}

/// An election as seen by the ballot core: its id, its parties and the size of the electorate.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Election {
    pub id: Uuid,
    pub name: String,

    /// Parties that may receive votes, in registration order
    pub parties: Vec<Party>,

    /// Number of registered voters, used for turnout
    pub registered_voters: u64,
}

impl Election {
    /// Create a new Election with no parties
    pub fn new(name: &str) -> Self {
        Election {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            parties: vec![],
            registered_voters: 0,
        }
    }

    pub fn add_party(&mut self, id: &str, name: &str, symbol: &str) {
        self.parties.push(Party {
            id: id.to_owned(),
            name: name.to_owned(),
            symbol: symbol.to_owned(),
        });
    }

    /// Get a party with the given ID
    pub fn get_party(&self, party_id: &str) -> Option<&Party> {
        self.parties.iter().find(|p| p.id == party_id)
    }
}

/// The election/party registry the ballot core consults.
///
/// Election management itself lives elsewhere; this is only the read side.
pub trait ElectionRegistry: Send + Sync {
    fn get_election(&self, election_id: Uuid) -> Result<Election, Error>;
}

/// A simple registry that keeps elections in memory
#[derive(Default)]
pub struct MemRegistry {
    inner: RwLock<IndexMap<Uuid, Election>>,
}

impl MemRegistry {
    pub fn set(&self, election: Election) -> Result<(), Error> {
        let mut elections = self.inner.write()?;
        elections.insert(election.id, election);
        Ok(())
    }
}

impl ElectionRegistry for MemRegistry {
    fn get_election(&self, election_id: Uuid) -> Result<Election, Error> {
        let elections = self.inner.read()?;
        elections
            .get(&election_id)
            .cloned()
            .ok_or(Error::ElectionNotFound(election_id))
    }
}

impl From<Vec<Election>> for MemRegistry {
    fn from(item: Vec<Election>) -> Self {
        let registry = MemRegistry::default();
        {
            // A fresh lock can't be poisoned
            let mut elections = match registry.inner.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            for election in item {
                elections.insert(election.id, election);
            }
        }
        registry
    }
}

impl<G: ElectionRegistry + ?Sized> ElectionRegistry for Arc<G> {
    fn get_election(&self, election_id: Uuid) -> Result<Election, Error> {
        (**self).get_election(election_id)
    }
}
