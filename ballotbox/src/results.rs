use crate::*;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptVerification {
    pub valid: bool,
    pub receipt_code: String,
    pub election_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveCount {
    pub election_id: Uuid,
    pub total_votes_cast: u64,
    pub registered_voters: u64,
    pub turnout_percentage: Decimal,

    /// Authorizations issued so far. Any excess over `total_votes_cast` is
    /// voters who were authorized and never submitted; they can't retry.
    pub authorizations_issued: u64,
}

/// Read side of the ballot core: receipts, audits and tallies.
///
/// Everything here is derived from the ledger and registry; nothing writes.
pub struct ResultsService<L: LedgerStore, R: ReceiptStore, G: ElectionRegistry> {
    ledger: L,
    receipts: R,
    registry: G,
}

impl<L: LedgerStore, R: ReceiptStore, G: ElectionRegistry> ResultsService<L, R, G> {
    pub fn new(ledger: L, receipts: R, registry: G) -> Self {
        ResultsService {
            ledger,
            receipts,
            registry,
        }
    }

    /// The registered election, or `ElectionNotFound`
    pub fn election(&self, election_id: Uuid) -> Result<Election, Error> {
        self.registry.get_election(election_id)
    }

    /// Look up a receipt by its code
    pub fn verify_receipt(&self, receipt_code: &str) -> Result<ReceiptVerification, Error> {
        let receipt = self
            .receipts
            .get(receipt_code.trim())?
            .ok_or(Error::ReceiptNotFound)?;

        Ok(ReceiptVerification {
            valid: true,
            receipt_code: receipt.receipt_code,
            election_id: receipt.election_id,
            timestamp: receipt.created_at,
        })
    }

    /// Every receipt issued for an election
    pub fn receipts_for_election(&self, election_id: Uuid) -> Result<Vec<Receipt>, Error> {
        self.registry.get_election(election_id)?;
        self.receipts.list(election_id)
    }

    /// The election's ledger as published for independent audit
    pub fn ledger_entries(&self, election_id: Uuid) -> Result<Vec<BallotEntry>, Error> {
        self.registry.get_election(election_id)?;
        self.ledger.entries(election_id)
    }

    /// Walk the election's hash chain
    pub fn verify_chain_integrity(&self, election_id: Uuid) -> Result<ChainReport, Error> {
        self.registry.get_election(election_id)?;
        let entries = self.ledger.entries(election_id)?;
        verify_chain(election_id, &entries)
    }

    /// Count the election's votes
    pub fn tally(&self, election_id: Uuid) -> Result<TallyResult, Error> {
        let election = self.registry.get_election(election_id)?;
        let entries = self.ledger.entries(election_id)?;
        let result = TallyResult::tally(&election, &entries);

        info!(
            "ballotbox: tallied election {}: {} valid of {} cast",
            election_id, result.total_valid_votes, result.total_votes_cast
        );
        Ok(result)
    }

    /// Running totals while voting is open. Doesn't parse any ballots.
    pub fn live_count<E: EligibilityStore>(
        &self,
        election_id: Uuid,
        eligibility: &E,
    ) -> Result<LiveCount, Error> {
        let election = self.registry.get_election(election_id)?;
        let total_votes_cast = self.ledger.len(election_id)? as u64;

        Ok(LiveCount {
            election_id,
            total_votes_cast,
            registered_voters: election.registered_voters,
            turnout_percentage: percentage(total_votes_cast, election.registered_voters),
            authorizations_issued: eligibility.count(election_id)? as u64,
        })
    }
}
