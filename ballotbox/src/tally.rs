use crate::*;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartyResult {
    pub party_id: String,
    pub party_name: String,
    pub symbol: String,
    pub vote_count: u64,
    pub percentage: Decimal,
}

/// Votes excluded from the per-party counts, by reason
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RejectedVotes {
    pub malformed: u64,
    pub election_mismatch: u64,
    pub unregistered_party: u64,
}

impl RejectedVotes {
    pub fn total(&self) -> u64 {
        self.malformed + self.election_mismatch + self.unregistered_party
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Winner {
        party: PartyResult,
    },
    #[serde(rename_all = "camelCase")]
    Draw {
        tied_parties: Vec<PartyResult>,
        highest_vote_count: u64,
    },
    /// Nobody received a vote
    NoWinner,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TallyResult {
    pub election_id: Uuid,
    pub election_name: String,

    /// Count per party id, every registered party included, in registration order
    pub per_party_counts: IndexMap<String, u64>,

    /// Parties by count descending, then by name
    pub results: Vec<PartyResult>,

    pub total_votes_cast: u64,
    pub total_valid_votes: u64,
    pub invalid_votes: u64,
    pub rejected: RejectedVotes,

    pub registered_voters: u64,
    pub turnout_percentage: Decimal,

    pub outcome: Outcome,
    pub calculated_at: DateTime<Utc>,
}

impl TallyResult {
    /// Count the votes in `entries` for `election`
    pub fn tally(election: &Election, entries: &[BallotEntry]) -> Self {
        let mut per_party_counts: IndexMap<String, u64> = election
            .parties
            .iter()
            .map(|p| (p.id.clone(), 0))
            .collect();
        let mut rejected = RejectedVotes::default();

        for entry in entries {
            let counted = VoteMessage::parse(&entry.vote_message)
                .and_then(|vote| vote.validate(election).map(|p| p.to_owned()));

            match counted {
                Ok(party_id) => {
                    if let Some(count) = per_party_counts.get_mut(&party_id) {
                        *count += 1;
                    }
                }
                Err(Error::ElectionMismatch) => rejected.election_mismatch += 1,
                Err(Error::PartyUnregistered(party_id)) => {
                    warn!(
                        "ballotbox: vote for unregistered party {} in election {}",
                        party_id, election.id
                    );
                    rejected.unregistered_party += 1
                }
                Err(_) => rejected.malformed += 1,
            }
        }

        let total_valid_votes: u64 = per_party_counts.values().sum();
        let total_votes_cast = entries.len() as u64;

        let mut results: Vec<PartyResult> = election
            .parties
            .iter()
            .map(|party| {
                let vote_count = per_party_counts.get(&party.id).copied().unwrap_or(0);
                PartyResult {
                    party_id: party.id.clone(),
                    party_name: party.name.clone(),
                    symbol: party.symbol.clone(),
                    vote_count,
                    percentage: percentage(vote_count, total_valid_votes),
                }
            })
            .collect();
        results.sort_by(|a, b| {
            b.vote_count
                .cmp(&a.vote_count)
                .then_with(|| a.party_name.cmp(&b.party_name))
        });

        let outcome = decide(&results);

        TallyResult {
            election_id: election.id,
            election_name: election.name.clone(),
            per_party_counts,
            results,
            total_votes_cast,
            total_valid_votes,
            invalid_votes: rejected.total(),
            rejected,
            registered_voters: election.registered_voters,
            turnout_percentage: percentage(total_valid_votes, election.registered_voters),
            outcome,
            calculated_at: Utc::now(),
        }
    }

    pub fn winner(&self) -> Option<&PartyResult> {
        match &self.outcome {
            Outcome::Winner { party } => Some(party),
            _ => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        matches!(self.outcome, Outcome::Draw { .. })
    }
}

// The name ordering in `results` is display-only; ties are decided on counts alone
fn decide(sorted: &[PartyResult]) -> Outcome {
    let highest_vote_count = match sorted.first() {
        Some(top) if top.vote_count > 0 => top.vote_count,
        _ => return Outcome::NoWinner,
    };

    let tied: Vec<PartyResult> = sorted
        .iter()
        .filter(|r| r.vote_count == highest_vote_count)
        .cloned()
        .collect();

    if tied.len() > 1 {
        Outcome::Draw {
            tied_parties: tied,
            highest_vote_count,
        }
    } else {
        Outcome::Winner {
            party: sorted[0].clone(),
        }
    }
}

/// `count / total * 100` to two places, or zero when `total` is zero
pub fn percentage(count: u64, total: u64) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    let ratio = Decimal::from(count) * Decimal::from(100u64) / Decimal::from(total);
    ratio.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint_dig::BigUint;
    use std::str::FromStr;

    fn election(parties: &[&str]) -> Election {
        let mut election = Election::new("Test");
        for p in parties {
            election.add_party(p, &format!("Party {}", p), p);
        }
        election.registered_voters = 10;
        election
    }

    // Signatures are irrelevant to counting, so entries are built directly
    fn entries(election_id: Uuid, parties: &[&str]) -> Vec<BallotEntry> {
        parties
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let message = VoteMessage::new(election_id, p).to_message().unwrap();
                BallotEntry::new(i, election_id, &message, Signature(BigUint::from(i as u32 + 1)), None)
                    .unwrap()
            })
            .collect()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn counts_votes_and_separates_unregistered() {
        let election = election(&["A", "B", "C"]);
        let entries = entries(election.id, &["A", "A", "B", "C", "A", "Z"]);

        let result = TallyResult::tally(&election, &entries);
        assert_eq!(result.per_party_counts["A"], 3);
        assert_eq!(result.per_party_counts["B"], 1);
        assert_eq!(result.per_party_counts["C"], 1);
        assert!(!result.per_party_counts.contains_key("Z"));

        assert_eq!(result.total_votes_cast, 6);
        assert_eq!(result.total_valid_votes, 5);
        assert_eq!(result.invalid_votes, 1);
        assert_eq!(result.rejected.unregistered_party, 1);

        assert_eq!(result.winner().unwrap().party_id, "A");
        assert_eq!(result.results[0].percentage, dec("60"));
        assert_eq!(result.results[1].percentage, dec("20"));
        assert_eq!(result.turnout_percentage, dec("50"));
        assert!(!result.is_draw());
    }

    #[test]
    fn detects_draw() {
        let election = election(&["B", "A"]);
        let entries = entries(election.id, &["A", "A", "B", "B"]);

        let result = TallyResult::tally(&election, &entries);
        match &result.outcome {
            Outcome::Draw {
                tied_parties,
                highest_vote_count,
            } => {
                assert_eq!(*highest_vote_count, 2);
                let ids: Vec<&str> = tied_parties.iter().map(|p| p.party_id.as_str()).collect();
                assert_eq!(ids, vec!["A", "B"]);
            }
            other => panic!("expected draw, got {:?}", other),
        }
        assert!(result.winner().is_none());
    }

    #[test]
    fn zero_vote_election() {
        let election = election(&["A", "B"]);
        let result = TallyResult::tally(&election, &[]);

        assert_eq!(result.total_valid_votes, 0);
        assert_eq!(result.outcome, Outcome::NoWinner);
        assert_eq!(result.results.len(), 2);
        for party in &result.results {
            assert_eq!(party.vote_count, 0);
            assert_eq!(party.percentage, Decimal::ZERO);
        }
    }

    #[test]
    fn foreign_and_garbled_votes_are_invalid() {
        let election = election(&["A"]);
        let mut entries = entries(Uuid::new_v4(), &["A"]);
        entries.push(
            BallotEntry::new(1, election.id, "not json", Signature(BigUint::from(9u32)), None)
                .unwrap(),
        );

        let result = TallyResult::tally(&election, &entries);
        assert_eq!(result.total_votes_cast, 2);
        assert_eq!(result.total_valid_votes, 0);
        assert_eq!(result.rejected.election_mismatch, 1);
        assert_eq!(result.rejected.malformed, 1);
        assert_eq!(result.invalid_votes, 2);
    }

    #[test]
    fn percentages_round_to_two_places() {
        assert_eq!(percentage(1, 3), dec("33.33"));
        assert_eq!(percentage(2, 3), dec("66.67"));
        assert_eq!(percentage(0, 0), Decimal::ZERO);
    }
}
