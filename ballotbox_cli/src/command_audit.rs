use crate::exit_with;
use ballotbox::{verify_chain, BallotEntry};
use std::collections::BTreeMap;
use uuid::Uuid;

pub fn command_audit(matches: &clap::ArgMatches) {
    let filename = match matches.value_of("INPUT") {
        Some(filename) => crate::expand(filename),
        None => {
            eprintln!("ballotbox audit: input filename required");
            std::process::exit(1);
        }
    };

    let bytes = std::fs::read(&filename).unwrap_or_else(|e| {
        eprintln!("ballotbox audit: unable to read {}: {}", filename, e);
        std::process::exit(1);
    });
    let entries: Vec<BallotEntry> = serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        eprintln!("ballotbox audit: unable to parse {}: {}", filename, e);
        std::process::exit(1);
    });

    if entries.is_empty() {
        eprintln!("ballotbox audit: {} contains no ledger entries", filename);
        std::process::exit(1);
    }

    let mut all_ok = true;
    for (election_id, chain) in by_election(entries) {
        let report = verify_chain(election_id, &chain).unwrap_or_else(|e| exit_with("audit", e));
        if report.verified {
            println!("> {}: OK ({} entries)", election_id, report.entries_checked);
        } else {
            all_ok = false;
            println!(
                "> {}: BROKEN at entry {:?} ({:?})",
                election_id, report.broken_at_index, report.violation
            );
        }
    }

    if !all_ok {
        std::process::exit(2);
    }
}

// Chains are per election; file order is kept within each
fn by_election(entries: Vec<BallotEntry>) -> BTreeMap<Uuid, Vec<BallotEntry>> {
    let mut chains: BTreeMap<Uuid, Vec<BallotEntry>> = BTreeMap::new();
    for entry in entries {
        chains.entry(entry.election_id).or_default().push(entry);
    }
    chains
}
