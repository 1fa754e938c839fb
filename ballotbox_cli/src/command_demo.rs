use crate::config::Config;
use crate::exit_with;
use ballotbox::*;
use rand::seq::SliceRandom;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

pub fn command_demo(matches: &clap::ArgMatches, config: &Config) {
    let voters: usize = matches
        .value_of("voters")
        .unwrap_or("25")
        .parse()
        .unwrap_or_else(|e| exit_with("demo: --voters", e));

    let names: Vec<&str> = matches
        .value_of("parties")
        .unwrap_or("")
        .split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if names.is_empty() {
        eprintln!("ballotbox demo: at least one party is required");
        std::process::exit(1);
    }

    let mut election = Election::new("Demo Election");
    for name in names {
        let symbol: String = name.chars().take(1).collect();
        election.add_party(&name.to_lowercase(), name, &symbol.to_uppercase());
    }
    election.registered_voters = voters as u64;

    // A throwaway key, so the demo never touches the real key file
    let key = SigningKeyMaterial::generate(config.key_bits).unwrap_or_else(|e| exit_with("demo", e));
    let registry = Arc::new(MemRegistry::from(vec![election.clone()]));
    let api = MemBallotApi::in_memory(Arc::new(key), registry, Box::new(NoopNotary));
    let public = api.public_key();

    // Voting
    let mut rng = rand::thread_rng();
    let mut receipts = Vec::with_capacity(voters);
    for i in 0..voters {
        let voter_id = format!("voter-{}", i + 1);
        let party = match election.parties.choose(&mut rng) {
            Some(party) => party,
            None => break,
        };

        let code = cast_vote(&api, &public, &voter_id, election.id, &party.id)
            .unwrap_or_else(|e| exit_with("demo: voting", e));
        receipts.push(code);
    }
    println!("> Cast {} votes in election {}", receipts.len(), election.id);

    // Voting is over
    let report = api
        .verify_chain_integrity(election.id)
        .unwrap_or_else(|e| exit_with("demo: audit", e));
    if report.verified {
        println!("> Ledger verified OK ({} entries)", report.entries_checked);
    } else {
        println!(
            "> Ledger BROKEN at entry {:?}: {:?}",
            report.broken_at_index, report.violation
        );
    }

    for code in receipts.iter() {
        let verification = api
            .verify_receipt(code)
            .unwrap_or_else(|e| exit_with("demo: receipts", e));
        if matches.is_present("print-receipts") {
            println!("  {} recorded at {}", verification.receipt_code, verification.timestamp);
        }
    }
    println!("> All {} receipts found", receipts.len());

    let tally = api
        .tally(election.id)
        .unwrap_or_else(|e| exit_with("demo: tally", e));
    print_tally(&tally);

    if let Some(path) = matches.value_of("export") {
        let path = crate::expand(path);
        let entries = api
            .ledger(election.id)
            .unwrap_or_else(|e| exit_with("demo: export", e));
        let json = serde_json::to_string_pretty(&entries)
            .unwrap_or_else(|e| exit_with("demo: export", e));
        std::fs::write(&path, json).unwrap_or_else(|e| exit_with("demo: export", e));
        println!("> Ledger written to {}", path);
    }
}

/// The voter's side of the protocol, end to end
fn cast_vote(
    api: &MemBallotApi,
    public: &AuthorityPublicKey,
    voter_id: &str,
    election_id: Uuid,
    party_id: &str,
) -> Result<String, String> {
    let message = VoteMessage::new(election_id, party_id)
        .to_message()
        .map_err(|e| e.to_string())?;
    let (token, factor) = blind(message.as_bytes(), public).map_err(|e| e.to_string())?;

    let response = api
        .request_authorization(
            voter_id,
            &AuthorizationRequest {
                election_id,
                blinded_token: token.to_string(),
            },
        )
        .map_err(|e| e.to_string())?;

    let blind_signature =
        BlindSignature::from_str(&response.blind_signed_token).map_err(|e| e.to_string())?;
    let signature = unblind(&blind_signature, factor, public);

    let response = api
        .submit_vote(&SubmitVoteRequest {
            vote_message: message,
            signature: signature.to_string(),
            election_id,
        })
        .map_err(|e| e.to_string())?;

    Ok(response.receipt_code)
}

fn print_tally(tally: &TallyResult) {
    println!("Tally:");
    for party in tally.results.iter() {
        println!(
            "  [{}] {} got {} votes ({}%)",
            party.symbol, party.party_name, party.vote_count, party.percentage
        );
    }
    println!(
        "  {} valid of {} cast, {} invalid, turnout {}%",
        tally.total_valid_votes,
        tally.total_votes_cast,
        tally.invalid_votes,
        tally.turnout_percentage
    );

    match &tally.outcome {
        Outcome::Winner { party } => println!("  The winner is {}", party.party_name),
        Outcome::Draw {
            tied_parties,
            highest_vote_count,
        } => {
            let names: Vec<&str> = tied_parties.iter().map(|p| p.party_name.as_str()).collect();
            println!(
                "  Draw between {} on {} votes each",
                names.join(", "),
                highest_vote_count
            );
        }
        Outcome::NoWinner => println!("  No votes were counted"),
    }
}
