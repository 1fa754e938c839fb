//! Transport-agnostic request handlers.
//!
//! Each method takes an already-decoded request and returns either a
//! response body or an `ApiError` carrying the HTTP status to send. Wiring
//! these into a particular web framework is left to the caller.

use crate::*;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequest {
    pub election_id: Uuid,
    pub blinded_token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationResponse {
    pub blind_signed_token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoteRequest {
    pub vote_message: String,
    pub signature: String,
    pub election_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoteResponse {
    pub receipt_code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VoterStatus {
    pub election_id: Uuid,
    pub has_voted: bool,
}

/// An error response.
///
/// Rejections of votes and authorizations share one vague message so a
/// caller can't use them to probe what the server checks.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    #[serde(skip)]
    pub status: u16,
    pub code: &'static str,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}: {}", self.status, self.code, self.message)
    }
}

const REJECTED: &str = "request rejected";

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let (status, code) = match &e {
            Error::AlreadyAuthorized => (400, "AlreadyAuthorized"),
            Error::InvalidSignature => (400, "InvalidSignature"),
            Error::DuplicateBallot => (400, "DuplicateBallot"),
            Error::MalformedToken | Error::BadHex => (400, "InvalidRequest"),
            Error::ReceiptNotFound => (404, "NotFound"),
            Error::ElectionNotFound(_) => (404, "ElectionNotFound"),
            _ => (500, "InternalError"),
        };

        let message = match status {
            400 => REJECTED.to_owned(),
            404 => e.to_string(),
            _ => {
                error!("ballotbox: internal error: {}", e);
                "internal error".to_owned()
            }
        };

        ApiError {
            status,
            code,
            message,
        }
    }
}

/// The ballot core behind one set of stores
pub struct BallotApi<E, L, R, G, N>
where
    E: EligibilityStore,
    L: LedgerStore,
    R: ReceiptStore,
    G: ElectionRegistry,
    N: Notary,
{
    authority: Authority<E>,
    ballot_box: BallotBox<Arc<L>, Arc<R>, N>,
    results: ResultsService<Arc<L>, Arc<R>, G>,
}

/// Everything in memory, with a pluggable notary
pub type MemBallotApi =
    BallotApi<MemEligibilityStore, MemLedger, MemReceiptStore, Arc<MemRegistry>, Box<dyn Notary>>;

impl MemBallotApi {
    pub fn in_memory(
        key: Arc<SigningKeyMaterial>,
        registry: Arc<MemRegistry>,
        notary: Box<dyn Notary>,
    ) -> Self {
        BallotApi::new(
            key,
            MemEligibilityStore::default(),
            MemLedger::default(),
            MemReceiptStore::default(),
            registry,
            notary,
        )
    }
}

impl<E, L, R, G, N> BallotApi<E, L, R, G, N>
where
    E: EligibilityStore,
    L: LedgerStore,
    R: ReceiptStore,
    G: ElectionRegistry,
    N: Notary,
{
    pub fn new(
        key: Arc<SigningKeyMaterial>,
        eligibility: E,
        ledger: L,
        receipts: R,
        registry: G,
        notary: N,
    ) -> Self {
        let public_key = key.public_key().clone();
        let ledger = Arc::new(ledger);
        let receipts = Arc::new(receipts);

        BallotApi {
            authority: Authority::new(key, eligibility),
            ballot_box: BallotBox::new(public_key, ledger.clone(), receipts.clone(), notary),
            results: ResultsService::new(ledger, receipts, registry),
        }
    }

    /// `voter_id` comes from the caller's session and goes no further than the authority.
    pub fn request_authorization(
        &self,
        voter_id: &str,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationResponse, ApiError> {
        self.results.election(request.election_id)?;
        let token = BlindedToken::from_str(&request.blinded_token)?;
        let signed = self
            .authority
            .issue_blind_signature(voter_id, request.election_id, &token)?;

        Ok(AuthorizationResponse {
            blind_signed_token: signed.to_string(),
        })
    }

    pub fn submit_vote(&self, request: &SubmitVoteRequest) -> Result<SubmitVoteResponse, ApiError> {
        self.results.election(request.election_id)?;
        let signature = Signature::from_str(&request.signature)?;
        let receipt_code =
            self.ballot_box
                .submit_vote(&request.vote_message, &signature, request.election_id)?;

        Ok(SubmitVoteResponse { receipt_code })
    }

    pub fn verify_receipt(&self, receipt_code: &str) -> Result<ReceiptVerification, ApiError> {
        Ok(self.results.verify_receipt(receipt_code)?)
    }

    pub fn verify_chain_integrity(&self, election_id: Uuid) -> Result<ChainReport, ApiError> {
        Ok(self.results.verify_chain_integrity(election_id)?)
    }

    pub fn tally(&self, election_id: Uuid) -> Result<TallyResult, ApiError> {
        Ok(self.results.tally(election_id)?)
    }

    pub fn live_count(&self, election_id: Uuid) -> Result<LiveCount, ApiError> {
        Ok(self
            .results
            .live_count(election_id, self.authority.eligibility())?)
    }

    pub fn receipts(&self, election_id: Uuid) -> Result<Vec<Receipt>, ApiError> {
        Ok(self.results.receipts_for_election(election_id)?)
    }

    pub fn ledger(&self, election_id: Uuid) -> Result<Vec<BallotEntry>, ApiError> {
        Ok(self.results.ledger_entries(election_id)?)
    }

    pub fn voter_status(&self, voter_id: &str, election_id: Uuid) -> Result<VoterStatus, ApiError> {
        Ok(VoterStatus {
            election_id,
            has_voted: self.authority.has_authorization(voter_id, election_id)?,
        })
    }

    pub fn public_key(&self) -> AuthorityPublicKey {
        self.authority.public_key().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::shared_test_key;

    fn api() -> (MemBallotApi, Election) {
        let mut election = Election::new("Api");
        election.add_party("A", "Alpha", "a");
        election.add_party("B", "Beta", "b");
        election.registered_voters = 3;

        let registry = Arc::new(MemRegistry::from(vec![election.clone()]));
        let api = MemBallotApi::in_memory(shared_test_key(), registry, Box::new(NoopNotary));
        (api, election)
    }

    fn cast(api: &MemBallotApi, voter_id: &str, election_id: Uuid, party: &str) -> Result<String, ApiError> {
        let public = api.public_key();
        let message = VoteMessage::new(election_id, party).to_message().unwrap();
        let (token, factor) = blind(message.as_bytes(), &public).unwrap();

        let response = api.request_authorization(
            voter_id,
            &AuthorizationRequest {
                election_id,
                blinded_token: token.to_string(),
            },
        )?;
        let blind_sig = BlindSignature::from_str(&response.blind_signed_token).unwrap();
        let signature = unblind(&blind_sig, factor, &public);

        let response = api.submit_vote(&SubmitVoteRequest {
            vote_message: message,
            signature: signature.to_string(),
            election_id,
        })?;
        Ok(response.receipt_code)
    }

    #[test]
    fn full_flow_over_the_api() {
        let (api, election) = api();

        let code = cast(&api, "alice", election.id, "A").unwrap();
        cast(&api, "bob", election.id, "A").unwrap();

        let verification = api.verify_receipt(&code).unwrap();
        assert!(verification.valid);
        assert_eq!(verification.election_id, election.id);

        assert!(api.verify_chain_integrity(election.id).unwrap().verified);
        assert_eq!(api.tally(election.id).unwrap().winner().unwrap().party_id, "A");
        assert_eq!(api.receipts(election.id).unwrap().len(), 2);
        assert_eq!(api.ledger(election.id).unwrap().len(), 2);
        assert!(api.voter_status("alice", election.id).unwrap().has_voted);
        assert!(!api.voter_status("carol", election.id).unwrap().has_voted);

        let live = api.live_count(election.id).unwrap();
        assert_eq!(live.total_votes_cast, 2);
        assert_eq!(live.authorizations_issued, 2);
    }

    #[test]
    fn rejections_are_generic() {
        let (api, election) = api();
        cast(&api, "alice", election.id, "A").unwrap();

        let again = cast(&api, "alice", election.id, "B").unwrap_err();
        assert_eq!(again.status, 400);
        assert_eq!(again.code, "AlreadyAuthorized");

        let garbage = api
            .submit_vote(&SubmitVoteRequest {
                vote_message: "{}".into(),
                signature: "not a signature".into(),
                election_id: election.id,
            })
            .unwrap_err();
        let wrong = api
            .submit_vote(&SubmitVoteRequest {
                vote_message: "{}".into(),
                signature: "abcdef".into(),
                election_id: election.id,
            })
            .unwrap_err();

        // Unparseable and unverifiable signatures look the same from outside
        assert_eq!(garbage, wrong);
        assert_eq!(garbage.status, 400);
        assert_eq!(garbage.code, "InvalidSignature");
        assert_eq!(garbage.message, again.message);
    }

    #[test]
    fn not_found_statuses() {
        let (api, _) = api();
        assert_eq!(api.verify_receipt("SUN-00000000-0000").unwrap_err().status, 404);
        assert_eq!(api.tally(Uuid::new_v4()).unwrap_err().code, "ElectionNotFound");
    }

    #[test]
    fn unknown_election_spends_nothing() {
        let (api, _) = api();
        let public = api.public_key();
        let nowhere = Uuid::new_v4();
        let (token, _factor) = blind(b"ballot", &public).unwrap();

        let err = api
            .request_authorization(
                "alice",
                &AuthorizationRequest {
                    election_id: nowhere,
                    blinded_token: token.to_string(),
                },
            )
            .unwrap_err();
        assert_eq!(err.status, 404);
        assert_eq!(err.code, "ElectionNotFound");
        assert!(!api.voter_status("alice", nowhere).unwrap().has_voted);

        let err = api
            .submit_vote(&SubmitVoteRequest {
                vote_message: "{}".into(),
                signature: "abcdef".into(),
                election_id: nowhere,
            })
            .unwrap_err();
        assert_eq!(err.status, 404);
    }

    #[test]
    fn exhausted_receipt_codes_are_internal() {
        let err = ApiError::from(Error::ReceiptCodeExhausted);
        assert_eq!(err.status, 500);
        assert_eq!(err.code, "InternalError");
    }

    #[test]
    fn error_body_omits_status() {
        let body = serde_json::to_value(ApiError::from(Error::InvalidSignature)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"code": "InvalidSignature", "message": "request rejected"})
        );
    }
}
