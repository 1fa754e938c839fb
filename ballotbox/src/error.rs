use thiserror::Error;
use uuid::Uuid;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("ballotbox: voter is already authorized for this election")]
    AlreadyAuthorized,

    #[error("ballotbox: invalid vote signature")]
    InvalidSignature,

    #[error("ballotbox: ballot has already been recorded")]
    DuplicateBallot,

    #[error("ballotbox: blinded token is not a valid value modulo n")]
    MalformedToken,

    #[error("ballotbox: hash chain integrity violation at entry {index}")]
    ChainIntegrityViolation { index: usize },

    #[error("ballotbox: receipt not found")]
    ReceiptNotFound,

    #[error("ballotbox: no free receipt code for entry")]
    ReceiptCodeExhausted,

    #[error("ballotbox: election {0} not found")]
    ElectionNotFound(Uuid),

    #[error("ballotbox: party {0} is not registered in the election")]
    PartyUnregistered(String),

    #[error("ballotbox: vote message is for another election")]
    ElectionMismatch,

    #[error("ballotbox: invalid vote message: {0}")]
    MalformedVoteMessage(String),

    #[error("ballotbox: invalid hex value")]
    BadHex,

    #[error("ballotbox: RSA error: {0}")]
    Rsa(#[from] rsa::errors::Error),

    #[error("ballotbox: key encoding error: {0}")]
    KeyEncoding(#[from] rsa::pkcs8::Error),

    #[error("ballotbox: key file {path} exists but could not be loaded: {reason}")]
    KeyUnreadable { path: String, reason: String },

    #[error("ballotbox: I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ballotbox: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ballotbox: CBOR error: {0}")]
    Cbor(#[from] serde_cbor::Error),

    #[error("ballotbox: store lock poisoned")]
    StorePoisoned,
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::StorePoisoned
    }
}
