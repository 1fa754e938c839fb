use crate::*;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotaryError {
    #[error("notary unavailable: {0}")]
    Unavailable(String),

    #[error("notary rejected entry: {0}")]
    Rejected(String),
}

/// An external, best-effort witness for ledger entries (e.g. an on-chain mirror).
///
/// Nothing in the ballot core depends on a notary succeeding.
pub trait Notary: Send + Sync {
    fn notarize(
        &self,
        election_id: Uuid,
        entry_hash: &EntryHash,
        receipt_code: &str,
    ) -> Result<(), NotaryError>;
}

/// A notary that does nothing
#[derive(Default, Clone, Copy, Debug)]
pub struct NoopNotary;

impl Notary for NoopNotary {
    fn notarize(&self, _: Uuid, _: &EntryHash, _: &str) -> Result<(), NotaryError> {
        Ok(())
    }
}

impl<T: Notary + ?Sized> Notary for Arc<T> {
    fn notarize(
        &self,
        election_id: Uuid,
        entry_hash: &EntryHash,
        receipt_code: &str,
    ) -> Result<(), NotaryError> {
        (**self).notarize(election_id, entry_hash, receipt_code)
    }
}

impl<T: Notary + ?Sized> Notary for Box<T> {
    fn notarize(
        &self,
        election_id: Uuid,
        entry_hash: &EntryHash,
        receipt_code: &str,
    ) -> Result<(), NotaryError> {
        (**self).notarize(election_id, entry_hash, receipt_code)
    }
}
