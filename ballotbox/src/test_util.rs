use crate::*;
use std::sync::Arc;
use uuid::Uuid;

// Key generation is slow, so every test in the binary shares one small key
lazy_static::lazy_static! {
    static ref TEST_KEY: Arc<SigningKeyMaterial> =
        Arc::new(SigningKeyMaterial::generate(1024).expect("test key generation failed"));
}

pub fn test_key() -> &'static SigningKeyMaterial {
    &TEST_KEY
}

pub fn shared_test_key() -> Arc<SigningKeyMaterial> {
    TEST_KEY.clone()
}

/// A vote message for `party` and the authority's signature over it
pub fn signed_vote(election_id: Uuid, party: &str) -> (String, Signature) {
    let message = VoteMessage::new(election_id, party).to_message().unwrap();
    let signature = sign_direct(test_key(), message.as_bytes());
    (message, signature)
}
