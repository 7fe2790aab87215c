//! Trigger token verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies presented trigger tokens against the shared pipeline secret.
///
/// A token is valid iff it is the hex encoding of
/// `HMAC-SHA256(secret, candidate)`. The comparison is constant time so a
/// caller cannot learn how many token bytes matched.
#[derive(Clone)]
pub struct TriggerAuthenticator {
    secret: Vec<u8>,
}

impl TriggerAuthenticator {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Check a presented token against the candidate trigger value.
    ///
    /// Never errors: empty inputs and malformed hex simply fail
    /// verification.
    pub fn verify(&self, candidate: &str, presented_token: &str) -> bool {
        if candidate.is_empty() || presented_token.is_empty() {
            return false;
        }

        let Ok(token_bytes) = hex::decode(presented_token) else {
            return false;
        };

        // HMAC accepts any key length, so this cannot fail in practice.
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(candidate.as_bytes());

        mac.verify_slice(&token_bytes).is_ok()
    }
}
