//! State token computation for the OAuth2 redirect round-trip.
//!
//! The state parameter sent to the authorization endpoint is a keyed digest
//! over three values held in the user's session: the url the user originally
//! requested, a salt generated fresh for each redirect, and the session id.
//! Because all three live server-side, the token can be re-derived when the
//! provider echoes it back on the callback and compared against the wire
//! value, proving the callback corresponds to a redirect this server issued.
//!
//! # Security
//!
//! - The salt must be generated fresh per redirect; reusing it across
//!   redirects defeats the CSRF protection.
//! - The digest is HMAC-SHA256 keyed with a per-deployment secret. The
//!   layout of the digested buffer (`salt|session_id|return_url`) and the
//!   lowercase hex rendering follow the historical unkeyed-MD5 scheme this
//!   replaces; only the digest function changed.
//! - Verification against the wire value is constant-time.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Delimiter between the digested components.
const DELIMITER: &str = "|";

/// Salt length in bytes. 16 bytes produce a 22-character base64url string.
const SALT_LENGTH: usize = 16;

/// Generate a fresh random salt for one redirect round-trip.
///
/// Uses cryptographically secure random generation; the result is 22
/// URL-safe characters. Store it in the session before issuing the redirect
/// so the state token can be re-derived on the callback.
#[must_use]
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_LENGTH];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A computed state token.
///
/// Deterministically derived from `(return_url, salt, session_id)` under a
/// keyed digest: the same triple always yields the same token, and any
/// single differing component yields a different one. The token carries no
/// independent identity, it exists only to be compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateToken(String);

impl StateToken {
    /// Compute the state token for one redirect round-trip.
    ///
    /// # Arguments
    ///
    /// * `return_url` - the url which triggered the authentication check
    /// * `salt` - the salt stored in the session prior to redirecting
    /// * `session_id` - the current session id
    /// * `secret` - the per-deployment key for the digest
    #[must_use]
    pub fn compute(return_url: &str, salt: &str, session_id: &str, secret: &[u8]) -> Self {
        let mut buffer = String::with_capacity(
            salt.len() + session_id.len() + return_url.len() + 2 * DELIMITER.len(),
        );
        buffer.push_str(salt);
        buffer.push_str(DELIMITER);
        buffer.push_str(session_id);
        buffer.push_str(DELIMITER);
        buffer.push_str(return_url);

        let mut mac =
            HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
        mac.update(buffer.as_bytes());
        StateToken(hex::encode(mac.finalize().into_bytes()))
    }

    /// The token rendered as lowercase hex.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare this token against a wire-supplied value in constant time.
    ///
    /// Returns `false` on any difference. The comparison accumulates over
    /// every byte rather than exiting early, so timing does not reveal the
    /// position of the first mismatch.
    #[must_use]
    pub fn matches(&self, wire: &str) -> bool {
        let ours = self.0.as_bytes();
        let theirs = wire.as_bytes();
        if ours.len() != theirs.len() {
            return false;
        }
        let mut diff = 0u8;
        for (a, b) in ours.iter().zip(theirs.iter()) {
            diff |= a ^ b;
        }
        diff == 0
    }
}

impl std::fmt::Display for StateToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
