//! One-time resume codes.

use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::domain::foundation::EmailAddress;

/// Number of digits in a resume code.
pub const CODE_LENGTH: usize = 6;

/// A freshly generated one-time code, held in clear only until it is mailed.
#[derive(Clone, PartialEq, Eq)]
pub struct OneTimeCode(String);

impl OneTimeCode {
    /// Generates a uniformly random numeric code.
    pub fn generate() -> Self {
        let n: u32 = rand::rngs::OsRng.gen_range(0..1_000_000);
        Self(format!("{:06}", n))
    }

    /// Wraps a known code. Used by tests and fixed-code fixtures.
    pub fn from_digits(digits: impl Into<String>) -> Self {
        Self(digits.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hash stored in place of the code, bound to the email it was sent to.
    pub fn hash_for(&self, email: &EmailAddress) -> String {
        hash_code(email, &self.0)
    }
}

impl std::fmt::Debug for OneTimeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OneTimeCode(******)")
    }
}

/// SHA-256 over `email:code`, hex encoded.
pub fn hash_code(email: &EmailAddress, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(code.trim().as_bytes());
    hex::encode(hasher.finalize())
}

/// Compares a submitted code with a stored hash in constant time.
pub fn code_matches(email: &EmailAddress, submitted: &str, stored_hash: &str) -> bool {
    let candidate = hash_code(email, submitted);
    candidate.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}
