//! Resume token port.
//!
//! A resume token proves that its bearer verified a one-time code for an
//! email. It is short-lived and bound to the challenge it was issued for.

use crate::domain::foundation::{ChallengeId, DomainError, EmailAddress, Timestamp};

/// Claims carried by a resume token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeClaims {
    pub email: EmailAddress,
    pub token_id: ChallengeId,
    pub expires_at: Timestamp,
}

/// Issues and validates resume tokens.
pub trait ResumeTokens: Send + Sync {
    /// Signs `claims` into an opaque bearer token.
    fn issue(&self, claims: &ResumeClaims) -> Result<String, DomainError>;

    /// Validates signature and expiry and returns the claims.
    ///
    /// # Errors
    ///
    /// - `ResumeRejected` for any invalid, expired or foreign token
    fn verify(&self, token: &str) -> Result<ResumeClaims, DomainError>;
}
