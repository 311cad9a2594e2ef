//! Challenge store port for resume challenges.
//!
//! Holds at most one challenge per normalized email. Records are
//! short-lived; implementations expire them after the TTL passed to `put`
//! or `replace`.

use crate::domain::foundation::{DomainError, EmailAddress};
use crate::domain::resume::ResumeChallenge;
use async_trait::async_trait;

#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Current challenge for `email`, if one has not expired.
    async fn get(&self, email: &EmailAddress) -> Result<Option<ResumeChallenge>, DomainError>;

    /// Stores `challenge`, replacing any previous one for the same email.
    async fn put(&self, challenge: &ResumeChallenge, ttl_secs: u64) -> Result<(), DomainError>;

    /// Stores `next` only if the stored challenge still has the id and
    /// revision of `expected`, as one atomic step.
    ///
    /// Returns false, writing nothing, if the record changed or expired.
    async fn replace(
        &self,
        expected: &ResumeChallenge,
        next: &ResumeChallenge,
        ttl_secs: u64,
    ) -> Result<bool, DomainError>;
}
