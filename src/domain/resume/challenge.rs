//! Resume challenge entity.

use crate::domain::foundation::{ChallengeId, EmailAddress, IntentId, Timestamp};
use serde::{Deserialize, Serialize};

use super::code::{code_matches, OneTimeCode};

/// Timing and attempt limits for resume challenges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePolicy {
    pub code_ttl_secs: u64,
    pub resend_cooldown_secs: u64,
    pub max_verify_attempts: u32,
    pub token_ttl_secs: u64,
}

impl Default for ResumePolicy {
    fn default() -> Self {
        Self {
            code_ttl_secs: 600,
            resend_cooldown_secs: 60,
            max_verify_attempts: 5,
            token_ttl_secs: 900,
        }
    }
}

/// Result of checking a submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Code accepted; the challenge is consumed and a token may be issued.
    Verified { intent_id: IntentId },
    /// Code not accepted. The cause is never surfaced to the caller.
    Rejected,
}

/// An email-bound one-time code challenge.
///
/// One challenge exists per email; issuing a new one replaces the old.
/// Challenges issued for emails without a pending intent carry no
/// `intent_id` and can never verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeChallenge {
    pub id: ChallengeId,
    pub email: EmailAddress,
    pub intent_id: Option<IntentId>,
    pub code_hash: String,
    pub created_at: Timestamp,
    pub cooldown_until: Timestamp,
    pub expires_at: Timestamp,
    pub failed_attempts: u32,
    pub consumed_at: Option<Timestamp>,
    pub token_expires_at: Option<Timestamp>,
    /// Bumped by every verification so stores can detect lost updates.
    #[serde(default)]
    pub revision: u64,
}

impl ResumeChallenge {
    pub fn issue(
        email: EmailAddress,
        intent_id: Option<IntentId>,
        code: &OneTimeCode,
        policy: &ResumePolicy,
        now: Timestamp,
    ) -> Self {
        Self {
            id: ChallengeId::new(),
            code_hash: code.hash_for(&email),
            email,
            intent_id,
            created_at: now,
            cooldown_until: now.plus_secs(policy.resend_cooldown_secs),
            expires_at: now.plus_secs(policy.code_ttl_secs),
            failed_attempts: 0,
            consumed_at: None,
            token_expires_at: None,
            revision: 0,
        }
    }

    pub fn cooldown_remaining(&self, now: Timestamp) -> u64 {
        self.cooldown_until.secs_until(&now)
    }

    pub fn in_cooldown(&self, now: Timestamp) -> bool {
        self.cooldown_remaining(now) > 0
    }

    /// Checks a submitted code, recording the attempt.
    ///
    /// The hash comparison runs even when the outcome is already decided so
    /// every rejection costs the same.
    pub fn verify(&mut self, submitted: &str, policy: &ResumePolicy, now: Timestamp) -> VerifyOutcome {
        let matches = code_matches(&self.email, submitted, &self.code_hash);

        let usable = self.consumed_at.is_none()
            && !now.is_after(&self.expires_at)
            && self.failed_attempts < policy.max_verify_attempts;
        self.revision += 1;

        match (usable, matches, self.intent_id) {
            (true, true, Some(intent_id)) => {
                self.consumed_at = Some(now);
                self.token_expires_at = Some(now.plus_secs(policy.token_ttl_secs));
                VerifyOutcome::Verified { intent_id }
            }
            _ => {
                self.failed_attempts = self.failed_attempts.saturating_add(1);
                VerifyOutcome::Rejected
            }
        }
    }

    /// True if the challenge was consumed and its token has not expired yet.
    pub fn has_live_token(&self, now: Timestamp) -> bool {
        self.consumed_at.is_some()
            && self
                .token_expires_at
                .map(|exp| !now.is_after(&exp))
                .unwrap_or(false)
    }

    /// True if a token with `token_id` issued for this challenge is still valid.
    pub fn accepts_token(&self, token_id: &ChallengeId, now: Timestamp) -> bool {
        self.id == *token_id && self.has_live_token(now)
    }

    /// Seconds the store should keep this record around.
    pub fn retention_secs(&self, now: Timestamp) -> u64 {
        let horizon = self.token_expires_at.unwrap_or(self.expires_at).max(self.cooldown_until);
        horizon.secs_until(&now).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> EmailAddress {
        EmailAddress::parse("reader@example.com").unwrap()
    }

    fn challenge(now: Timestamp) -> ResumeChallenge {
        ResumeChallenge::issue(
            email(),
            Some(IntentId::new(7).unwrap()),
            &OneTimeCode::from_digits("123456"),
            &ResumePolicy::default(),
            now,
        )
    }

    #[test]
    fn correct_code_verifies_once() {
        let now = Timestamp::now();
        let policy = ResumePolicy::default();
        let mut c = challenge(now);

        assert_eq!(
            c.verify("123456", &policy, now),
            VerifyOutcome::Verified {
                intent_id: IntentId::new(7).unwrap()
            }
        );
        assert!(c.accepts_token(&c.id.clone(), now));
        assert_eq!(c.verify("123456", &policy, now), VerifyOutcome::Rejected);
    }

    #[test]
    fn every_verification_bumps_the_revision() {
        let now = Timestamp::now();
        let policy = ResumePolicy::default();
        let mut c = challenge(now);

        c.verify("000000", &policy, now);
        c.verify("123456", &policy, now);
        c.verify("123456", &policy, now);

        assert_eq!(c.revision, 3);
        assert_eq!(c.failed_attempts, 2);
    }

    #[test]
    fn expired_code_is_rejected() {
        let now = Timestamp::now();
        let mut c = challenge(now);
        let later = now.plus_secs(601);
        assert_eq!(c.verify("123456", &ResumePolicy::default(), later), VerifyOutcome::Rejected);
    }

    #[test]
    fn too_many_failures_lock_the_challenge() {
        let now = Timestamp::now();
        let policy = ResumePolicy::default();
        let mut c = challenge(now);

        for _ in 0..policy.max_verify_attempts {
            assert_eq!(c.verify("000000", &policy, now), VerifyOutcome::Rejected);
        }
        assert_eq!(c.verify("123456", &policy, now), VerifyOutcome::Rejected);
    }

    #[test]
    fn decoy_challenge_never_verifies() {
        let now = Timestamp::now();
        let code = OneTimeCode::from_digits("123456");
        let mut c = ResumeChallenge::issue(email(), None, &code, &ResumePolicy::default(), now);
        assert_eq!(c.verify("123456", &ResumePolicy::default(), now), VerifyOutcome::Rejected);
    }

    #[test]
    fn cooldown_counts_down() {
        let now = Timestamp::now();
        let c = challenge(now);
        assert_eq!(c.cooldown_remaining(now), 60);
        assert!(c.in_cooldown(now.plus_secs(59)));
        assert!(!c.in_cooldown(now.plus_secs(60)));
    }

    #[test]
    fn token_expires_and_must_match_challenge() {
        let now = Timestamp::now();
        let policy = ResumePolicy::default();
        let mut c = challenge(now);
        c.verify("123456", &policy, now);

        assert!(!c.accepts_token(&ChallengeId::new(), now));
        assert!(!c.accepts_token(&c.id.clone(), now.plus_secs(policy.token_ttl_secs + 1)));
    }

    #[test]
    fn retention_covers_token_lifetime() {
        let now = Timestamp::now();
        let policy = ResumePolicy::default();
        let mut c = challenge(now);
        assert_eq!(c.retention_secs(now), policy.code_ttl_secs);

        c.verify("123456", &policy, now);
        assert_eq!(c.retention_secs(now), policy.token_ttl_secs);
    }
}
