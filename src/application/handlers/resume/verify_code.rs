//! VerifyCodeHandler - Exchanges a one-time code for a resume token.

use std::sync::Arc;

use crate::application::audit::publish_events;
use crate::domain::foundation::{EmailAddress, Timestamp};
use crate::domain::registration::{RegistrationError, RegistrationEvent};
use crate::domain::resume::{code_matches, ResumeChallenge, ResumePolicy, VerifyOutcome};
use crate::ports::{ChallengeStore, EventPublisher, ResumeClaims, ResumeTokens};

/// Lost swaps tolerated per submission. Each lost swap means another
/// submission was recorded first.
const MAX_SWAP_ATTEMPTS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyCodeCommand {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyCodeResult {
    pub resume_token: String,
    pub expires_in_secs: u64,
}

/// Every rejection, whatever its cause, is the same `ResumeRejected`.
///
/// Each submission is recorded with a compare-and-swap on the challenge, so
/// concurrent guesses are all counted and a code is consumed exactly once.
pub struct VerifyCodeHandler {
    challenges: Arc<dyn ChallengeStore>,
    tokens: Arc<dyn ResumeTokens>,
    event_publisher: Arc<dyn EventPublisher>,
    policy: ResumePolicy,
}

impl VerifyCodeHandler {
    pub fn new(
        challenges: Arc<dyn ChallengeStore>,
        tokens: Arc<dyn ResumeTokens>,
        event_publisher: Arc<dyn EventPublisher>,
        policy: ResumePolicy,
    ) -> Self {
        Self {
            challenges,
            tokens,
            event_publisher,
            policy,
        }
    }

    pub async fn handle(&self, cmd: VerifyCodeCommand) -> Result<VerifyCodeResult, RegistrationError> {
        let email = EmailAddress::parse(&cmd.email).map_err(|_| RegistrationError::ResumeRejected)?;
        let now = Timestamp::now();

        let (challenge, outcome) = self.record_submission(&email, &cmd.code, now).await?;

        let VerifyOutcome::Verified { intent_id } = outcome else {
            tracing::info!(
                failed_attempts = challenge.failed_attempts,
                "Resume code rejected"
            );
            return Err(RegistrationError::ResumeRejected);
        };

        let expires_at = challenge
            .token_expires_at
            .unwrap_or_else(|| now.plus_secs(self.policy.token_ttl_secs));
        let resume_token = self.tokens.issue(&ResumeClaims {
            email,
            token_id: challenge.id.clone(),
            expires_at,
        })?;

        tracing::info!(intent_id = %intent_id, "Resume token issued");
        publish_events(
            self.event_publisher.as_ref(),
            vec![RegistrationEvent::ResumeTokenIssued {
                intent_id,
                occurred_at: now,
            }],
        )
        .await;

        Ok(VerifyCodeResult {
            resume_token,
            expires_in_secs: expires_at.secs_until(&now),
        })
    }

    async fn record_submission(
        &self,
        email: &EmailAddress,
        code: &str,
        now: Timestamp,
    ) -> Result<(ResumeChallenge, VerifyOutcome), RegistrationError> {
        for _ in 0..MAX_SWAP_ATTEMPTS {
            let Some(current) = self.challenges.get(email).await? else {
                // Same hashing work as a real comparison
                let _ = code_matches(email, code, "");
                return Err(RegistrationError::ResumeRejected);
            };

            let mut next = current.clone();
            let outcome = next.verify(code, &self.policy, now);
            if self
                .challenges
                .replace(&current, &next, next.retention_secs(now))
                .await?
            {
                return Ok((next, outcome));
            }
            tracing::debug!("Resume challenge changed concurrently, retrying");
        }

        tracing::warn!("Resume code submission lost every challenge swap");
        Err(RegistrationError::ResumeRejected)
    }
}
