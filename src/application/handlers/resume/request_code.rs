//! RequestCodeHandler - Sends a one-time resume code by email.
//!
//! The response never tells whether the email has a pending registration:
//! the shape and the cooldown behave the same either way.
//!
//! A challenge whose resume token is still live is kept as is, so asking
//! for another code never revokes a token already in use.

use std::sync::Arc;

use crate::domain::foundation::{EmailAddress, Timestamp};
use crate::domain::registration::RegistrationError;
use crate::domain::resume::{OneTimeCode, ResumeChallenge, ResumePolicy};
use crate::ports::{ChallengeStore, CodeSender, IntentStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestCodeCommand {
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestCodeResult {
    /// Seconds before another code may be requested.
    pub cooldown_secs: u64,
    /// Seconds the current code stays valid.
    pub expires_in_secs: u64,
}

pub struct RequestCodeHandler {
    store: Arc<dyn IntentStore>,
    challenges: Arc<dyn ChallengeStore>,
    code_sender: Arc<dyn CodeSender>,
    policy: ResumePolicy,
}

impl RequestCodeHandler {
    pub fn new(
        store: Arc<dyn IntentStore>,
        challenges: Arc<dyn ChallengeStore>,
        code_sender: Arc<dyn CodeSender>,
        policy: ResumePolicy,
    ) -> Self {
        Self {
            store,
            challenges,
            code_sender,
            policy,
        }
    }

    pub async fn handle(
        &self,
        cmd: RequestCodeCommand,
    ) -> Result<RequestCodeResult, RegistrationError> {
        let email = EmailAddress::parse(&cmd.email)?;
        let now = Timestamp::now();

        if let Some(existing) = self.challenges.get(&email).await? {
            if existing.in_cooldown(now) {
                return Ok(RequestCodeResult {
                    cooldown_secs: existing.cooldown_remaining(now),
                    expires_in_secs: existing.expires_at.secs_until(&now),
                });
            }
            if existing.has_live_token(now) {
                tracing::info!(
                    intent_id = ?existing.intent_id,
                    "Resume token still live, no new code issued"
                );
                return Ok(self.fresh_result());
            }
        }

        let intent_id = self
            .store
            .find_open_by_email(&email)
            .await?
            .filter(|intent| intent.is_resumable(now))
            .map(|intent| intent.id);

        let code = OneTimeCode::generate();
        let challenge = ResumeChallenge::issue(email.clone(), intent_id, &code, &self.policy, now);
        self.challenges
            .put(&challenge, challenge.retention_secs(now))
            .await?;

        match intent_id {
            Some(intent_id) => {
                if let Err(e) = self
                    .code_sender
                    .send_code(&email, &code, self.policy.code_ttl_secs)
                    .await
                {
                    tracing::error!(intent_id = %intent_id, error = %e, "Failed to send resume code");
                } else {
                    tracing::info!(intent_id = %intent_id, "Resume code sent");
                }
            }
            None => tracing::debug!("Resume code requested without a pending registration"),
        }

        Ok(self.fresh_result())
    }

    fn fresh_result(&self) -> RequestCodeResult {
        RequestCodeResult {
            cooldown_secs: self.policy.resend_cooldown_secs,
            expires_in_secs: self.policy.code_ttl_secs,
        }
    }
}
