//! Resume token authorization shared by the token-bearing resume handlers.

use std::sync::Arc;

use crate::domain::foundation::Timestamp;
use crate::domain::registration::{RegistrationError, RegistrationIntent};
use crate::ports::{ChallengeStore, IntentStore, ResumeTokens};

/// Resolves a resume token to the one intent it grants access to.
///
/// A token is honored only while it is unexpired, names the challenge
/// currently stored for its email, and that challenge points at an intent
/// with the same email that can still be paid for.
#[derive(Clone)]
pub struct ResumeAuthorizer {
    store: Arc<dyn IntentStore>,
    challenges: Arc<dyn ChallengeStore>,
    tokens: Arc<dyn ResumeTokens>,
}

impl ResumeAuthorizer {
    pub fn new(
        store: Arc<dyn IntentStore>,
        challenges: Arc<dyn ChallengeStore>,
        tokens: Arc<dyn ResumeTokens>,
    ) -> Self {
        Self {
            store,
            challenges,
            tokens,
        }
    }

    /// # Errors
    ///
    /// - `ResumeRejected` for a bad, expired, superseded or foreign token
    /// - `NotFound` if the intent is gone or no longer resumable
    pub async fn authorize(&self, token: &str) -> Result<RegistrationIntent, RegistrationError> {
        let claims = self.tokens.verify(token)?;
        let now = Timestamp::now();

        let challenge = self
            .challenges
            .get(&claims.email)
            .await?
            .filter(|c| c.accepts_token(&claims.token_id, now))
            .ok_or(RegistrationError::ResumeRejected)?;

        let intent_id = challenge.intent_id.ok_or(RegistrationError::ResumeRejected)?;
        let intent = self
            .store
            .find(intent_id)
            .await?
            .ok_or(RegistrationError::NotFound(intent_id))?;

        if intent.payload.email != claims.email {
            tracing::warn!(intent_id = %intent_id, "Resume token email does not match intent");
            return Err(RegistrationError::ResumeRejected);
        }
        if !intent.is_resumable(now) {
            tracing::debug!(intent_id = %intent_id, status = %intent.status, "Intent no longer resumable");
            return Err(RegistrationError::NotFound(intent_id));
        }

        Ok(intent)
    }
}
