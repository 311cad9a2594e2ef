//! Intent store port.
//!
//! The single source of truth for registration intents and their payment
//! attempts. Writers follow load, mutate, save: `save` succeeds only if the
//! stored version still equals `intent.version`, so two concurrent writers
//! can never both apply a transition computed from the same snapshot.
//!
//! # Example
//!
//! ```ignore
//! let mut intent = store.find(id).await?.ok_or(RegistrationError::NotFound(id))?;
//! intent.apply_outcome(&reference, &outcome, &policy, Timestamp::now())?;
//! intent.version = store.save(&intent).await?;
//! ```

use crate::domain::foundation::{DomainError, EmailAddress, IntentId, Timestamp};
use crate::domain::registration::{
    AttemptOutcome, IntentStatus, NewIntent, NextAction, ProviderKind, RegistrationIntent,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Repository port for registration intents.
#[async_trait]
pub trait IntentStore: Send + Sync {
    /// Persists a new intent and assigns its id.
    async fn create(&self, intent: NewIntent) -> Result<RegistrationIntent, DomainError>;

    /// Loads a full intent, including all payment attempts.
    async fn find(&self, id: IntentId) -> Result<Option<RegistrationIntent>, DomainError>;

    /// Loads the intent owning the attempt with `provider_reference`.
    async fn find_by_reference(
        &self,
        provider_reference: &str,
    ) -> Result<Option<RegistrationIntent>, DomainError>;

    /// Most recently created intent for `email` that is not yet finalized or failed.
    async fn find_open_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<RegistrationIntent>, DomainError>;

    /// Writes the intent if its stored version equals `intent.version`.
    ///
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// - `VersionConflict` if another writer saved first
    /// - `IntentNotFound` if the intent does not exist
    async fn save(&self, intent: &RegistrationIntent) -> Result<i64, DomainError>;

    /// Lightweight read used by pollers.
    async fn status(&self, id: IntentId) -> Result<Option<IntentStatusView>, DomainError>;
}

/// Read model returned by [`IntentStore::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentStatusView {
    pub intent_id: IntentId,
    pub status: IntentStatus,
    pub next_action: NextAction,
    pub failure_reason: Option<String>,
    pub attempts: Vec<AttemptStatusView>,
    pub updated_at: Timestamp,
}

impl IntentStatusView {
    pub fn from_intent(intent: &RegistrationIntent) -> Self {
        Self {
            intent_id: intent.id,
            status: intent.status,
            next_action: intent.next_action(),
            failure_reason: intent.failure_reason.clone(),
            attempts: intent
                .attempts
                .iter()
                .map(|a| AttemptStatusView {
                    provider: a.provider,
                    provider_reference: a.provider_reference.clone(),
                    outcome: a.outcome,
                    failure_reason: a.failure_reason.clone(),
                })
                .collect(),
            updated_at: intent.updated_at,
        }
    }

    pub fn attempt(&self, reference: &str) -> Option<&AttemptStatusView> {
        self.attempts.iter().find(|a| a.provider_reference == reference)
    }
}

/// Per-attempt part of [`IntentStatusView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptStatusView {
    pub provider: ProviderKind,
    pub provider_reference: String,
    pub outcome: AttemptOutcome,
    pub failure_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registration::test_support;

    #[test]
    fn intent_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn IntentStore) {}
    }

    #[test]
    fn status_view_mirrors_intent() {
        let intent = test_support::intent(5);
        let view = IntentStatusView::from_intent(&intent);

        assert_eq!(view.intent_id, intent.id);
        assert_eq!(view.status, IntentStatus::Created);
        assert_eq!(view.next_action, NextAction::PaymentRequired);
        assert!(view.attempts.is_empty());
    }
}
