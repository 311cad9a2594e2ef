//! ProviderCallbackHandler - Applies signed provider callbacks.
//!
//! Callbacks may arrive late, twice, out of order, or for references we
//! never issued. Only an invalid signature is an error to the caller; every
//! other case is acknowledged so the provider stops retrying.
//!
//! A push callback can beat the write that records its attempt, so an
//! unknown reference is looked up again for a short grace period.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::application::{OutcomeRecorder, PaymentProviderAdapter};
use crate::domain::foundation::IntentId;
use crate::domain::registration::{
    AttemptResolution, ProviderKind, RegistrationError, RegistrationIntent,
};
use crate::ports::IntentStore;

const RECHECK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCallbackCommand {
    pub provider: ProviderKind,
    /// Raw body exactly as received; the signature covers these bytes.
    pub payload: Vec<u8>,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackDisposition {
    Applied {
        intent_id: IntentId,
        resolution: AttemptResolution,
    },
    /// No intent owns the reference, even after the grace period.
    /// Acknowledged and dropped.
    UnknownReference { provider_reference: String },
}

pub struct ProviderCallbackHandler {
    store: Arc<dyn IntentStore>,
    payments: Arc<PaymentProviderAdapter>,
    recorder: OutcomeRecorder,
    grace_period: Duration,
}

impl ProviderCallbackHandler {
    pub fn new(
        store: Arc<dyn IntentStore>,
        payments: Arc<PaymentProviderAdapter>,
        recorder: OutcomeRecorder,
    ) -> Self {
        Self {
            store,
            payments,
            recorder,
            grace_period: Duration::ZERO,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub async fn handle(
        &self,
        cmd: ProviderCallbackCommand,
    ) -> Result<CallbackDisposition, RegistrationError> {
        let event = self
            .payments
            .parse_callback(cmd.provider, &cmd.payload, &cmd.signature)
            .await
            .map_err(|e| {
                tracing::warn!(provider = %cmd.provider, error = %e, "Rejected provider callback");
                e
            })?;

        let Some(intent) = self.find_owner(&event.provider_reference).await? else {
            tracing::warn!(
                provider = %cmd.provider,
                reference = %event.provider_reference,
                "Callback for unknown payment reference"
            );
            return Ok(CallbackDisposition::UnknownReference {
                provider_reference: event.provider_reference,
            });
        };

        let (_, resolution) = self
            .recorder
            .record(intent.id, &event.provider_reference, &event.outcome)
            .await?;

        tracing::info!(
            intent_id = %intent.id,
            provider = %cmd.provider,
            reference = %event.provider_reference,
            changed = resolution.changed(),
            "Provider callback processed"
        );

        Ok(CallbackDisposition::Applied {
            intent_id: intent.id,
            resolution,
        })
    }

    async fn find_owner(
        &self,
        reference: &str,
    ) -> Result<Option<RegistrationIntent>, RegistrationError> {
        let deadline = Instant::now() + self.grace_period;
        loop {
            if let Some(intent) = self.store.find_by_reference(reference).await? {
                return Ok(Some(intent));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tracing::debug!(reference = %reference, "Callback reference not recorded yet");
            tokio::time::sleep(RECHECK_INTERVAL.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::payments::MockPushProvider;
    use crate::application::handlers::test_fixtures::Fixture;
    use crate::domain::registration::{IntentStatus, ProviderOutcome};

    fn push_callback(reference: &str, outcome: ProviderOutcome) -> ProviderCallbackCommand {
        ProviderCallbackCommand {
            provider: ProviderKind::Push,
            payload: MockPushProvider::callback_payload(reference, outcome),
            signature: "t=1,v1=ok".to_string(),
        }
    }

    #[tokio::test]
    async fn success_callback_marks_intent_paid() {
        let fx = Fixture::new();
        let (id, reference) = fx.intent_with_push_attempt().await;

        let disposition = fx
            .services
            .provider_callback_handler()
            .handle(push_callback(&reference, ProviderOutcome::Succeeded))
            .await
            .unwrap();

        assert_eq!(
            disposition,
            CallbackDisposition::Applied {
                intent_id: id,
                resolution: AttemptResolution::Paid
            }
        );
        assert_eq!(fx.intent(id).await.status, IntentStatus::Paid);
    }

    #[tokio::test]
    async fn duplicate_callback_is_a_no_op() {
        let fx = Fixture::new();
        let (id, reference) = fx.intent_with_push_attempt().await;
        let handler = fx.services.provider_callback_handler();

        handler
            .handle(push_callback(&reference, ProviderOutcome::Succeeded))
            .await
            .unwrap();
        let second = handler
            .handle(push_callback(&reference, ProviderOutcome::Succeeded))
            .await
            .unwrap();

        assert_eq!(
            second,
            CallbackDisposition::Applied {
                intent_id: id,
                resolution: AttemptResolution::Unchanged
            }
        );
        assert_eq!(
            fx.events
                .events_of_type("registration.payment_succeeded.v1")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn decline_after_success_changes_nothing() {
        let fx = Fixture::new();
        let (id, reference) = fx.intent_with_push_attempt().await;
        let handler = fx.services.provider_callback_handler();

        handler
            .handle(push_callback(&reference, ProviderOutcome::Succeeded))
            .await
            .unwrap();
        handler
            .handle(push_callback(
                &reference,
                ProviderOutcome::Declined {
                    reason: "cancelled by user".to_string(),
                },
            ))
            .await
            .unwrap();

        assert_eq!(fx.intent(id).await.status, IntentStatus::Paid);
    }

    #[tokio::test]
    async fn unknown_reference_is_acknowledged() {
        let fx = Fixture::new();

        let disposition = fx
            .services
            .provider_callback_handler()
            .handle(push_callback("ws_CO_unknown", ProviderOutcome::Succeeded))
            .await
            .unwrap();

        assert_eq!(
            disposition,
            CallbackDisposition::UnknownReference {
                provider_reference: "ws_CO_unknown".to_string()
            }
        );
    }

    #[tokio::test]
    async fn callback_ahead_of_its_attempt_is_applied() {
        let fx = Fixture::new();
        let (id, _) = fx.intent_with_push_attempt().await;
        let reference = "ws_CO_late";

        let handler = fx.services.provider_callback_handler();
        let callback = handler.handle(push_callback(reference, ProviderOutcome::Succeeded));
        let record = async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            fx.add_pending_attempt(id, reference).await
        };
        let (disposition, _) = tokio::join!(callback, record);

        assert_eq!(
            disposition.unwrap(),
            CallbackDisposition::Applied {
                intent_id: id,
                resolution: AttemptResolution::Paid
            }
        );
        assert_eq!(fx.intent(id).await.status, IntentStatus::Paid);
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_before_any_lookup() {
        let fx = Fixture::builder()
            .push(MockPushProvider::rejecting_callbacks())
            .build();
        let (id, reference) = fx.intent_with_push_attempt().await;

        let err = fx
            .services
            .provider_callback_handler()
            .handle(push_callback(&reference, ProviderOutcome::Succeeded))
            .await
            .unwrap_err();

        assert_eq!(err, RegistrationError::InvalidSignature);
        assert_eq!(fx.intent(id).await.status, IntentStatus::PaymentRequired);
    }
}
