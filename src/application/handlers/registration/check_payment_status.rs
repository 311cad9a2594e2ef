//! CheckPaymentStatusHandler - Manual "check status" action.
//!
//! Queries the provider for every pending attempt of an intent and applies
//! what it reports. One unreachable provider does not stop the others from
//! being checked.

use std::sync::Arc;

use crate::application::{IntentView, OutcomeRecorder, PaymentProviderAdapter};
use crate::domain::foundation::IntentId;
use crate::domain::registration::RegistrationError;
use crate::ports::IntentStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckPaymentStatusCommand {
    pub intent_id: IntentId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckPaymentStatusResult {
    pub intent: IntentView,
    /// Pending attempts the provider answered for.
    pub checked_attempts: usize,
}

pub struct CheckPaymentStatusHandler {
    store: Arc<dyn IntentStore>,
    payments: Arc<PaymentProviderAdapter>,
    recorder: OutcomeRecorder,
}

impl CheckPaymentStatusHandler {
    pub fn new(
        store: Arc<dyn IntentStore>,
        payments: Arc<PaymentProviderAdapter>,
        recorder: OutcomeRecorder,
    ) -> Self {
        Self {
            store,
            payments,
            recorder,
        }
    }

    pub async fn handle(
        &self,
        cmd: CheckPaymentStatusCommand,
    ) -> Result<CheckPaymentStatusResult, RegistrationError> {
        let mut intent = self
            .store
            .find(cmd.intent_id)
            .await?
            .ok_or(RegistrationError::NotFound(cmd.intent_id))?;

        let pending: Vec<_> = intent
            .pending_attempts()
            .map(|a| (a.provider, a.provider_reference.clone()))
            .collect();

        let mut checked = 0;
        for (provider, reference) in pending {
            let outcome = match self.payments.query(provider, &reference).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(
                        intent_id = %cmd.intent_id,
                        provider = %provider,
                        reference = %reference,
                        error = %e,
                        "Status check failed, skipping attempt"
                    );
                    continue;
                }
            };
            checked += 1;
            let (updated, _) = self
                .recorder
                .record(cmd.intent_id, &reference, &outcome)
                .await?;
            intent = updated;
        }

        Ok(CheckPaymentStatusResult {
            intent: IntentView::from(&intent),
            checked_attempts: checked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_fixtures::Fixture;
    use crate::domain::registration::{IntentStatus, ProviderOutcome};
    use crate::ports::PaymentError;

    #[tokio::test]
    async fn paid_attempt_is_applied() {
        let fx = Fixture::new();
        let (id, reference) = fx.intent_with_push_attempt().await;
        fx.push.set_outcome(&reference, ProviderOutcome::Succeeded);

        let result = fx
            .services
            .check_payment_status_handler()
            .handle(CheckPaymentStatusCommand { intent_id: id })
            .await
            .unwrap();

        assert_eq!(result.checked_attempts, 1);
        assert_eq!(result.intent.status, IntentStatus::Paid);
    }

    #[tokio::test]
    async fn unreachable_provider_is_skipped() {
        let fx = Fixture::new();
        let (id, push_ref) = fx.intent_with_push_attempt().await;
        let redirect_ref = fx.add_redirect_attempt(id).await;
        fx.push
            .fail_method("query_push", PaymentError::network("connection reset"));
        fx.checkout
            .set_outcome(&redirect_ref, ProviderOutcome::Succeeded);

        let result = fx
            .services
            .check_payment_status_handler()
            .handle(CheckPaymentStatusCommand { intent_id: id })
            .await
            .unwrap();

        assert_eq!(result.checked_attempts, 1);
        assert_eq!(result.intent.status, IntentStatus::Paid);
        let push_attempt = result
            .intent
            .attempts
            .iter()
            .find(|a| a.provider_reference == push_ref)
            .unwrap();
        assert_eq!(
            push_attempt.outcome,
            crate::domain::registration::AttemptOutcome::Pending
        );
    }

    #[tokio::test]
    async fn nothing_pending_means_no_provider_calls() {
        let fx = Fixture::new();
        let intent = fx.create_intent("a@b.co").await;

        let result = fx
            .services
            .check_payment_status_handler()
            .handle(CheckPaymentStatusCommand {
                intent_id: intent.id,
            })
            .await
            .unwrap();

        assert_eq!(result.checked_attempts, 0);
        assert!(fx.push.calls().is_empty());
        assert!(fx.checkout.calls().is_empty());
    }
}
