//! InitiatePaymentHandler - Command handler for selecting a provider and starting a payment.

use std::sync::Arc;

use crate::application::audit::publish_events;
use crate::application::{IntentView, IntentWriter, PaymentProviderAdapter};
use crate::domain::foundation::{IntentId, Timestamp};
use crate::domain::registration::{
    PaymentAttempt, PaymentInitiation, PaymentMode, PaymentPolicy, ProviderParams,
    RegistrationError, RegistrationEvent,
};
use crate::ports::EventPublisher;

/// Command to start a payment for an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatePaymentCommand {
    pub intent_id: IntentId,
    pub params: ProviderParams,
}

/// Result of a successful initiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatePaymentResult {
    pub initiation: PaymentInitiation,
    pub intent: IntentView,
}

/// Starts a payment with the selected provider and records the attempt.
///
/// The intent moves to `PaymentRequired` and takes the initiation lease
/// before the provider is contacted; the lease is saved under the version
/// check, so only one concurrent initiation per intent reaches a provider.
/// A provider failure records no attempt, releases the lease and is not
/// retried here.
#[derive(Clone)]
pub struct InitiatePaymentHandler {
    writer: IntentWriter,
    payments: Arc<PaymentProviderAdapter>,
    policy: PaymentPolicy,
    event_publisher: Arc<dyn EventPublisher>,
}

impl InitiatePaymentHandler {
    pub fn new(
        writer: IntentWriter,
        payments: Arc<PaymentProviderAdapter>,
        policy: PaymentPolicy,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            writer,
            payments,
            policy,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: InitiatePaymentCommand,
    ) -> Result<InitiatePaymentResult, RegistrationError> {
        let params = cmd.params.validated()?;
        let provider = params.kind();
        let policy = self.policy;
        let now = Timestamp::now();

        // 1. Retire stale intents
        let (intent, expired_from) = self
            .writer
            .update(cmd.intent_id, |intent| {
                let previous_status = intent.status;
                let expired = intent.expire_if_stale(now);
                Ok((expired.then_some(previous_status), expired))
            })
            .await?;
        if let Some(previous_status) = expired_from {
            tracing::info!(intent_id = %intent.id, "Registration intent expired");
            publish_events(
                self.event_publisher.as_ref(),
                vec![RegistrationEvent::IntentFailed {
                    intent_id: intent.id,
                    previous_status,
                    reason: "registration expired".to_string(),
                    occurred_at: now,
                }],
            )
            .await;
        }

        // 2. Attempt policy, initiation lease and CREATED -> PAYMENT_REQUIRED
        let (intent, _) = self
            .writer
            .update(cmd.intent_id, |intent| {
                intent.prepare_payment(&policy, now)?;
                Ok(((), true))
            })
            .await?;

        // 3. Contact the provider
        let initiation = match self.payments.initiate(&intent, params).await {
            Ok(initiation) => initiation,
            Err(e) => {
                self.release_lease(cmd.intent_id).await;
                return Err(e);
            }
        };

        tracing::info!(
            intent_id = %intent.id,
            provider = %provider,
            reference = %initiation.provider_reference,
            "Payment initiated"
        );

        // 4. Record the attempt
        let authorization_url = match &initiation.mode {
            PaymentMode::Redirect { authorization_url } => Some(authorization_url.clone()),
            PaymentMode::PushPending => None,
        };
        let reference = initiation.provider_reference.clone();
        let recorded_at = Timestamp::now();
        let (intent, _) = self
            .writer
            .update(cmd.intent_id, |intent| {
                intent.record_attempt(PaymentAttempt::pending(
                    provider,
                    reference.clone(),
                    intent.fee.clone(),
                    authorization_url.clone(),
                    recorded_at,
                ))?;
                Ok(((), true))
            })
            .await
            .map_err(|e| {
                tracing::error!(
                    intent_id = %cmd.intent_id,
                    reference = %reference,
                    error = %e,
                    "Payment started but attempt could not be recorded"
                );
                e
            })?;

        publish_events(
            self.event_publisher.as_ref(),
            vec![RegistrationEvent::PaymentInitiated {
                intent_id: intent.id,
                provider,
                provider_reference: reference,
                occurred_at: recorded_at,
            }],
        )
        .await;

        Ok(InitiatePaymentResult {
            initiation,
            intent: IntentView::from(&intent),
        })
    }

    /// Lets the next initiation through right away. A failed release only
    /// delays it until the lease lapses.
    async fn release_lease(&self, intent_id: IntentId) {
        let released = self
            .writer
            .update(intent_id, |intent| {
                let changed = intent.release_initiation();
                Ok(((), changed))
            })
            .await;
        if let Err(e) = released {
            tracing::warn!(intent_id = %intent_id, error = %e, "Failed to release initiation lease");
        }
    }
}
