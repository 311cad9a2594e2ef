//! Shared step of every path that learns a payment outcome.

use std::sync::Arc;

use crate::application::audit::publish_events;
use crate::application::IntentWriter;
use crate::domain::foundation::{IntentId, Timestamp};
use crate::domain::registration::{
    AttemptResolution, IntentStatus, PaymentPolicy, ProviderOutcome, RegistrationError,
    RegistrationEvent, RegistrationIntent,
};
use crate::ports::EventPublisher;

/// Applies a provider outcome to an intent and publishes what changed.
///
/// Callbacks, redirect confirmation and manual status checks all funnel
/// through here, in any order and any number of times.
#[derive(Clone)]
pub struct OutcomeRecorder {
    writer: IntentWriter,
    policy: PaymentPolicy,
    event_publisher: Arc<dyn EventPublisher>,
}

impl OutcomeRecorder {
    pub fn new(
        writer: IntentWriter,
        policy: PaymentPolicy,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            writer,
            policy,
            event_publisher,
        }
    }

    pub async fn record(
        &self,
        intent_id: IntentId,
        reference: &str,
        outcome: &ProviderOutcome,
    ) -> Result<(RegistrationIntent, AttemptResolution), RegistrationError> {
        let policy = self.policy;
        let now = Timestamp::now();

        let (intent, (resolution, previous_status)) = self
            .writer
            .update(intent_id, |intent| {
                let previous_status = intent.status;
                let resolution = intent.apply_outcome(reference, outcome, &policy, now)?;
                let changed = resolution.changed();
                Ok(((resolution, previous_status), changed))
            })
            .await?;

        let events = resolution_events(&intent, reference, &resolution, previous_status, now);
        publish_events(self.event_publisher.as_ref(), events).await;

        Ok((intent, resolution))
    }
}

fn resolution_events(
    intent: &RegistrationIntent,
    reference: &str,
    resolution: &AttemptResolution,
    previous_status: IntentStatus,
    now: Timestamp,
) -> Vec<RegistrationEvent> {
    let intent_id = intent.id;
    let provider_reference = reference.to_string();

    match resolution {
        AttemptResolution::Unchanged => vec![],
        AttemptResolution::Paid => {
            tracing::info!(intent_id = %intent_id, reference = %reference, "Payment succeeded");
            vec![RegistrationEvent::PaymentSucceeded {
                intent_id,
                provider_reference,
                occurred_at: now,
            }]
        }
        AttemptResolution::Declined {
            reason,
            intent_failed,
        } => {
            tracing::info!(
                intent_id = %intent_id,
                reference = %reference,
                reason = %reason,
                intent_failed,
                "Payment declined"
            );
            let mut events = vec![RegistrationEvent::PaymentDeclined {
                intent_id,
                provider_reference,
                reason: reason.clone(),
                occurred_at: now,
            }];
            if *intent_failed {
                events.push(RegistrationEvent::IntentFailed {
                    intent_id,
                    previous_status,
                    reason: intent
                        .failure_reason
                        .clone()
                        .unwrap_or_else(|| reason.clone()),
                    occurred_at: now,
                });
            }
            events
        }
        AttemptResolution::RefundRequired { reason } => {
            tracing::warn!(
                intent_id = %intent_id,
                reference = %reference,
                status = %intent.status,
                "Duplicate payment detected, manual refund required"
            );
            vec![RegistrationEvent::DuplicatePaymentDetected {
                intent_id,
                provider_reference,
                reason: reason.clone(),
                occurred_at: now,
            }]
        }
    }
}
