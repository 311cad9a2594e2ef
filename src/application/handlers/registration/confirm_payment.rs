//! ConfirmPaymentHandler - Command handler for a payer returning from hosted checkout.

use std::sync::Arc;

use crate::application::{IntentView, OutcomeRecorder, PaymentProviderAdapter};
use crate::domain::foundation::IntentId;
use crate::domain::registration::{AttemptResolution, ProviderKind, ProviderOutcome, RegistrationError};
use crate::ports::IntentStore;

/// Command issued when the payer lands back on our return URL.
///
/// The return URL parameters are only a hint; the outcome comes from the
/// provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPaymentCommand {
    pub intent_id: IntentId,
    pub provider_reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPaymentResult {
    pub outcome: ProviderOutcome,
    pub resolution: AttemptResolution,
    pub intent: IntentView,
}

pub struct ConfirmPaymentHandler {
    store: Arc<dyn IntentStore>,
    payments: Arc<PaymentProviderAdapter>,
    recorder: OutcomeRecorder,
}

impl ConfirmPaymentHandler {
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
        cmd: ConfirmPaymentCommand,
    ) -> Result<ConfirmPaymentResult, RegistrationError> {
        let intent = self
            .store
            .find(cmd.intent_id)
            .await?
            .ok_or(RegistrationError::NotFound(cmd.intent_id))?;

        let belongs = intent
            .attempt_by_reference(&cmd.provider_reference)
            .map(|a| a.provider == ProviderKind::Redirect)
            .unwrap_or(false);
        if !belongs {
            tracing::warn!(
                intent_id = %cmd.intent_id,
                reference = %cmd.provider_reference,
                "Confirmation for a reference not issued to this intent"
            );
            return Err(RegistrationError::validation(
                "provider_reference",
                "Reference does not belong to this registration",
            ));
        }

        let outcome = self.payments.confirm(&cmd.provider_reference).await?;
        let (intent, resolution) = self
            .recorder
            .record(cmd.intent_id, &cmd.provider_reference, &outcome)
            .await?;

        tracing::debug!(
            intent_id = %intent.id,
            reference = %cmd.provider_reference,
            outcome = ?outcome,
            "Redirect payment confirmed with provider"
        );

        Ok(ConfirmPaymentResult {
            outcome,
            resolution,
            intent: IntentView::from(&intent),
        })
    }
}
