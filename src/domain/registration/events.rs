//! Registration domain events.
//!
//! Published through the event publisher port as an audit trail of the
//! saga. Nothing inside the saga consumes them.

use crate::domain::foundation::{DomainEvent, IntentId, Timestamp};
use serde::{Deserialize, Serialize};

use super::{IntentStatus, ProviderKind};

/// Events emitted as a registration intent moves through the saga.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistrationEvent {
    IntentCreated {
        intent_id: IntentId,
        email: String,
        occurred_at: Timestamp,
    },
    PaymentInitiated {
        intent_id: IntentId,
        provider: ProviderKind,
        provider_reference: String,
        occurred_at: Timestamp,
    },
    PaymentSucceeded {
        intent_id: IntentId,
        provider_reference: String,
        occurred_at: Timestamp,
    },
    PaymentDeclined {
        intent_id: IntentId,
        provider_reference: String,
        reason: String,
        occurred_at: Timestamp,
    },
    /// A payment succeeded after another one already settled the intent.
    DuplicatePaymentDetected {
        intent_id: IntentId,
        provider_reference: String,
        reason: String,
        occurred_at: Timestamp,
    },
    IntentCompleted {
        intent_id: IntentId,
        account_id: String,
        occurred_at: Timestamp,
    },
    IntentFailed {
        intent_id: IntentId,
        previous_status: IntentStatus,
        reason: String,
        occurred_at: Timestamp,
    },
    ResumeTokenIssued {
        intent_id: IntentId,
        occurred_at: Timestamp,
    },
}

impl RegistrationEvent {
    pub fn intent_id(&self) -> IntentId {
        match self {
            RegistrationEvent::IntentCreated { intent_id, .. }
            | RegistrationEvent::PaymentInitiated { intent_id, .. }
            | RegistrationEvent::PaymentSucceeded { intent_id, .. }
            | RegistrationEvent::PaymentDeclined { intent_id, .. }
            | RegistrationEvent::DuplicatePaymentDetected { intent_id, .. }
            | RegistrationEvent::IntentCompleted { intent_id, .. }
            | RegistrationEvent::IntentFailed { intent_id, .. }
            | RegistrationEvent::ResumeTokenIssued { intent_id, .. } => *intent_id,
        }
    }
}

impl DomainEvent for RegistrationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RegistrationEvent::IntentCreated { .. } => "registration.intent_created.v1",
            RegistrationEvent::PaymentInitiated { .. } => "registration.payment_initiated.v1",
            RegistrationEvent::PaymentSucceeded { .. } => "registration.payment_succeeded.v1",
            RegistrationEvent::PaymentDeclined { .. } => "registration.payment_declined.v1",
            RegistrationEvent::DuplicatePaymentDetected { .. } => {
                "registration.duplicate_payment_detected.v1"
            }
            RegistrationEvent::IntentCompleted { .. } => "registration.intent_completed.v1",
            RegistrationEvent::IntentFailed { .. } => "registration.intent_failed.v1",
            RegistrationEvent::ResumeTokenIssued { .. } => "registration.resume_token_issued.v1",
        }
    }

    fn aggregate_id(&self) -> String {
        self.intent_id().to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "RegistrationIntent"
    }

    fn occurred_at(&self) -> Timestamp {
        match self {
            RegistrationEvent::IntentCreated { occurred_at, .. }
            | RegistrationEvent::PaymentInitiated { occurred_at, .. }
            | RegistrationEvent::PaymentSucceeded { occurred_at, .. }
            | RegistrationEvent::PaymentDeclined { occurred_at, .. }
            | RegistrationEvent::DuplicatePaymentDetected { occurred_at, .. }
            | RegistrationEvent::IntentCompleted { occurred_at, .. }
            | RegistrationEvent::IntentFailed { occurred_at, .. }
            | RegistrationEvent::ResumeTokenIssued { occurred_at, .. } => *occurred_at,
        }
    }
}
