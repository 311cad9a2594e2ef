//! HTTP DTOs for registration endpoints.
//!
//! Responses carry an [`IntentView`], never the stored form payload.

use serde::{Deserialize, Serialize};

use crate::application::{
    CheckPaymentStatusResult, ConfirmPaymentResult, CreateIntentResult,
    FinalizeRegistrationResult, InitiatePaymentResult, IntentView, ReconcileOutcome,
};
use crate::domain::foundation::IntentId;
use crate::domain::registration::{AttemptResolution, PaymentInitiation, ProviderOutcome};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Signup form submission.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRegistrationRequest {
    pub email: String,
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    /// Intent id cached by the client, if it has one.
    #[serde(default)]
    pub intent_id: Option<IntentId>,
}

/// Redirect reference handed back by the hosted checkout page.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub reference: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationResponse {
    pub intent: IntentView,
    /// True if an existing intent was returned instead of a new one.
    pub recovered: bool,
}

impl From<CreateIntentResult> for RegistrationResponse {
    fn from(result: CreateIntentResult) -> Self {
        Self {
            intent: result.intent,
            recovered: result.recovered,
        }
    }
}

/// Where the client goes next after starting a payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub payment: PaymentInitiation,
    pub intent: IntentView,
}

impl From<InitiatePaymentResult> for PaymentResponse {
    fn from(result: InitiatePaymentResult) -> Self {
        Self {
            payment: result.initiation,
            intent: result.intent,
        }
    }
}

/// Effect of a provider outcome on the intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionResponse {
    Unchanged,
    Paid,
    Declined { reason: String, intent_failed: bool },
    RefundRequired { reason: String },
}

impl From<AttemptResolution> for ResolutionResponse {
    fn from(resolution: AttemptResolution) -> Self {
        match resolution {
            AttemptResolution::Unchanged => ResolutionResponse::Unchanged,
            AttemptResolution::Paid => ResolutionResponse::Paid,
            AttemptResolution::Declined {
                reason,
                intent_failed,
            } => ResolutionResponse::Declined {
                reason,
                intent_failed,
            },
            AttemptResolution::RefundRequired { reason } => {
                ResolutionResponse::RefundRequired { reason }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmPaymentResponse {
    #[serde(flatten)]
    pub outcome: ProviderOutcome,
    pub resolution: ResolutionResponse,
    pub intent: IntentView,
}

impl From<ConfirmPaymentResult> for ConfirmPaymentResponse {
    fn from(result: ConfirmPaymentResult) -> Self {
        Self {
            outcome: result.outcome,
            resolution: result.resolution.into(),
            intent: result.intent,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckStatusResponse {
    pub intent: IntentView,
    pub checked_attempts: usize,
}

impl From<CheckPaymentStatusResult> for CheckStatusResponse {
    fn from(result: CheckPaymentStatusResult) -> Self {
        Self {
            intent: result.intent,
            checked_attempts: result.checked_attempts,
        }
    }
}

/// Terminal result of a reconciliation run that the client can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileResult {
    Paid,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileResponse {
    pub result: ReconcileResult,
    pub intent: IntentView,
}

impl ReconcileResult {
    pub fn from_outcome(outcome: &ReconcileOutcome) -> Option<Self> {
        match outcome {
            ReconcileOutcome::Paid => Some(ReconcileResult::Paid),
            ReconcileOutcome::Completed => Some(ReconcileResult::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteRegistrationResponse {
    pub intent_id: IntentId,
    pub account_id: String,
    /// False when an earlier call already completed the registration.
    pub newly_completed: bool,
}

impl From<FinalizeRegistrationResult> for CompleteRegistrationResponse {
    fn from(result: FinalizeRegistrationResult) -> Self {
        Self {
            intent_id: result.intent_id,
            account_id: result.account_id,
            newly_completed: result.newly_completed,
        }
    }
}
