//! HTTP DTOs for resume endpoints.

use serde::{Deserialize, Serialize};

use crate::application::{IntentView, PendingRegistration, RequestCodeResult, VerifyCodeResult};

#[derive(Debug, Clone, Deserialize)]
pub struct RequestCodeRequest {
    pub email: String,
}

/// Same shape whether or not the email has a pending registration.
#[derive(Debug, Clone, Serialize)]
pub struct RequestCodeResponse {
    pub cooldown_secs: u64,
    pub expires_in_secs: u64,
}

impl From<RequestCodeResult> for RequestCodeResponse {
    fn from(result: RequestCodeResult) -> Self {
        Self {
            cooldown_secs: result.cooldown_secs,
            expires_in_secs: result.expires_in_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyCodeResponse {
    pub resume_token: String,
    pub token_type: &'static str,
    pub expires_in_secs: u64,
}

impl From<VerifyCodeResult> for VerifyCodeResponse {
    fn from(result: VerifyCodeResult) -> Self {
        Self {
            resume_token: result.resume_token,
            token_type: "Bearer",
            expires_in_secs: result.expires_in_secs,
        }
    }
}

/// Enough of the stored form to prefill the payment step.
#[derive(Debug, Clone, Serialize)]
pub struct PendingRegistrationResponse {
    pub intent: IntentView,
    pub email: String,
    pub username: String,
    pub full_name: String,
}

impl From<PendingRegistration> for PendingRegistrationResponse {
    fn from(pending: PendingRegistration) -> Self {
        Self {
            intent: pending.intent,
            email: pending.email,
            username: pending.username,
            full_name: pending.full_name,
        }
    }
}
