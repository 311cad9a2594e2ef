//! Registration saga error taxonomy.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Validation / InvalidProviderParams | 400 |
//! | ResumeRejected / InvalidSignature | 401 |
//! | PaymentDeclined | 402 |
//! | NotFound | 404 |
//! | Conflict / VersionConflict | 409 |
//! | RateLimited | 429 |
//! | ProviderInitiationFailed | 502 |
//! | StillPending | 202 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, IntentId, ValidationError};

use super::ProviderKind;

/// Errors surfaced by the registration saga.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Registration form or request did not validate.
    Validation { field: String, message: String },

    /// Provider parameters do not match the selected provider.
    InvalidProviderParams { reason: String },

    /// Provider refused or failed to start the payment. No attempt recorded.
    ProviderInitiationFailed { provider: ProviderKind, reason: String },

    /// Provider reported the payer declined or the charge failed.
    PaymentDeclined { reason: String },

    /// No terminal outcome within the reconciliation window.
    StillPending { intent_id: IntentId, retry_after_secs: u64 },

    /// Resume code or token was not accepted. Intentionally undifferentiated.
    ResumeRejected,

    /// Webhook signature did not verify.
    InvalidSignature,

    /// Operation not allowed in the intent's current state.
    Conflict { current: String, attempted: String },

    /// Concurrent modification detected by the store.
    VersionConflict(IntentId),

    /// Intent does not exist.
    NotFound(IntentId),

    /// Attempt cap or cooldown reached.
    RateLimited { retry_after_secs: u64, reason: String },

    /// Storage, network or other infrastructure failure.
    Infrastructure(String),
}

impl RegistrationError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        RegistrationError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_provider_params(reason: impl Into<String>) -> Self {
        RegistrationError::InvalidProviderParams {
            reason: reason.into(),
        }
    }

    pub fn initiation_failed(provider: ProviderKind, reason: impl Into<String>) -> Self {
        RegistrationError::ProviderInitiationFailed {
            provider,
            reason: reason.into(),
        }
    }

    pub fn declined(reason: impl Into<String>) -> Self {
        RegistrationError::PaymentDeclined {
            reason: reason.into(),
        }
    }

    pub fn conflict(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        RegistrationError::Conflict {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn rate_limited(retry_after_secs: u64, reason: impl Into<String>) -> Self {
        RegistrationError::RateLimited {
            retry_after_secs,
            reason: reason.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        RegistrationError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistrationError::Validation { .. } => ErrorCode::ValidationFailed,
            RegistrationError::InvalidProviderParams { .. } => ErrorCode::InvalidProviderParams,
            RegistrationError::ProviderInitiationFailed { .. } => {
                ErrorCode::ProviderInitiationFailed
            }
            RegistrationError::PaymentDeclined { .. } => ErrorCode::PaymentDeclined,
            RegistrationError::StillPending { .. } => ErrorCode::PaymentProviderError,
            RegistrationError::ResumeRejected => ErrorCode::ResumeRejected,
            RegistrationError::InvalidSignature => ErrorCode::InvalidSignature,
            RegistrationError::Conflict { .. } => ErrorCode::InvalidStateTransition,
            RegistrationError::VersionConflict(_) => ErrorCode::VersionConflict,
            RegistrationError::NotFound(_) => ErrorCode::IntentNotFound,
            RegistrationError::RateLimited { .. } => ErrorCode::RateLimited,
            RegistrationError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            RegistrationError::Validation { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            RegistrationError::InvalidProviderParams { reason } => {
                format!("Invalid payment parameters: {}", reason)
            }
            RegistrationError::ProviderInitiationFailed { provider, reason } => {
                format!("Could not start {} payment: {}", provider, reason)
            }
            RegistrationError::PaymentDeclined { reason } => {
                format!("Payment was declined: {}", reason)
            }
            RegistrationError::StillPending { intent_id, .. } => {
                format!("Payment for registration {} is still pending", intent_id)
            }
            RegistrationError::ResumeRejected => {
                "The code or resume token is invalid or has expired".to_string()
            }
            RegistrationError::InvalidSignature => "Invalid webhook signature".to_string(),
            RegistrationError::Conflict { current, attempted } => {
                format!("Cannot {} a registration in {} state", attempted, current)
            }
            RegistrationError::VersionConflict(id) => {
                format!("Registration {} was modified concurrently", id)
            }
            RegistrationError::NotFound(id) => format!("Registration not found: {}", id),
            RegistrationError::RateLimited { reason, .. } => reason.clone(),
            RegistrationError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RegistrationError::StillPending { .. }
                | RegistrationError::VersionConflict(_)
                | RegistrationError::ProviderInitiationFailed { .. }
                | RegistrationError::Infrastructure(_)
        )
    }
}

impl std::fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for RegistrationError {}

impl From<ValidationError> for RegistrationError {
    fn from(err: ValidationError) -> Self {
        RegistrationError::Validation {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for RegistrationError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => RegistrationError::Validation {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::InvalidProviderParams => {
                RegistrationError::InvalidProviderParams { reason: err.message }
            }
            ErrorCode::InvalidSignature => RegistrationError::InvalidSignature,
            ErrorCode::ResumeRejected => RegistrationError::ResumeRejected,
            ErrorCode::InvalidStateTransition => RegistrationError::Conflict {
                current: err
                    .details
                    .get("current")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                attempted: err.message,
            },
            _ => RegistrationError::Infrastructure(err.to_string()),
        }
    }
}

impl From<RegistrationError> for DomainError {
    fn from(err: RegistrationError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
