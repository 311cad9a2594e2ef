//! Payment provider ports.
//!
//! Two independent providers are supported:
//!
//! - **Push** (`PushPaymentProvider`): the provider sends an approval prompt
//!   to the payer's phone and reports the result asynchronously.
//! - **Redirect** (`RedirectCheckoutProvider`): the payer completes a hosted
//!   checkout page and comes back with a transaction reference.
//!
//! Both report results through signed callbacks and can be queried for the
//! current state of a payment. Client-supplied signals are never treated as
//! proof of payment; only these ports are.

use crate::domain::foundation::{DomainError, ErrorCode, IntentId, Money};
use crate::domain::registration::ProviderOutcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for the mobile push provider.
#[async_trait]
pub trait PushPaymentProvider: Send + Sync {
    /// Sends a payment prompt to the payer's phone.
    ///
    /// A successful HTTP exchange may still carry no correlation id; the
    /// caller treats that as an initiation failure.
    async fn request_push(&self, request: PushRequest) -> Result<PushAck, PaymentError>;

    /// Asks the provider for the current state of a push payment.
    async fn query_push(&self, checkout_request_id: &str) -> Result<ProviderOutcome, PaymentError>;

    /// Verifies a callback signature and parses the reported outcome.
    async fn verify_callback(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<CallbackEvent, PaymentError>;
}

/// Port for the hosted checkout provider.
#[async_trait]
pub trait RedirectCheckoutProvider: Send + Sync {
    /// Creates a hosted checkout and returns where to send the payer.
    async fn initialize_checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Asks the provider whether the transaction with `reference` settled.
    ///
    /// Safe to call any number of times.
    async fn verify_transaction(&self, reference: &str) -> Result<ProviderOutcome, PaymentError>;

    /// Verifies a callback signature and parses the reported outcome.
    async fn verify_callback(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<CallbackEvent, PaymentError>;
}

/// Request to send a push payment prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRequest {
    pub intent_id: IntentId,
    /// International digits without `+`.
    pub phone_number: String,
    pub amount: Money,
    /// Shown to the payer on the prompt.
    pub account_reference: String,
    pub description: String,
}

/// Provider acknowledgement of a push request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushAck {
    /// Correlation id used by callbacks and status queries.
    pub checkout_request_id: Option<String>,
    pub response_code: Option<String>,
    pub customer_message: Option<String>,
}

/// Request to create a hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub intent_id: IntentId,
    pub email: String,
    pub amount: Money,
    /// Our transaction reference; the provider echoes it back.
    pub reference: String,
    pub callback_url: Option<String>,
}

/// A created hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub authorization_url: String,
    pub reference: String,
}

/// Verified callback payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackEvent {
    pub provider_reference: String,
    pub outcome: ProviderOutcome,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Rejected, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidWebhook, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::InvalidWebhook => ErrorCode::InvalidSignature,
            PaymentErrorCode::Rejected => ErrorCode::ProviderInitiationFailed,
            _ => ErrorCode::PaymentProviderError,
        };

        let mut domain = DomainError::new(code, err.message);
        if let Some(provider_code) = err.provider_code {
            domain = domain.with_detail("provider_code", provider_code);
        }
        domain
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue or timeout.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Provider refused the request (bad phone number, unsupported currency, ...).
    Rejected,

    /// Transaction or reference unknown to the provider.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Callback signature missing, malformed or wrong.
    InvalidWebhook,

    /// Provider API error or unparseable response.
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::Rejected => "rejected",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidWebhook => "invalid_webhook",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
