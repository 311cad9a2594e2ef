//! Hosted checkout (redirect) payment adapter.
//!
//! Implements `RedirectCheckoutProvider` against a Paystack-style API:
//!
//! - `POST {base}/transaction/initialize` returns the `authorization_url`
//! - `GET {base}/transaction/verify/{reference}` reports settlement
//!
//! Callbacks are signed with HMAC-SHA512 of the raw body using the secret key.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::registration::ProviderOutcome;
use crate::ports::{
    CallbackEvent, CheckoutRequest, CheckoutSession, PaymentError, RedirectCheckoutProvider,
};

use super::response::{error_for_status, transport_error};
use super::signature::verify_checkout_signature;

const PROVIDER: &str = "checkout";

/// Checkout provider configuration.
#[derive(Clone)]
pub struct CheckoutConfig {
    base_url: String,
    secret_key: SecretString,
    callback_url: Option<String>,
    timeout: Duration,
}

impl CheckoutConfig {
    pub fn new(base_url: impl Into<String>, secret_key: SecretString) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key,
            callback_url: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Where the hosted page sends the payer afterwards.
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct HttpCheckoutProvider {
    config: CheckoutConfig,
    http_client: reqwest::Client,
}

impl HttpCheckoutProvider {
    pub fn new(config: CheckoutConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::provider(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    email: &'a str,
    amount: i64,
    currency: &'a str,
    reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
    metadata: InitializeMetadata,
}

#[derive(Debug, Serialize)]
struct InitializeMetadata {
    intent_id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: bool,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    status: String,
    gateway_response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackBody {
    event: String,
    data: CallbackData,
}

#[derive(Debug, Deserialize)]
struct CallbackData {
    reference: String,
    status: Option<String>,
    gateway_response: Option<String>,
}

/// Maps a transaction status to an outcome.
fn outcome_from_status(status: &str, gateway_response: Option<String>) -> ProviderOutcome {
    match status {
        "success" => ProviderOutcome::Succeeded,
        "abandoned" | "ongoing" | "pending" | "processing" | "queued" => ProviderOutcome::Pending,
        other => ProviderOutcome::Declined {
            reason: gateway_response.unwrap_or_else(|| other.to_string()),
        },
    }
}

fn outcome_from_callback(body: CallbackBody) -> CallbackEvent {
    let outcome = match body.event.as_str() {
        "charge.success" => ProviderOutcome::Succeeded,
        _ => outcome_from_status(
            body.data.status.as_deref().unwrap_or("failed"),
            body.data.gateway_response,
        ),
    };
    CallbackEvent {
        provider_reference: body.data.reference,
        outcome,
    }
}

#[async_trait]
impl RedirectCheckoutProvider for HttpCheckoutProvider {
    async fn initialize_checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/transaction/initialize", self.config.base_url);
        let callback_url = request
            .callback_url
            .as_deref()
            .or(self.config.callback_url.as_deref());
        let body = InitializeBody {
            email: &request.email,
            amount: request.amount.amount_minor(),
            currency: request.amount.currency(),
            reference: &request.reference,
            callback_url,
            metadata: InitializeMetadata {
                intent_id: request.intent_id.value(),
            },
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                intent_id = %request.intent_id,
                reference = %request.reference,
                status = status.as_u16(),
                error = %error_text,
                "Checkout initialization failed"
            );
            return Err(error_for_status(PROVIDER, status, &error_text));
        }

        let envelope: ApiEnvelope<InitializeData> = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse checkout response: {}", e))
        })?;

        match (envelope.status, envelope.data) {
            (true, Some(data)) => Ok(CheckoutSession {
                authorization_url: data.authorization_url,
                reference: data.reference,
            }),
            (_, _) => Err(PaymentError::rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "Checkout was not initialized".to_string()),
            )),
        }
    }

    async fn verify_transaction(&self, reference: &str) -> Result<ProviderOutcome, PaymentError> {
        let url = format!("{}/transaction/verify/{}", self.config.base_url, reference);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(error_for_status(PROVIDER, status, &error_text));
        }

        let envelope: ApiEnvelope<TransactionData> = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse verify response: {}", e))
        })?;

        let data = envelope.data.ok_or_else(|| {
            PaymentError::provider(
                envelope
                    .message
                    .unwrap_or_else(|| "Verify response without data".to_string()),
            )
        })?;

        Ok(outcome_from_status(&data.status, data.gateway_response))
    }

    async fn verify_callback(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<CallbackEvent, PaymentError> {
        verify_checkout_signature(&self.config.secret_key, payload, signature)?;

        let body: CallbackBody = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse checkout callback payload");
            PaymentError::invalid_webhook(format!("Invalid JSON: {}", e))
        })?;

        Ok(outcome_from_callback(body))
    }
}
