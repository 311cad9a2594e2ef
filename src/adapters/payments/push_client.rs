//! Mobile push payment adapter.
//!
//! Implements `PushPaymentProvider` against the provider's REST API:
//!
//! - `POST {base}/v1/push-payments` sends the prompt and returns a
//!   `checkout_request_id` used to correlate callbacks and queries
//! - `GET {base}/v1/push-payments/{id}` reports the current status
//!
//! # Configuration
//!
//! ```ignore
//! let config = PushConfig::new(base_url, api_key, callback_secret)
//!     .with_callback_url("https://api.example.com/api/webhooks/push");
//! let provider = HttpPushProvider::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;
use crate::domain::registration::ProviderOutcome;
use crate::ports::{CallbackEvent, PaymentError, PushAck, PushPaymentProvider, PushRequest};

use super::response::{error_for_status, transport_error};
use super::signature::verify_push_signature;

const PROVIDER: &str = "push";

/// Push provider configuration.
#[derive(Clone)]
pub struct PushConfig {
    base_url: String,
    api_key: SecretString,
    callback_secret: SecretString,
    callback_url: Option<String>,
    timeout: Duration,
}

impl PushConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        callback_secret: SecretString,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            callback_secret,
            callback_url: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// URL the provider posts results to.
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct HttpPushProvider {
    config: PushConfig,
    http_client: reqwest::Client,
}

impl HttpPushProvider {
    pub fn new(config: PushConfig) -> Result<Self, PaymentError> {
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
struct PushPaymentBody<'a> {
    phone_number: &'a str,
    amount_minor: i64,
    currency: &'a str,
    account_reference: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PushPaymentResponse {
    checkout_request_id: Option<String>,
    response_code: Option<String>,
    customer_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PushStatusResponse {
    status: String,
    result_description: Option<String>,
}

/// Body of a push result callback.
#[derive(Debug, Deserialize)]
struct PushCallbackBody {
    checkout_request_id: String,
    result_code: i64,
    result_description: Option<String>,
}

/// Maps a provider status string to an outcome.
fn outcome_from_status(status: &str, description: Option<String>) -> ProviderOutcome {
    match status.to_ascii_uppercase().as_str() {
        "SUCCESS" | "COMPLETED" => ProviderOutcome::Succeeded,
        "PENDING" | "PROCESSING" => ProviderOutcome::Pending,
        other => ProviderOutcome::Declined {
            reason: description.unwrap_or_else(|| other.to_ascii_lowercase()),
        },
    }
}

fn outcome_from_callback(body: PushCallbackBody) -> CallbackEvent {
    let outcome = if body.result_code == 0 {
        ProviderOutcome::Succeeded
    } else {
        ProviderOutcome::Declined {
            reason: body
                .result_description
                .unwrap_or_else(|| format!("result code {}", body.result_code)),
        }
    };
    CallbackEvent {
        provider_reference: body.checkout_request_id,
        outcome,
    }
}

#[async_trait]
impl PushPaymentProvider for HttpPushProvider {
    async fn request_push(&self, request: PushRequest) -> Result<PushAck, PaymentError> {
        let url = format!("{}/v1/push-payments", self.config.base_url);
        let body = PushPaymentBody {
            phone_number: &request.phone_number,
            amount_minor: request.amount.amount_minor(),
            currency: request.amount.currency(),
            account_reference: &request.account_reference,
            description: &request.description,
            callback_url: self.config.callback_url.as_deref(),
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                intent_id = %request.intent_id,
                status = status.as_u16(),
                error = %error_text,
                "Push payment request failed"
            );
            return Err(error_for_status(PROVIDER, status, &error_text));
        }

        let parsed: PushPaymentResponse = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse push response: {}", e))
        })?;

        tracing::info!(
            intent_id = %request.intent_id,
            checkout_request_id = ?parsed.checkout_request_id,
            response_code = ?parsed.response_code,
            "Push payment requested"
        );

        Ok(PushAck {
            checkout_request_id: parsed.checkout_request_id,
            response_code: parsed.response_code,
            customer_message: parsed.customer_message,
        })
    }

    async fn query_push(&self, checkout_request_id: &str) -> Result<ProviderOutcome, PaymentError> {
        let url = format!(
            "{}/v1/push-payments/{}",
            self.config.base_url, checkout_request_id
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(error_for_status(PROVIDER, status, &error_text));
        }

        let parsed: PushStatusResponse = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse push status: {}", e))
        })?;

        Ok(outcome_from_status(&parsed.status, parsed.result_description))
    }

    async fn verify_callback(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<CallbackEvent, PaymentError> {
        verify_push_signature(
            &self.config.callback_secret,
            payload,
            signature,
            Timestamp::now().as_unix_secs(),
        )?;

        let body: PushCallbackBody = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse push callback payload");
            PaymentError::invalid_webhook(format!("Invalid JSON: {}", e))
        })?;

        Ok(outcome_from_callback(body))
    }
}
