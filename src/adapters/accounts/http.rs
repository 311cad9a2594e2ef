//! HTTP account provisioner.
//!
//! `POST {base}/v1/accounts` with an `Idempotency-Key` header. The account
//! system returns the existing account when it sees the same key again.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{AccountProvisioner, ProvisionRequest, ProvisionedAccount};

#[derive(Clone)]
pub struct AccountsConfig {
    base_url: String,
    api_key: SecretString,
    timeout: Duration,
}

impl AccountsConfig {
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct HttpAccountProvisioner {
    config: AccountsConfig,
    http_client: reqwest::Client,
}

impl HttpAccountProvisioner {
    pub fn new(config: AccountsConfig) -> Result<Self, DomainError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| external(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

fn external(message: String) -> DomainError {
    DomainError::new(ErrorCode::ExternalServiceError, message)
}

#[derive(Debug, Serialize)]
struct CreateAccountBody<'a> {
    registration_id: i64,
    email: &'a str,
    username: &'a str,
    full_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    institution: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreateAccountResponse {
    id: String,
}

#[async_trait]
impl AccountProvisioner for HttpAccountProvisioner {
    async fn provision(&self, request: ProvisionRequest) -> Result<ProvisionedAccount, DomainError> {
        let url = format!("{}/v1/accounts", self.config.base_url);
        let payload = &request.payload;
        let body = CreateAccountBody {
            registration_id: request.intent_id.value(),
            email: payload.email.as_str(),
            username: &payload.username,
            full_name: &payload.full_name,
            phone_number: payload.phone_number.as_deref(),
            institution: payload.institution.as_deref(),
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .header("Idempotency-Key", &request.idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| external(format!("Account request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                intent_id = %request.intent_id,
                status = status.as_u16(),
                error = %error_text,
                "Account provisioning failed"
            );
            return Err(external(format!(
                "Account system error ({})",
                status.as_u16()
            )));
        }

        let created: CreateAccountResponse = response
            .json()
            .await
            .map_err(|e| external(format!("Failed to parse account response: {}", e)))?;

        Ok(ProvisionedAccount {
            account_id: created.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registration::test_support;

    #[test]
    fn body_omits_absent_optional_fields() {
        let mut payload = test_support::payload("a@b.co");
        payload.phone_number = None;
        payload.institution = None;

        let body = CreateAccountBody {
            registration_id: 4,
            email: payload.email.as_str(),
            username: &payload.username,
            full_name: &payload.full_name,
            phone_number: payload.phone_number.as_deref(),
            institution: payload.institution.as_deref(),
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["registration_id"], 4);
        assert_eq!(json["email"], "a@b.co");
        assert!(json.get("phone_number").is_none());
        assert!(json.get("institution").is_none());
    }
}
