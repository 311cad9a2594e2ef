//! Resend email adapter.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::domain::foundation::{DomainError, EmailAddress, ErrorCode};
use crate::domain::resume::OneTimeCode;
use crate::ports::CodeSender;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Clone)]
pub struct ResendConfig {
    api_key: SecretString,
    /// Formatted `Name <address>` sender.
    from: String,
    api_url: String,
}

impl ResendConfig {
    pub fn new(api_key: SecretString, from: impl Into<String>) -> Self {
        Self {
            api_key,
            from: from.into(),
            api_url: RESEND_API_URL.to_string(),
        }
    }

    /// Set a custom API URL (for testing).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

/// Sends resume codes through Resend.
pub struct ResendCodeSender {
    config: ResendConfig,
    http_client: reqwest::Client,
}

impl ResendCodeSender {
    pub fn new(config: ResendConfig) -> Result<Self, DomainError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::ExternalServiceError,
                    format!("Failed to build HTTP client: {}", e),
                )
            })?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

#[derive(Debug, Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: String,
}

fn render_body(code: &OneTimeCode, expires_in_secs: u64) -> String {
    let minutes = expires_in_secs.div_ceil(60).max(1);
    format!(
        "Your code to continue your registration is {}.\n\n\
         It expires in {} minute{}. If you did not ask for it, ignore this email.",
        code.as_str(),
        minutes,
        if minutes == 1 { "" } else { "s" }
    )
}

#[async_trait]
impl CodeSender for ResendCodeSender {
    async fn send_code(
        &self,
        to: &EmailAddress,
        code: &OneTimeCode,
        expires_in_secs: u64,
    ) -> Result<(), DomainError> {
        let body = SendEmailBody {
            from: &self.config.from,
            to: [to.as_str()],
            subject: "Your registration code",
            text: render_body(code, expires_in_secs),
        };

        let response = self
            .http_client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::ExternalServiceError,
                    format!("Email request failed: {}", e),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), error = %error_text, "Resend rejected email");
            return Err(DomainError::new(
                ErrorCode::ExternalServiceError,
                format!("Email provider error ({})", status.as_u16()),
            ));
        }

        tracing::debug!("Resume code email accepted");
        Ok(())
    }
}
