//! Payment configuration: providers, fee and attempt policy

use serde::Deserialize;
use std::time::Duration;

use crate::domain::foundation::Money;
use crate::domain::registration::PaymentPolicy;

use super::error::ValidationError;

/// Mobile push provider credentials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushProviderConfig {
    pub base_url: String,
    pub api_key: String,
    /// HMAC secret for `X-Push-Signature` callbacks
    pub callback_secret: String,
}

/// Hosted checkout provider credentials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedirectProviderConfig {
    pub base_url: String,
    /// API secret; also signs `X-Checkout-Signature` callbacks
    pub secret_key: String,
    /// Page the payer returns to after checkout
    pub return_url: Option<String>,
}

/// Payment configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub push: PushProviderConfig,

    pub redirect: RedirectProviderConfig,

    /// Registration fee in minor units
    pub fee_minor: i64,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Attempts per intent before it is abandoned
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Minimum seconds between two initiations on one intent
    #[serde(default = "default_attempt_cooldown")]
    pub attempt_cooldown_secs: u64,

    /// Timeout for calls to either provider
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,
}

impl PaymentConfig {
    pub fn fee(&self) -> Result<Money, ValidationError> {
        Money::new(self.fee_minor, self.currency.clone()).map_err(|_| ValidationError::InvalidFee)
    }

    pub fn policy(&self) -> PaymentPolicy {
        PaymentPolicy {
            max_attempts: self.max_attempts,
            attempt_cooldown_secs: self.attempt_cooldown_secs,
            initiation_lease_secs: self.initiation_lease_secs(),
        }
    }

    /// Long enough for the provider call and the attempt write that follows.
    pub fn initiation_lease_secs(&self) -> u64 {
        self.provider_timeout_secs.saturating_mul(3)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_url(&self.push.base_url, "payment.push.base_url")?;
        if self.push.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__PUSH__API_KEY"));
        }
        if self.push.callback_secret.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__PUSH__CALLBACK_SECRET",
            ));
        }

        check_url(&self.redirect.base_url, "payment.redirect.base_url")?;
        if self.redirect.secret_key.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__REDIRECT__SECRET_KEY",
            ));
        }
        if let Some(url) = &self.redirect.return_url {
            check_url(url, "payment.redirect.return_url")?;
        }

        self.fee()?;

        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidPaymentPolicy("max_attempts must be at least 1"));
        }
        if self.provider_timeout_secs == 0 {
            return Err(ValidationError::InvalidPaymentPolicy(
                "provider_timeout_secs must be positive",
            ));
        }
        Ok(())
    }
}

pub(super) fn check_url(url: &str, name: &'static str) -> Result<(), ValidationError> {
    if url.is_empty() {
        return Err(ValidationError::MissingRequired(name));
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(ValidationError::InvalidUrl(name));
    }
    Ok(())
}

fn default_currency() -> String {
    "KES".to_string()
}

fn default_max_attempts() -> u32 {
    PaymentPolicy::default().max_attempts
}

fn default_attempt_cooldown() -> u64 {
    PaymentPolicy::default().attempt_cooldown_secs
}

fn default_provider_timeout() -> u64 {
    10
}
