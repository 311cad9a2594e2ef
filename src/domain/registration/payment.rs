//! Payment attempts and the provider-agnostic vocabulary around them.

use crate::domain::foundation::{AttemptId, EmailAddress, Money, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::payload::normalize_phone;
use super::RegistrationError;

/// Which payment provider an attempt went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderKind {
    /// Mobile push: the payer approves a prompt on their phone.
    Push,

    /// Hosted checkout: the payer is redirected to the provider's page.
    Redirect,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Push => "PUSH",
            ProviderKind::Redirect => "REDIRECT",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUSH" => Ok(ProviderKind::Push),
            "REDIRECT" => Ok(ProviderKind::Redirect),
            other => Err(format!("Invalid provider kind: {}", other)),
        }
    }
}

/// Provider-specific parameters supplied when selecting a payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderParams {
    Push { phone_number: String },
    Redirect { billing_email: String },
}

impl ProviderParams {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderParams::Push { .. } => ProviderKind::Push,
            ProviderParams::Redirect { .. } => ProviderKind::Redirect,
        }
    }

    /// Validates and normalizes the parameters for their provider.
    pub fn validated(self) -> Result<Self, RegistrationError> {
        match self {
            ProviderParams::Push { phone_number } => normalize_phone(&phone_number)
                .map(|phone_number| ProviderParams::Push { phone_number })
                .map_err(|e| RegistrationError::invalid_provider_params(e.to_string())),
            ProviderParams::Redirect { billing_email } => EmailAddress::parse(&billing_email)
                .map(|email| ProviderParams::Redirect {
                    billing_email: email.into(),
                })
                .map_err(|e| RegistrationError::invalid_provider_params(e.to_string())),
        }
    }
}

/// How the client should proceed after initiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    /// Prompt sent to the payer's phone; wait for reconciliation.
    PushPending,

    /// Send the payer to the provider's hosted page.
    Redirect { authorization_url: String },
}

/// Result of a successful payment initiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInitiation {
    pub provider_reference: String,
    #[serde(flatten)]
    pub mode: PaymentMode,
}

/// Provider-reported state of a single payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderOutcome {
    Pending,
    Succeeded,
    Declined { reason: String },
}

/// Recorded outcome of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptOutcome {
    Pending,
    Success,
    Failed,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Pending => "PENDING",
            AttemptOutcome::Success => "SUCCESS",
            AttemptOutcome::Failed => "FAILED",
        }
    }
}

impl FromStr for AttemptOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AttemptOutcome::Pending),
            "SUCCESS" => Ok(AttemptOutcome::Success),
            "FAILED" => Ok(AttemptOutcome::Failed),
            other => Err(format!("Invalid attempt outcome: {}", other)),
        }
    }
}

/// A single payment initiation against one provider.
///
/// Once resolved to `Success` or `Failed` an attempt is never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAttempt {
    pub id: AttemptId,
    pub provider: ProviderKind,
    /// Push: checkout request id. Redirect: transaction reference.
    pub provider_reference: String,
    pub amount: Money,
    pub outcome: AttemptOutcome,
    pub failure_reason: Option<String>,
    pub authorization_url: Option<String>,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

impl PaymentAttempt {
    /// Records a freshly initiated attempt.
    pub fn pending(
        provider: ProviderKind,
        provider_reference: impl Into<String>,
        amount: Money,
        authorization_url: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: AttemptId::new(),
            provider,
            provider_reference: provider_reference.into(),
            amount,
            outcome: AttemptOutcome::Pending,
            failure_reason: None,
            authorization_url,
            created_at: now,
            resolved_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.outcome == AttemptOutcome::Pending
    }

    pub(crate) fn succeed(&mut self, now: Timestamp) {
        self.outcome = AttemptOutcome::Success;
        self.resolved_at = Some(now);
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>, now: Timestamp) {
        self.outcome = AttemptOutcome::Failed;
        self.failure_reason = Some(reason.into());
        self.resolved_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_params_are_normalized() {
        let params = ProviderParams::Push {
            phone_number: "+254 700 000 001".to_string(),
        }
        .validated()
        .unwrap();

        assert_eq!(
            params,
            ProviderParams::Push {
                phone_number: "254700000001".to_string()
            }
        );
    }

    #[test]
    fn redirect_params_require_an_email() {
        let err = ProviderParams::Redirect {
            billing_email: "not-an-email".to_string(),
        }
        .validated()
        .unwrap_err();

        assert!(matches!(err, RegistrationError::InvalidProviderParams { .. }));
    }

    #[test]
    fn params_deserialize_from_tagged_json() {
        let params: ProviderParams =
            serde_json::from_str(r#"{"provider":"REDIRECT","billing_email":"x@y.com"}"#).unwrap();
        assert_eq!(params.kind(), ProviderKind::Redirect);
    }

    #[test]
    fn initiation_flattens_mode() {
        let initiation = PaymentInitiation {
            provider_reference: "ref_1".to_string(),
            mode: PaymentMode::Redirect {
                authorization_url: "https://pay.example/abc".to_string(),
            },
        };

        let json = serde_json::to_value(&initiation).unwrap();
        assert_eq!(json["mode"], "REDIRECT");
        assert_eq!(json["authorization_url"], "https://pay.example/abc");
        assert_eq!(json["provider_reference"], "ref_1");
    }

    #[test]
    fn resolving_records_timestamp_and_reason() {
        let now = Timestamp::now();
        let mut attempt = PaymentAttempt::pending(
            ProviderKind::Push,
            "ws_CO_1",
            Money::new(1000, "KES").unwrap(),
            None,
            now,
        );
        assert!(attempt.is_pending());

        attempt.fail("insufficient funds", now);

        assert_eq!(attempt.outcome, AttemptOutcome::Failed);
        assert_eq!(attempt.failure_reason.as_deref(), Some("insufficient funds"));
        assert_eq!(attempt.resolved_at, Some(now));
    }
}
