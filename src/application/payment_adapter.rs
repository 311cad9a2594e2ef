//! Uniform interface over the push and redirect payment providers.
//!
//! The orchestrator and handlers speak only `ProviderParams`,
//! `PaymentInitiation` and `ProviderOutcome`; provider specifics stay here.
//! Client-side signals (return URL parameters, "I paid" clicks) never reach
//! this type as facts: every outcome comes from asking the provider or from
//! a verified callback.

use std::sync::Arc;

use crate::domain::registration::{
    PaymentInitiation, PaymentMode, ProviderKind, ProviderOutcome, ProviderParams,
    RegistrationError, RegistrationIntent,
};
use crate::ports::{
    CallbackEvent, CheckoutRequest, PaymentError, PaymentErrorCode, PushPaymentProvider,
    PushRequest, RedirectCheckoutProvider,
};

pub struct PaymentProviderAdapter {
    push: Arc<dyn PushPaymentProvider>,
    redirect: Arc<dyn RedirectCheckoutProvider>,
    redirect_callback_url: Option<String>,
}

impl PaymentProviderAdapter {
    pub fn new(
        push: Arc<dyn PushPaymentProvider>,
        redirect: Arc<dyn RedirectCheckoutProvider>,
    ) -> Self {
        Self {
            push,
            redirect,
            redirect_callback_url: None,
        }
    }

    /// Where the hosted checkout returns the payer.
    pub fn with_redirect_callback_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_callback_url = Some(url.into());
        self
    }

    /// Starts a payment for `intent` with the provider selected by `params`.
    ///
    /// # Errors
    ///
    /// - `InvalidProviderParams` if `params` do not validate for the provider
    /// - `ProviderInitiationFailed` if the provider refuses, fails, or returns
    ///   no correlation id
    pub async fn initiate(
        &self,
        intent: &RegistrationIntent,
        params: ProviderParams,
    ) -> Result<PaymentInitiation, RegistrationError> {
        match params.validated()? {
            ProviderParams::Push { phone_number } => {
                let ack = self
                    .push
                    .request_push(PushRequest {
                        intent_id: intent.id,
                        phone_number,
                        amount: intent.fee.clone(),
                        account_reference: format!("REG-{}", intent.id),
                        description: "Registration fee".to_string(),
                    })
                    .await
                    .map_err(|e| initiation_failed(ProviderKind::Push, e))?;

                let reference = ack
                    .checkout_request_id
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| {
                        RegistrationError::initiation_failed(
                            ProviderKind::Push,
                            ack.customer_message.unwrap_or_else(|| {
                                "provider returned no checkout request id".into()
                            }),
                        )
                    })?;

                Ok(PaymentInitiation {
                    provider_reference: reference,
                    mode: PaymentMode::PushPending,
                })
            }
            ProviderParams::Redirect { billing_email } => {
                let session = self
                    .redirect
                    .initialize_checkout(CheckoutRequest {
                        intent_id: intent.id,
                        email: billing_email,
                        amount: intent.fee.clone(),
                        reference: redirect_reference(intent),
                        callback_url: self.redirect_callback_url.clone(),
                    })
                    .await
                    .map_err(|e| initiation_failed(ProviderKind::Redirect, e))?;

                Ok(PaymentInitiation {
                    provider_reference: session.reference,
                    mode: PaymentMode::Redirect {
                        authorization_url: session.authorization_url,
                    },
                })
            }
        }
    }

    /// Asks the provider for the current state of a payment.
    pub async fn query(
        &self,
        provider: ProviderKind,
        reference: &str,
    ) -> Result<ProviderOutcome, RegistrationError> {
        let result = match provider {
            ProviderKind::Push => self.push.query_push(reference).await,
            ProviderKind::Redirect => self.redirect.verify_transaction(reference).await,
        };
        result.map_err(|e| query_failed(provider, reference, e))
    }

    /// Verifies a redirect transaction on the payer's return. Safe to repeat.
    pub async fn confirm(&self, reference: &str) -> Result<ProviderOutcome, RegistrationError> {
        self.query(ProviderKind::Redirect, reference).await
    }

    /// Verifies a provider callback and extracts the reported outcome.
    pub async fn parse_callback(
        &self,
        provider: ProviderKind,
        payload: &[u8],
        signature: &str,
    ) -> Result<CallbackEvent, RegistrationError> {
        let result = match provider {
            ProviderKind::Push => self.push.verify_callback(payload, signature).await,
            ProviderKind::Redirect => self.redirect.verify_callback(payload, signature).await,
        };
        result.map_err(|e| match e.code {
            PaymentErrorCode::InvalidWebhook => RegistrationError::InvalidSignature,
            _ => RegistrationError::infrastructure(e.to_string()),
        })
    }
}

/// Our transaction reference for a hosted checkout: unique per attempt.
fn redirect_reference(intent: &RegistrationIntent) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("REG-{}-{}", intent.id, &suffix[..12])
}

fn initiation_failed(provider: ProviderKind, err: PaymentError) -> RegistrationError {
    tracing::warn!(
        provider = %provider,
        code = %err.code,
        provider_code = ?err.provider_code,
        "Payment initiation failed: {}",
        err.message
    );
    RegistrationError::initiation_failed(provider, err.message)
}

fn query_failed(provider: ProviderKind, reference: &str, err: PaymentError) -> RegistrationError {
    match err.code {
        PaymentErrorCode::NotFound => RegistrationError::validation(
            "provider_reference",
            format!("Unknown {} reference {}", provider, reference),
        ),
        _ => RegistrationError::infrastructure(format!(
            "{} provider unavailable: {}",
            provider, err.message
        )),
    }
}
