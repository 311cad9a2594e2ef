//! ContinuePaymentHandler - Starts a payment on a resumed registration.

use crate::application::handlers::registration::{
    InitiatePaymentCommand, InitiatePaymentHandler, InitiatePaymentResult,
};
use crate::domain::registration::{ProviderParams, RegistrationError};

use super::ResumeAuthorizer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuePaymentCommand {
    pub resume_token: String,
    pub params: ProviderParams,
}

/// Pays for the intent behind a resume token. Never creates an intent.
pub struct ContinuePaymentHandler {
    authorizer: ResumeAuthorizer,
    initiate: InitiatePaymentHandler,
}

impl ContinuePaymentHandler {
    pub fn new(authorizer: ResumeAuthorizer, initiate: InitiatePaymentHandler) -> Self {
        Self {
            authorizer,
            initiate,
        }
    }

    pub async fn handle(
        &self,
        cmd: ContinuePaymentCommand,
    ) -> Result<InitiatePaymentResult, RegistrationError> {
        let intent = self.authorizer.authorize(&cmd.resume_token).await?;
        tracing::info!(intent_id = %intent.id, "Continuing payment for resumed registration");

        self.initiate
            .handle(InitiatePaymentCommand {
                intent_id: intent.id,
                params: cmd.params,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_fixtures::{push_params, Fixture};
    use crate::domain::registration::PaymentMode;

    #[tokio::test]
    async fn resumed_payment_targets_existing_intent() {
        let fx = Fixture::new();
        let intent = fx.create_intent("reader@example.com").await;
        let token = fx.resume_token_for("reader@example.com").await;

        let result = fx
            .services
            .continue_payment_handler()
            .handle(ContinuePaymentCommand {
                resume_token: token,
                params: push_params(),
            })
            .await
            .unwrap();

        assert_eq!(result.intent.intent_id, intent.id);
        assert_eq!(result.initiation.mode, PaymentMode::PushPending);
        assert_eq!(fx.store.len().await, 1);
    }

    #[tokio::test]
    async fn invalid_token_starts_nothing() {
        let fx = Fixture::new();
        fx.create_intent("reader@example.com").await;

        let err = fx
            .services
            .continue_payment_handler()
            .handle(ContinuePaymentCommand {
                resume_token: "bogus".to_string(),
                params: push_params(),
            })
            .await
            .unwrap_err();

        assert_eq!(err, RegistrationError::ResumeRejected);
        assert!(fx.push.calls().is_empty());
    }
}
