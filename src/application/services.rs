//! Wiring of ports into handlers.

use std::sync::Arc;

use crate::application::handlers::{
    CheckPaymentStatusHandler, ConfirmPaymentHandler, ContinuePaymentHandler, CreateIntentHandler,
    FetchPendingHandler, FinalizeLocks, FinalizeRegistrationHandler, GetStatusHandler,
    InitiatePaymentHandler, OutcomeRecorder, ProviderCallbackHandler, RequestCodeHandler,
    ResumeAuthorizer, VerifyCodeHandler,
};
use crate::application::{
    IntentWriter, PaymentProviderAdapter, ReconcileConfig, ReconciliationLoop, SagaSettings,
};
use crate::ports::{
    AccountProvisioner, ChallengeStore, CodeSender, EventPublisher, IntentStore, ResumeTokens,
};

/// Every port the saga talks to.
#[derive(Clone)]
pub struct SagaPorts {
    pub intents: Arc<dyn IntentStore>,
    pub challenges: Arc<dyn ChallengeStore>,
    pub accounts: Arc<dyn AccountProvisioner>,
    pub code_sender: Arc<dyn CodeSender>,
    pub resume_tokens: Arc<dyn ResumeTokens>,
    pub event_publisher: Arc<dyn EventPublisher>,
}

/// Shared, cheaply cloneable handle that builds handlers on demand.
///
/// Process-wide coordination (the reconciliation registry and finalize
/// locks) lives here so every handler built from one `SagaServices`
/// shares it.
#[derive(Clone)]
pub struct SagaServices {
    ports: SagaPorts,
    payments: Arc<PaymentProviderAdapter>,
    reconciliation: Arc<ReconciliationLoop>,
    finalize_locks: Arc<FinalizeLocks>,
    settings: Arc<SagaSettings>,
}

impl SagaServices {
    pub fn new(ports: SagaPorts, payments: PaymentProviderAdapter, settings: SagaSettings) -> Self {
        let reconciliation = ReconciliationLoop::new(
            ports.intents.clone(),
            ReconcileConfig {
                poll_interval: settings.poll_interval,
                timeout: settings.reconcile_timeout,
            },
        );
        Self {
            ports,
            payments: Arc::new(payments),
            reconciliation: Arc::new(reconciliation),
            finalize_locks: Arc::new(FinalizeLocks::new()),
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &SagaSettings {
        &self.settings
    }

    pub fn ports(&self) -> &SagaPorts {
        &self.ports
    }

    pub fn reconciliation(&self) -> &ReconciliationLoop {
        &self.reconciliation
    }

    #[cfg(test)]
    pub(crate) fn finalize_locks(&self) -> &FinalizeLocks {
        &self.finalize_locks
    }

    pub fn writer(&self) -> IntentWriter {
        IntentWriter::new(self.ports.intents.clone(), self.settings.max_conflict_retries)
    }

    pub fn outcome_recorder(&self) -> OutcomeRecorder {
        OutcomeRecorder::new(
            self.writer(),
            self.settings.payment_policy,
            self.ports.event_publisher.clone(),
        )
    }

    fn resume_authorizer(&self) -> ResumeAuthorizer {
        ResumeAuthorizer::new(
            self.ports.intents.clone(),
            self.ports.challenges.clone(),
            self.ports.resume_tokens.clone(),
        )
    }

    // Registration

    pub fn create_intent_handler(&self) -> CreateIntentHandler {
        CreateIntentHandler::new(
            self.ports.intents.clone(),
            self.ports.event_publisher.clone(),
            self.settings.registration_fee.clone(),
            self.settings.intent_ttl_secs,
        )
    }

    pub fn get_status_handler(&self) -> GetStatusHandler {
        GetStatusHandler::new(self.ports.intents.clone())
    }

    pub fn initiate_payment_handler(&self) -> InitiatePaymentHandler {
        InitiatePaymentHandler::new(
            self.writer(),
            self.payments.clone(),
            self.settings.payment_policy,
            self.ports.event_publisher.clone(),
        )
    }

    pub fn confirm_payment_handler(&self) -> ConfirmPaymentHandler {
        ConfirmPaymentHandler::new(
            self.ports.intents.clone(),
            self.payments.clone(),
            self.outcome_recorder(),
        )
    }

    pub fn check_payment_status_handler(&self) -> CheckPaymentStatusHandler {
        CheckPaymentStatusHandler::new(
            self.ports.intents.clone(),
            self.payments.clone(),
            self.outcome_recorder(),
        )
    }

    pub fn provider_callback_handler(&self) -> ProviderCallbackHandler {
        ProviderCallbackHandler::new(
            self.ports.intents.clone(),
            self.payments.clone(),
            self.outcome_recorder(),
        )
        .with_grace_period(self.settings.callback_grace)
    }

    pub fn finalize_handler(&self) -> FinalizeRegistrationHandler {
        FinalizeRegistrationHandler::new(
            self.writer(),
            self.ports.accounts.clone(),
            self.ports.event_publisher.clone(),
            self.finalize_locks.clone(),
        )
    }

    // Resume

    pub fn request_code_handler(&self) -> RequestCodeHandler {
        RequestCodeHandler::new(
            self.ports.intents.clone(),
            self.ports.challenges.clone(),
            self.ports.code_sender.clone(),
            self.settings.resume_policy,
        )
    }

    pub fn verify_code_handler(&self) -> VerifyCodeHandler {
        VerifyCodeHandler::new(
            self.ports.challenges.clone(),
            self.ports.resume_tokens.clone(),
            self.ports.event_publisher.clone(),
            self.settings.resume_policy,
        )
    }

    pub fn fetch_pending_handler(&self) -> FetchPendingHandler {
        FetchPendingHandler::new(self.resume_authorizer())
    }

    pub fn continue_payment_handler(&self) -> ContinuePaymentHandler {
        ContinuePaymentHandler::new(self.resume_authorizer(), self.initiate_payment_handler())
    }
}
