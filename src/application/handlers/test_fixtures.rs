//! In-memory wiring for handler tests.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::adapters::payments::{MockCheckoutProvider, MockPushProvider};
use crate::adapters::{
    InMemoryAccountProvisioner, InMemoryChallengeStore, InMemoryEventBus, InMemoryIntentStore,
    JwtResumeTokens, RecordingCodeSender,
};
use crate::application::handlers::{
    CreateIntentCommand, InitiatePaymentCommand, RequestCodeCommand, VerifyCodeCommand,
};
use crate::application::{PaymentProviderAdapter, SagaPorts, SagaServices, SagaSettings};
use crate::domain::foundation::{EmailAddress, IntentId, Money, Timestamp};
use crate::domain::registration::{
    PaymentAttempt, ProviderKind, ProviderParams, RegistrationIntent,
};
use crate::ports::IntentStore;

pub fn push_params() -> ProviderParams {
    ProviderParams::Push {
        phone_number: "+254712345678".to_string(),
    }
}

pub fn redirect_params() -> ProviderParams {
    ProviderParams::Redirect {
        billing_email: "payer@example.com".to_string(),
    }
}

/// Settings with no attempt cooldown and a fast reconciliation loop.
pub fn test_settings() -> SagaSettings {
    let mut settings = SagaSettings::new(Money::new(150_000, "KES").unwrap());
    settings.payment_policy.attempt_cooldown_secs = 0;
    settings.poll_interval = Duration::from_millis(20);
    settings.reconcile_timeout = Duration::from_millis(400);
    settings.callback_grace = Duration::from_millis(300);
    settings
}

pub struct FixtureBuilder {
    push: MockPushProvider,
    checkout: MockCheckoutProvider,
    settings: SagaSettings,
}

impl FixtureBuilder {
    pub fn push(mut self, push: MockPushProvider) -> Self {
        self.push = push;
        self
    }

    pub fn checkout(mut self, checkout: MockCheckoutProvider) -> Self {
        self.checkout = checkout;
        self
    }

    pub fn settings(mut self, adjust: impl FnOnce(&mut SagaSettings)) -> Self {
        adjust(&mut self.settings);
        self
    }

    pub fn build(self) -> Fixture {
        let store = Arc::new(InMemoryIntentStore::new());
        let challenges = Arc::new(InMemoryChallengeStore::new());
        let accounts = InMemoryAccountProvisioner::new();
        let codes = RecordingCodeSender::new();
        let tokens = Arc::new(JwtResumeTokens::new(&SecretString::new(
            "fixture-resume-secret-0123456789".to_string(),
        )));
        let events = Arc::new(InMemoryEventBus::new());

        let ports = SagaPorts {
            intents: store.clone(),
            challenges: challenges.clone(),
            accounts: Arc::new(accounts.clone()),
            code_sender: Arc::new(codes.clone()),
            resume_tokens: tokens.clone(),
            event_publisher: events.clone(),
        };
        let payments =
            PaymentProviderAdapter::new(Arc::new(self.push.clone()), Arc::new(self.checkout.clone()));

        Fixture {
            store,
            challenges,
            push: self.push,
            checkout: self.checkout,
            accounts,
            codes,
            tokens,
            events,
            services: SagaServices::new(ports, payments, self.settings),
        }
    }
}

pub struct Fixture {
    pub store: Arc<InMemoryIntentStore>,
    pub challenges: Arc<InMemoryChallengeStore>,
    pub push: MockPushProvider,
    pub checkout: MockCheckoutProvider,
    pub accounts: InMemoryAccountProvisioner,
    pub codes: RecordingCodeSender,
    pub tokens: Arc<JwtResumeTokens>,
    pub events: Arc<InMemoryEventBus>,
    pub services: SagaServices,
}

impl Fixture {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> FixtureBuilder {
        FixtureBuilder {
            push: MockPushProvider::new(),
            checkout: MockCheckoutProvider::new(),
            settings: test_settings(),
        }
    }

    pub async fn intent(&self, id: IntentId) -> RegistrationIntent {
        self.store.find(id).await.unwrap().unwrap()
    }

    pub async fn create_intent(&self, email: &str) -> RegistrationIntent {
        let result = self
            .services
            .create_intent_handler()
            .handle(CreateIntentCommand {
                email: email.to_string(),
                username: "reader01".to_string(),
                full_name: "Test Reader".to_string(),
                phone_number: Some("+254700000001".to_string()),
                institution: None,
                intent_id_hint: None,
            })
            .await
            .unwrap();
        self.intent(result.intent.intent_id).await
    }

    pub async fn fail_intent(&self, id: IntentId) {
        let mut intent = self.intent(id).await;
        intent.fail("abandoned in test", Timestamp::now()).unwrap();
        self.store.save(&intent).await.unwrap();
    }

    async fn initiate(&self, id: IntentId, params: ProviderParams) -> String {
        self.services
            .initiate_payment_handler()
            .handle(InitiatePaymentCommand {
                intent_id: id,
                params,
            })
            .await
            .unwrap()
            .initiation
            .provider_reference
    }

    /// A fresh intent with one pending push attempt.
    pub async fn intent_with_push_attempt(&self) -> (IntentId, String) {
        let intent = self.create_intent("reader@example.com").await;
        let reference = self.initiate(intent.id, push_params()).await;
        (intent.id, reference)
    }

    /// A fresh intent with one pending hosted checkout attempt.
    pub async fn intent_with_redirect_attempt(&self) -> (IntentId, String) {
        let intent = self.create_intent("reader@example.com").await;
        let reference = self.initiate(intent.id, redirect_params()).await;
        (intent.id, reference)
    }

    pub async fn add_redirect_attempt(&self, id: IntentId) -> String {
        self.initiate(id, redirect_params()).await
    }

    /// Appends a pending push attempt without going through a provider.
    pub async fn add_pending_attempt(&self, id: IntentId, reference: &str) -> String {
        let mut intent = self.intent(id).await;
        let fee = intent.fee.clone();
        intent
            .record_attempt(PaymentAttempt::pending(
                ProviderKind::Push,
                reference,
                fee,
                None,
                Timestamp::now(),
            ))
            .unwrap();
        self.store.save(&intent).await.unwrap();
        reference.to_string()
    }

    /// Runs request-code and verify-code for `email` and returns the token.
    pub async fn resume_token_for(&self, email: &str) -> String {
        self.services
            .request_code_handler()
            .handle(RequestCodeCommand {
                email: email.to_string(),
            })
            .await
            .unwrap();
        let code = self
            .codes
            .last_code_for(&EmailAddress::parse(email).unwrap())
            .unwrap();
        self.services
            .verify_code_handler()
            .handle(VerifyCodeCommand {
                email: email.to_string(),
                code,
            })
            .await
            .unwrap()
            .resume_token
    }
}
