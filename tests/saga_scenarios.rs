//! End-to-end saga scenarios.
//!
//! Each test drives the public orchestrator and handlers against the
//! in-memory adapters and mock payment providers:
//! - push payment confirmed by a provider callback
//! - hosted checkout confirmed on return
//! - resume on a second device with an emailed code
//! - finalize from a second device after the payment landed
//! - push initiation without a correlation id
//! - reconciliation timeout followed by a manual status check

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::watch;

use registration_saga::adapters::{
    InMemoryAccountProvisioner, InMemoryChallengeStore, InMemoryEventBus, InMemoryIntentStore,
    JwtResumeTokens, MockCheckoutProvider, MockPushProvider, RecordingCodeSender,
};
use registration_saga::application::{
    GetStatusQuery, PaymentProviderAdapter, ProviderCallbackCommand, RegistrationForm,
    RegistrationOrchestrator, RequestCodeCommand, SagaPorts, SagaServices, SagaSession,
    SagaSettings, VerifyCodeCommand,
};
use registration_saga::domain::foundation::{EmailAddress, Money};
use registration_saga::domain::registration::{
    IntentStatus, NextAction, PaymentMode, ProviderKind, ProviderOutcome, ProviderParams,
    RegistrationError, SagaState,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Harness {
    push: MockPushProvider,
    checkout: MockCheckoutProvider,
    accounts: InMemoryAccountProvisioner,
    codes: RecordingCodeSender,
    services: SagaServices,
}

impl Harness {
    fn new() -> Self {
        Self::with_push(MockPushProvider::new())
    }

    fn with_push(push: MockPushProvider) -> Self {
        let checkout = MockCheckoutProvider::new();
        let accounts = InMemoryAccountProvisioner::new();
        let codes = RecordingCodeSender::new();

        let ports = SagaPorts {
            intents: Arc::new(InMemoryIntentStore::new()),
            challenges: Arc::new(InMemoryChallengeStore::new()),
            accounts: Arc::new(accounts.clone()),
            code_sender: Arc::new(codes.clone()),
            resume_tokens: Arc::new(JwtResumeTokens::new(&SecretString::new(
                "scenario-resume-secret-0123456789".to_string(),
            ))),
            event_publisher: Arc::new(InMemoryEventBus::new()),
        };
        let payments =
            PaymentProviderAdapter::new(Arc::new(push.clone()), Arc::new(checkout.clone()));

        let mut settings = SagaSettings::new(Money::new(150_000, "KES").unwrap());
        settings.payment_policy.attempt_cooldown_secs = 0;
        settings.poll_interval = Duration::from_millis(20);
        settings.reconcile_timeout = Duration::from_millis(500);
        settings.callback_grace = Duration::from_millis(300);

        Self {
            push,
            checkout,
            accounts,
            codes,
            services: SagaServices::new(ports, payments, settings),
        }
    }

    fn orchestrator(&self) -> RegistrationOrchestrator {
        RegistrationOrchestrator::new(self.services.clone())
    }

    /// Requests and verifies an emailed code, as a second device would.
    async fn resume_token(&self, email: &str) -> String {
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

    async fn status(&self, session: &SagaSession) -> IntentStatus {
        self.services
            .get_status_handler()
            .handle(GetStatusQuery {
                intent_id: session.intent_id().unwrap(),
            })
            .await
            .unwrap()
            .status
    }
}

fn form(email: &str) -> RegistrationForm {
    RegistrationForm {
        email: email.to_string(),
        username: "wanjiku".to_string(),
        full_name: "Wanjiku Kamau".to_string(),
        phone_number: Some("+254712345678".to_string()),
        institution: Some("Nairobi Library".to_string()),
    }
}

fn push_params() -> ProviderParams {
    ProviderParams::Push {
        phone_number: "+254712345678".to_string(),
    }
}

fn redirect_params() -> ProviderParams {
    ProviderParams::Redirect {
        billing_email: "wanjiku@example.com".to_string(),
    }
}

fn no_cancel() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    std::mem::forget(tx);
    rx
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn push_payment_confirmed_by_callback_completes_registration() {
    let harness = Harness::new();
    let saga = harness.orchestrator();
    let mut session = SagaSession::new();

    let view = saga
        .create_or_recover_intent(&mut session, form("wanjiku@example.com"))
        .await
        .unwrap();
    assert_eq!(view.next_action, NextAction::PaymentRequired);

    let initiation = saga.select_provider(&mut session, push_params()).await.unwrap();
    assert_eq!(initiation.mode, PaymentMode::PushPending);

    // The payer approves on their phone while the client waits.
    let services = harness.services.clone();
    let reference = initiation.provider_reference.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        services
            .provider_callback_handler()
            .handle(ProviderCallbackCommand {
                provider: ProviderKind::Push,
                payload: MockPushProvider::callback_payload(&reference, ProviderOutcome::Succeeded),
                signature: "signed".to_string(),
            })
            .await
            .unwrap();
    });

    let paid = saga.await_payment(&mut session, no_cancel()).await.unwrap();
    assert_eq!(paid.status, IntentStatus::Paid);
    assert_eq!(session.state(), SagaState::Finalizing);

    let done = saga.finalize(&mut session).await.unwrap();
    assert_eq!(done.intent_id, view.intent_id);
    assert!(done.newly_completed);
    assert_eq!(session.state(), SagaState::Done);
    assert_eq!(harness.status(&session).await, IntentStatus::Completed);
    assert_eq!(harness.accounts.account_count(), 1);
}

#[tokio::test]
async fn hosted_checkout_return_completes_registration() {
    let harness = Harness::new();
    let saga = harness.orchestrator();
    let mut session = SagaSession::new();

    saga.create_or_recover_intent(&mut session, form("wanjiku@example.com"))
        .await
        .unwrap();
    let initiation = saga
        .select_provider(&mut session, redirect_params())
        .await
        .unwrap();
    assert!(matches!(initiation.mode, PaymentMode::Redirect { .. }));

    // Payer completes the hosted page and comes back with the reference.
    harness
        .checkout
        .set_outcome(&initiation.provider_reference, ProviderOutcome::Succeeded);
    saga.confirm_redirect(&mut session, &initiation.provider_reference)
        .await
        .unwrap();

    let paid = saga.await_payment(&mut session, no_cancel()).await.unwrap();
    assert_eq!(paid.status, IntentStatus::Paid);

    let done = saga.finalize(&mut session).await.unwrap();
    assert!(!done.account_id.is_empty());
    assert_eq!(harness.status(&session).await, IntentStatus::Completed);

    // A repeated finalize returns the same account without provisioning again.
    let again = saga.finalize(&mut session).await.unwrap();
    assert_eq!(again.account_id, done.account_id);
    assert!(!again.newly_completed);
    assert_eq!(harness.accounts.call_count(), 1);
}

#[tokio::test]
async fn second_device_resumes_the_same_intent() {
    let harness = Harness::new();
    let saga = harness.orchestrator();

    // Device 1 starts and abandons a push payment.
    let mut device_one = SagaSession::new();
    let original = saga
        .create_or_recover_intent(&mut device_one, form("wanjiku@example.com"))
        .await
        .unwrap();
    saga.select_provider(&mut device_one, push_params())
        .await
        .unwrap();

    // Device 2 proves control of the email address.
    let token = harness.resume_token("wanjiku@example.com").await;

    let (mut device_two, pending) = saga.resume(&token).await.unwrap();
    assert_eq!(pending.intent.intent_id, original.intent_id);
    assert_eq!(pending.username, "wanjiku");
    assert_eq!(device_two.state(), SagaState::AwaitingPayment);

    let initiation = saga
        .continue_payment(&mut device_two, &token, redirect_params())
        .await
        .unwrap();
    assert_eq!(device_two.intent_id(), Some(original.intent_id));
    assert_eq!(
        harness.checkout.last_reference(),
        Some(initiation.provider_reference)
    );
}

#[tokio::test]
async fn paid_intent_is_finalized_from_a_second_device() {
    let harness = Harness::new();
    let saga = harness.orchestrator();

    // Device 1 pays, then disappears before finalizing.
    let mut device_one = SagaSession::new();
    let original = saga
        .create_or_recover_intent(&mut device_one, form("wanjiku@example.com"))
        .await
        .unwrap();
    let initiation = saga.select_provider(&mut device_one, push_params()).await.unwrap();
    harness
        .services
        .provider_callback_handler()
        .handle(ProviderCallbackCommand {
            provider: ProviderKind::Push,
            payload: MockPushProvider::callback_payload(
                &initiation.provider_reference,
                ProviderOutcome::Succeeded,
            ),
            signature: "signed".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(harness.status(&device_one).await, IntentStatus::Paid);

    let token = harness.resume_token("wanjiku@example.com").await;
    let (mut device_two, pending) = saga.resume(&token).await.unwrap();
    assert_eq!(pending.intent.intent_id, original.intent_id);
    assert_eq!(pending.intent.status, IntentStatus::Paid);
    assert_eq!(device_two.state(), SagaState::Finalizing);

    let done = saga.finalize(&mut device_two).await.unwrap();
    assert_eq!(done.intent_id, original.intent_id);
    assert!(done.newly_completed);
    assert_eq!(harness.status(&device_two).await, IntentStatus::Completed);
    assert_eq!(harness.accounts.account_count(), 1);

    // Paying again from the resumed session is refused.
    let err = saga
        .continue_payment(&mut device_two, &token, redirect_params())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::NotFound(_) | RegistrationError::Conflict { .. }
    ));
}

#[tokio::test]
async fn push_without_correlation_id_keeps_intent_payable() {
    let harness = Harness::with_push(MockPushProvider::without_correlation_id());
    let saga = harness.orchestrator();
    let mut session = SagaSession::new();

    saga.create_or_recover_intent(&mut session, form("wanjiku@example.com"))
        .await
        .unwrap();

    let err = saga
        .select_provider(&mut session, push_params())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RegistrationError::ProviderInitiationFailed {
            provider: ProviderKind::Push,
            ..
        }
    ));
    assert_eq!(harness.status(&session).await, IntentStatus::PaymentRequired);
    assert_eq!(session.state(), SagaState::AwaitingPayment);

    // Retry with the other provider on the same intent.
    let retry = saga.select_provider(&mut session, redirect_params()).await;
    assert!(retry.is_ok());
}

#[tokio::test]
async fn reconciliation_timeout_leaves_intent_recoverable() {
    let harness = Harness::new();
    let saga = harness.orchestrator();
    let mut session = SagaSession::new();

    let view = saga
        .create_or_recover_intent(&mut session, form("wanjiku@example.com"))
        .await
        .unwrap();
    let initiation = saga.select_provider(&mut session, push_params()).await.unwrap();

    let err = saga.await_payment(&mut session, no_cancel()).await.unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::StillPending { intent_id, .. } if intent_id == view.intent_id
    ));
    assert_eq!(harness.status(&session).await, IntentStatus::PaymentRequired);

    // The provider settles later; a manual check picks it up.
    harness
        .push
        .set_outcome(&initiation.provider_reference, ProviderOutcome::Succeeded);
    let checked = saga.check_status(&mut session).await.unwrap();
    assert_eq!(checked.status, IntentStatus::Paid);

    saga.finalize(&mut session).await.unwrap();
    assert_eq!(harness.status(&session).await, IntentStatus::Completed);
}
