//! Registration saga controller.
//!
//! Drives one client session through
//! `IDLE → CREATING → AWAITING_PAYMENT → RECONCILING → FINALIZING → DONE`.
//! The session state is an explicit [`SagaSession`] value owned by the
//! caller; nothing is kept in ambient or global state. Only the
//! [`RecoveryHint`] may be persisted client-side to survive a reload.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::application::handlers::{
    CheckPaymentStatusCommand, ConfirmPaymentCommand, ContinuePaymentCommand, CreateIntentCommand,
    FetchPendingQuery, FinalizeRegistrationCommand, FinalizeRegistrationResult, GetStatusQuery,
    InitiatePaymentCommand, InitiatePaymentResult, PendingRegistration,
};
use crate::application::{IntentView, ReconcileOutcome, SagaServices};
use crate::domain::foundation::{IntentId, StateMachine};
use crate::domain::registration::{
    IntentStatus, PaymentInitiation, ProviderKind, ProviderParams, RegistrationError, SagaState,
};

/// The only saga data a client may cache locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryHint {
    pub intent_id: IntentId,
    pub provider: Option<ProviderKind>,
}

/// Signup form as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationForm {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub institution: Option<String>,
}

/// Per-session saga context, passed into every orchestrator call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SagaSession {
    state: SagaState,
    hint: Option<RecoveryHint>,
    watched_reference: Option<String>,
}

impl SagaSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session rebuilt from a cached hint after a reload.
    pub fn restore(hint: RecoveryHint) -> Self {
        Self {
            state: SagaState::Idle,
            hint: Some(hint),
            watched_reference: None,
        }
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    pub fn hint(&self) -> Option<&RecoveryHint> {
        self.hint.as_ref()
    }

    pub fn intent_id(&self) -> Option<IntentId> {
        self.hint.as_ref().map(|h| h.intent_id)
    }

    fn require_intent(&self, attempted: &str) -> Result<IntentId, RegistrationError> {
        self.intent_id()
            .ok_or_else(|| RegistrationError::conflict(self.state_name(), attempted))
    }

    fn state_name(&self) -> String {
        format!("{:?}", self.state)
    }

    fn advance(&mut self, target: SagaState) -> Result<(), RegistrationError> {
        self.state = self.state.transition_to(target).map_err(|_| {
            RegistrationError::conflict(self.state_name(), format!("move to {:?}", target))
        })?;
        Ok(())
    }

    /// Aligns the session with server status, which is authoritative.
    fn settle(&mut self, status: IntentStatus) {
        self.state = match status {
            IntentStatus::Created | IntentStatus::PaymentRequired => SagaState::AwaitingPayment,
            IntentStatus::Paid => SagaState::Finalizing,
            IntentStatus::Completed => SagaState::Done,
            IntentStatus::Failed => SagaState::Error,
        };
    }

    /// Moves to `Error` for failures the caller cannot fix by retrying.
    fn fail(&mut self, err: RegistrationError) -> RegistrationError {
        let fatal = matches!(
            err,
            RegistrationError::Infrastructure(_)
                | RegistrationError::VersionConflict(_)
                | RegistrationError::NotFound(_)
        );
        if fatal && self.state.can_transition_to(&SagaState::Error) {
            self.state = SagaState::Error;
        }
        err
    }

    fn forget(&mut self) {
        *self = Self::default();
    }
}

/// Runs saga steps against [`SagaServices`] on behalf of one client session.
#[derive(Clone)]
pub struct RegistrationOrchestrator {
    services: SagaServices,
}

impl RegistrationOrchestrator {
    pub fn new(services: SagaServices) -> Self {
        Self { services }
    }

    /// Re-fetches the session's intent if it holds one, otherwise creates one.
    ///
    /// A hint naming an unknown or failed intent falls through to create.
    pub async fn create_or_recover_intent(
        &self,
        session: &mut SagaSession,
        form: RegistrationForm,
    ) -> Result<IntentView, RegistrationError> {
        if let Some(intent_id) = session.intent_id() {
            match self
                .services
                .get_status_handler()
                .handle(GetStatusQuery { intent_id })
                .await
            {
                Ok(view) if view.status != IntentStatus::Failed => {
                    tracing::debug!(intent_id = %intent_id, "Recovered intent from session");
                    session.settle(view.status);
                    return Ok(view);
                }
                Ok(_) | Err(RegistrationError::NotFound(_)) => {
                    tracing::info!(intent_id = %intent_id, "Discarding stale recovery hint");
                    session.forget();
                }
                Err(e) => return Err(session.fail(e)),
            }
        }

        if session.state == SagaState::Error {
            session.advance(SagaState::Idle)?;
        }
        session.advance(SagaState::Creating)?;

        let result = self
            .services
            .create_intent_handler()
            .handle(CreateIntentCommand {
                email: form.email,
                username: form.username,
                full_name: form.full_name,
                phone_number: form.phone_number,
                institution: form.institution,
                intent_id_hint: None,
            })
            .await;

        match result {
            Ok(created) => {
                session.hint = Some(RecoveryHint {
                    intent_id: created.intent.intent_id,
                    provider: None,
                });
                session.settle(created.intent.status);
                Ok(created.intent)
            }
            Err(e @ RegistrationError::Validation { .. }) => {
                session.state = SagaState::Idle;
                Err(e)
            }
            Err(e) => Err(session.fail(e)),
        }
    }

    /// Starts a payment with the provider selected by `params`.
    ///
    /// Failures are returned as-is; retrying means calling this again.
    pub async fn select_provider(
        &self,
        session: &mut SagaSession,
        params: ProviderParams,
    ) -> Result<PaymentInitiation, RegistrationError> {
        let intent_id = session.require_intent("select a provider for")?;
        session.advance(SagaState::AwaitingPayment)?;

        let provider = params.kind();
        let result = self
            .services
            .initiate_payment_handler()
            .handle(InitiatePaymentCommand { intent_id, params })
            .await;
        self.record_initiation(session, provider, result)
    }

    /// Starts a payment for the intent behind a resume token.
    pub async fn continue_payment(
        &self,
        session: &mut SagaSession,
        resume_token: &str,
        params: ProviderParams,
    ) -> Result<PaymentInitiation, RegistrationError> {
        let provider = params.kind();
        let result = self
            .services
            .continue_payment_handler()
            .handle(ContinuePaymentCommand {
                resume_token: resume_token.to_string(),
                params,
            })
            .await;

        if let Ok(initiated) = &result {
            session.hint = Some(RecoveryHint {
                intent_id: initiated.intent.intent_id,
                provider: Some(provider),
            });
            session.settle(initiated.intent.status);
        }
        self.record_initiation(session, provider, result)
    }

    fn record_initiation(
        &self,
        session: &mut SagaSession,
        provider: ProviderKind,
        result: Result<InitiatePaymentResult, RegistrationError>,
    ) -> Result<PaymentInitiation, RegistrationError> {
        match result {
            Ok(initiated) => {
                if let Some(hint) = session.hint.as_mut() {
                    hint.provider = Some(provider);
                }
                session.watched_reference = Some(initiated.initiation.provider_reference.clone());
                Ok(initiated.initiation)
            }
            Err(e) => Err(session.fail(e)),
        }
    }

    /// Builds a session for the pending intent behind a resume token.
    pub async fn resume(
        &self,
        resume_token: &str,
    ) -> Result<(SagaSession, PendingRegistration), RegistrationError> {
        let pending = self
            .services
            .fetch_pending_handler()
            .handle(FetchPendingQuery {
                resume_token: resume_token.to_string(),
            })
            .await?;

        let mut session = SagaSession::restore(RecoveryHint {
            intent_id: pending.intent.intent_id,
            provider: pending.intent.attempts.last().map(|a| a.provider),
        });
        session.settle(pending.intent.status);
        Ok((session, pending))
    }

    /// Handles the payer's return from hosted checkout.
    ///
    /// The reference is only a hint: the provider is asked for the outcome.
    pub async fn confirm_redirect(
        &self,
        session: &mut SagaSession,
        reference: &str,
    ) -> Result<IntentView, RegistrationError> {
        let intent_id = session.require_intent("confirm a payment for")?;
        let result = self
            .services
            .confirm_payment_handler()
            .handle(ConfirmPaymentCommand {
                intent_id,
                provider_reference: reference.to_string(),
            })
            .await;

        match result {
            Ok(confirmed) => {
                session.watched_reference = Some(reference.to_string());
                Ok(confirmed.intent)
            }
            Err(e) => Err(session.fail(e)),
        }
    }

    /// Waits for the payment through the reconciliation loop.
    ///
    /// # Errors
    ///
    /// - `PaymentDeclined` with the provider's reason
    /// - `StillPending` on timeout, or if a loop already runs for the intent
    pub async fn await_payment(
        &self,
        session: &mut SagaSession,
        cancel: watch::Receiver<bool>,
    ) -> Result<IntentView, RegistrationError> {
        let intent_id = session.require_intent("await payment for")?;
        session.advance(SagaState::Reconciling)?;

        let outcome = self
            .services
            .reconciliation()
            .run(intent_id, session.watched_reference.as_deref(), cancel)
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                session.state = SagaState::AwaitingPayment;
                return Err(session.fail(e));
            }
        };

        let still_pending = RegistrationError::StillPending {
            intent_id,
            retry_after_secs: self.services.settings().retry_after_secs(),
        };

        match outcome {
            ReconcileOutcome::Paid | ReconcileOutcome::Completed => {
                session.advance(SagaState::Finalizing)?;
            }
            ReconcileOutcome::Declined { reason } => {
                session.advance(SagaState::AwaitingPayment)?;
                return Err(RegistrationError::declined(reason));
            }
            ReconcileOutcome::Failed { reason } => {
                session.advance(SagaState::Error)?;
                return Err(RegistrationError::declined(reason));
            }
            ReconcileOutcome::TimedOut | ReconcileOutcome::AlreadyRunning => {
                session.advance(SagaState::AwaitingPayment)?;
                return Err(still_pending);
            }
            ReconcileOutcome::Cancelled => {
                session.advance(SagaState::AwaitingPayment)?;
            }
        }

        self.fetch(session, intent_id).await
    }

    /// Manual "check status": asks the providers and records what they report.
    pub async fn check_status(
        &self,
        session: &mut SagaSession,
    ) -> Result<IntentView, RegistrationError> {
        let intent_id = session.require_intent("check status for")?;
        let result = self
            .services
            .check_payment_status_handler()
            .handle(CheckPaymentStatusCommand { intent_id })
            .await;

        match result {
            Ok(checked) => {
                if session.state != SagaState::Reconciling {
                    session.settle(checked.intent.status);
                }
                Ok(checked.intent)
            }
            Err(e) => Err(session.fail(e)),
        }
    }

    /// Completes a paid registration. Safe to repeat.
    pub async fn finalize(
        &self,
        session: &mut SagaSession,
    ) -> Result<FinalizeRegistrationResult, RegistrationError> {
        let intent_id = session.require_intent("finalize")?;
        if !matches!(
            session.state,
            SagaState::AwaitingPayment | SagaState::Finalizing | SagaState::Done
        ) {
            return Err(RegistrationError::conflict(session.state_name(), "finalize"));
        }

        let result = self
            .services
            .finalize_handler()
            .handle(FinalizeRegistrationCommand { intent_id })
            .await;

        match result {
            Ok(done) => {
                session.state = SagaState::Done;
                Ok(done)
            }
            Err(e) => Err(session.fail(e)),
        }
    }

    async fn fetch(
        &self,
        session: &mut SagaSession,
        intent_id: IntentId,
    ) -> Result<IntentView, RegistrationError> {
        self.services
            .get_status_handler()
            .handle(GetStatusQuery { intent_id })
            .await
            .map_err(|e| session.fail(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_fixtures::{push_params, redirect_params, Fixture};
    use crate::domain::registration::{PaymentMode, ProviderOutcome};
    use std::time::Duration;

    fn form(email: &str) -> RegistrationForm {
        RegistrationForm {
            email: email.to_string(),
            username: "reader01".to_string(),
            full_name: "Test Reader".to_string(),
            phone_number: None,
            institution: None,
        }
    }

    fn orchestrator(fx: &Fixture) -> RegistrationOrchestrator {
        RegistrationOrchestrator::new(fx.services.clone())
    }

    #[tokio::test]
    async fn push_payment_settles_to_done() {
        let fx = Fixture::new();
        let saga = orchestrator(&fx);
        let mut session = SagaSession::new();

        let view = saga
            .create_or_recover_intent(&mut session, form("a@b.co"))
            .await
            .unwrap();
        assert_eq!(session.state(), SagaState::AwaitingPayment);

        let initiation = saga
            .select_provider(&mut session, push_params())
            .await
            .unwrap();
        assert_eq!(initiation.mode, PaymentMode::PushPending);
        assert_eq!(session.hint().unwrap().provider, Some(ProviderKind::Push));

        fx.push
            .set_outcome(&initiation.provider_reference, ProviderOutcome::Succeeded);
        saga.check_status(&mut session).await.unwrap();
        assert_eq!(session.state(), SagaState::Finalizing);

        let done = saga.finalize(&mut session).await.unwrap();
        assert_eq!(done.intent_id, view.intent_id);
        assert_eq!(session.state(), SagaState::Done);
    }

    #[tokio::test]
    async fn held_hint_never_creates_second_intent() {
        let fx = Fixture::new();
        let saga = orchestrator(&fx);
        let mut session = SagaSession::new();

        let first = saga
            .create_or_recover_intent(&mut session, form("a@b.co"))
            .await
            .unwrap();
        let mut reloaded = SagaSession::restore(session.hint().unwrap().clone());
        let second = saga
            .create_or_recover_intent(&mut reloaded, form("a@b.co"))
            .await
            .unwrap();

        assert_eq!(first.intent_id, second.intent_id);
        assert_eq!(fx.store.len().await, 1);
        assert_eq!(reloaded.state(), SagaState::AwaitingPayment);
    }

    #[tokio::test]
    async fn stale_hint_creates_fresh_intent() {
        let fx = Fixture::new();
        let saga = orchestrator(&fx);
        let mut session = SagaSession::restore(RecoveryHint {
            intent_id: IntentId::new(77).unwrap(),
            provider: Some(ProviderKind::Redirect),
        });

        let view = saga
            .create_or_recover_intent(&mut session, form("a@b.co"))
            .await
            .unwrap();

        assert_ne!(view.intent_id, IntentId::new(77).unwrap());
        assert_eq!(session.hint().unwrap().provider, None);
    }

    #[tokio::test]
    async fn invalid_form_leaves_session_idle() {
        let fx = Fixture::new();
        let saga = orchestrator(&fx);
        let mut session = SagaSession::new();

        let err = saga
            .create_or_recover_intent(&mut session, form("nope"))
            .await
            .unwrap_err();

        assert!(matches!(err, RegistrationError::Validation { .. }));
        assert_eq!(session.state(), SagaState::Idle);
        assert!(session.hint().is_none());
    }

    #[tokio::test]
    async fn select_provider_requires_an_intent() {
        let fx = Fixture::new();
        let saga = orchestrator(&fx);
        let mut session = SagaSession::new();

        let err = saga
            .select_provider(&mut session, push_params())
            .await
            .unwrap_err();

        assert!(matches!(err, RegistrationError::Conflict { .. }));
    }

    #[tokio::test]
    async fn await_payment_reports_paid() {
        let fx = Fixture::new();
        let saga = orchestrator(&fx);
        let mut session = SagaSession::new();
        saga.create_or_recover_intent(&mut session, form("a@b.co"))
            .await
            .unwrap();
        let initiation = saga
            .select_provider(&mut session, redirect_params())
            .await
            .unwrap();
        fx.checkout
            .set_outcome(&initiation.provider_reference, ProviderOutcome::Succeeded);
        saga.confirm_redirect(&mut session, &initiation.provider_reference)
            .await
            .unwrap();

        let (_tx, rx) = watch::channel(false);
        let view = saga.await_payment(&mut session, rx).await.unwrap();

        assert_eq!(view.status, IntentStatus::Paid);
        assert_eq!(session.state(), SagaState::Finalizing);
    }

    #[tokio::test]
    async fn await_payment_surfaces_decline_reason() {
        let fx = Fixture::new();
        let saga = orchestrator(&fx);
        let mut session = SagaSession::new();
        saga.create_or_recover_intent(&mut session, form("a@b.co"))
            .await
            .unwrap();
        let initiation = saga
            .select_provider(&mut session, push_params())
            .await
            .unwrap();
        fx.push.set_outcome(
            &initiation.provider_reference,
            ProviderOutcome::Declined {
                reason: "insufficient funds".to_string(),
            },
        );
        saga.check_status(&mut session).await.unwrap();

        let (_tx, rx) = watch::channel(false);
        let err = saga.await_payment(&mut session, rx).await.unwrap_err();

        assert_eq!(err, RegistrationError::declined("insufficient funds"));
        assert_eq!(session.state(), SagaState::AwaitingPayment);
    }

    #[tokio::test]
    async fn await_payment_times_out_as_still_pending() {
        let fx = Fixture::new();
        let saga = orchestrator(&fx);
        let mut session = SagaSession::new();
        let view = saga
            .create_or_recover_intent(&mut session, form("a@b.co"))
            .await
            .unwrap();
        saga.select_provider(&mut session, push_params())
            .await
            .unwrap();

        let (_tx, rx) = watch::channel(false);
        let err = saga.await_payment(&mut session, rx).await.unwrap_err();

        assert!(matches!(
            err,
            RegistrationError::StillPending { intent_id, .. } if intent_id == view.intent_id
        ));
        assert_eq!(session.state(), SagaState::AwaitingPayment);
    }

    #[tokio::test]
    async fn cancelled_wait_returns_control() {
        let fx = Fixture::builder()
            .settings(|s| s.reconcile_timeout = Duration::from_secs(30))
            .build();
        let saga = orchestrator(&fx);
        let mut session = SagaSession::new();
        saga.create_or_recover_intent(&mut session, form("a@b.co"))
            .await
            .unwrap();
        saga.select_provider(&mut session, push_params())
            .await
            .unwrap();

        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = tx.send(true);
        });
        let view = saga.await_payment(&mut session, rx).await.unwrap();

        assert_eq!(view.status, IntentStatus::PaymentRequired);
        assert_eq!(session.state(), SagaState::AwaitingPayment);
    }

    #[tokio::test]
    async fn finalize_before_payment_is_a_conflict() {
        let fx = Fixture::new();
        let saga = orchestrator(&fx);
        let mut session = SagaSession::new();
        saga.create_or_recover_intent(&mut session, form("a@b.co"))
            .await
            .unwrap();

        let err = saga.finalize(&mut session).await.unwrap_err();

        assert!(matches!(err, RegistrationError::Conflict { .. }));
        assert_eq!(session.state(), SagaState::AwaitingPayment);
        assert_eq!(fx.accounts.call_count(), 0);
    }

    #[test]
    fn recovery_hint_carries_no_payload() {
        let hint = RecoveryHint {
            intent_id: IntentId::new(5).unwrap(),
            provider: Some(ProviderKind::Push),
        };
        let json = serde_json::to_value(&hint).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
