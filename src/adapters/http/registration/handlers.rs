//! HTTP handlers for registration endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use tokio::sync::watch;

use crate::adapters::http::error::ApiError;
use crate::application::{
    CheckPaymentStatusCommand, ConfirmPaymentCommand, CreateIntentCommand,
    FinalizeRegistrationCommand, GetStatusQuery, InitiatePaymentCommand, ReconcileOutcome,
    SagaServices,
};
use crate::domain::foundation::IntentId;
use crate::domain::registration::{ProviderParams, RegistrationError};

use super::dto::{
    CheckStatusResponse, CompleteRegistrationResponse, ConfirmPaymentRequest,
    ConfirmPaymentResponse, CreateRegistrationRequest, PaymentResponse, ReconcileResponse,
    ReconcileResult, RegistrationResponse,
};

fn parse_intent_id(raw: &str) -> Result<IntentId, ApiError> {
    raw.parse::<IntentId>()
        .map_err(|e| ApiError(RegistrationError::from(e)))
}

/// POST /api/registrations - Create an intent, or recover the one the hint names
pub async fn create_registration(
    State(services): State<SagaServices>,
    Json(request): Json<CreateRegistrationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let handler = services.create_intent_handler();
    let cmd = CreateIntentCommand {
        email: request.email,
        username: request.username,
        full_name: request.full_name,
        phone_number: request.phone_number,
        institution: request.institution,
        intent_id_hint: request.intent_id,
    };

    let result = handler.handle(cmd).await?;
    let status = if result.recovered {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json(RegistrationResponse::from(result))))
}

/// GET /api/registrations/:id - Read-only status
pub async fn get_registration(
    State(services): State<SagaServices>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let intent_id = parse_intent_id(&id)?;
    let view = services
        .get_status_handler()
        .handle(GetStatusQuery { intent_id })
        .await?;
    Ok(Json(view))
}

/// POST /api/registrations/:id/payments - Select a provider and start paying
pub async fn initiate_payment(
    State(services): State<SagaServices>,
    Path(id): Path<String>,
    Json(params): Json<ProviderParams>,
) -> Result<impl IntoResponse, ApiError> {
    let intent_id = parse_intent_id(&id)?;
    let result = services
        .initiate_payment_handler()
        .handle(InitiatePaymentCommand { intent_id, params })
        .await?;
    Ok((StatusCode::CREATED, Json(PaymentResponse::from(result))))
}

/// POST /api/registrations/:id/payments/confirm - Confirm a hosted checkout
pub async fn confirm_payment(
    State(services): State<SagaServices>,
    Path(id): Path<String>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let intent_id = parse_intent_id(&id)?;
    let result = services
        .confirm_payment_handler()
        .handle(ConfirmPaymentCommand {
            intent_id,
            provider_reference: request.reference,
        })
        .await?;
    Ok(Json(ConfirmPaymentResponse::from(result)))
}

/// POST /api/registrations/:id/payments/check - Ask the providers now
pub async fn check_payment_status(
    State(services): State<SagaServices>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let intent_id = parse_intent_id(&id)?;
    let result = services
        .check_payment_status_handler()
        .handle(CheckPaymentStatusCommand { intent_id })
        .await?;
    Ok(Json(CheckStatusResponse::from(result)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReconcileParams {
    /// Attempt whose decline ends the wait. Defaults to the latest attempt.
    pub reference: Option<String>,
}

/// POST /api/registrations/:id/reconcile - Wait for the payment outcome
///
/// Holds the request for up to the reconciliation window. A client that
/// disconnects cancels the wait.
pub async fn reconcile_registration(
    State(services): State<SagaServices>,
    Path(id): Path<String>,
    Query(params): Query<ReconcileParams>,
) -> Result<impl IntoResponse, ApiError> {
    let intent_id = parse_intent_id(&id)?;
    let (_cancel, cancel_rx) = watch::channel(false);

    let outcome = services
        .reconciliation()
        .run(intent_id, params.reference.as_deref(), cancel_rx)
        .await?;

    let result = match &outcome {
        ReconcileOutcome::Declined { reason } | ReconcileOutcome::Failed { reason } => {
            return Err(RegistrationError::declined(reason.clone()).into());
        }
        other => ReconcileResult::from_outcome(other),
    };
    let Some(result) = result else {
        return Err(RegistrationError::StillPending {
            intent_id,
            retry_after_secs: services.settings().retry_after_secs(),
        }
        .into());
    };

    let intent = services
        .get_status_handler()
        .handle(GetStatusQuery { intent_id })
        .await?;
    Ok(Json(ReconcileResponse { result, intent }))
}

/// POST /api/registrations/:id/complete - Provision the account (idempotent)
pub async fn complete_registration(
    State(services): State<SagaServices>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let intent_id = parse_intent_id(&id)?;
    let result = services
        .finalize_handler()
        .handle(FinalizeRegistrationCommand { intent_id })
        .await?;
    Ok(Json(CompleteRegistrationResponse::from(result)))
}
