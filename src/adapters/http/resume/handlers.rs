//! HTTP handlers for resume endpoints.
//!
//! Code requests always answer the same way so the endpoint cannot be used
//! to discover which emails have pending registrations.

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::ResumeBearer;
use crate::adapters::http::registration::PaymentResponse;
use crate::application::{
    ContinuePaymentCommand, FetchPendingQuery, RequestCodeCommand, SagaServices,
    VerifyCodeCommand,
};
use crate::domain::registration::ProviderParams;

use super::dto::{
    PendingRegistrationResponse, RequestCodeRequest, RequestCodeResponse, VerifyCodeRequest,
    VerifyCodeResponse,
};

/// POST /api/resume/code - Email a one-time code
pub async fn request_code(
    State(services): State<SagaServices>,
    Json(request): Json<RequestCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = services
        .request_code_handler()
        .handle(RequestCodeCommand {
            email: request.email,
        })
        .await?;
    Ok((StatusCode::ACCEPTED, Json(RequestCodeResponse::from(result))))
}

/// POST /api/resume/verify - Exchange a code for a resume token
pub async fn verify_code(
    State(services): State<SagaServices>,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = services
        .verify_code_handler()
        .handle(VerifyCodeCommand {
            email: request.email,
            code: request.code,
        })
        .await?;
    Ok(Json(VerifyCodeResponse::from(result)))
}

/// GET /api/resume/pending - The registration behind the token
pub async fn fetch_pending(
    State(services): State<SagaServices>,
    ResumeBearer(resume_token): ResumeBearer,
) -> Result<impl IntoResponse, ApiError> {
    let pending = services
        .fetch_pending_handler()
        .handle(FetchPendingQuery { resume_token })
        .await?;
    Ok(Json(PendingRegistrationResponse::from(pending)))
}

/// POST /api/resume/payments - Pay for the registration behind the token
pub async fn continue_payment(
    State(services): State<SagaServices>,
    ResumeBearer(resume_token): ResumeBearer,
    Json(params): Json<ProviderParams>,
) -> Result<impl IntoResponse, ApiError> {
    let result = services
        .continue_payment_handler()
        .handle(ContinuePaymentCommand {
            resume_token,
            params,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(PaymentResponse::from(result))))
}
