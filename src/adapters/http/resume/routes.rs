//! Axum router configuration for resume endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::application::SagaServices;

use super::handlers::{continue_payment, fetch_pending, request_code, verify_code};

/// Create the resume API router, mounted at `/api/resume`.
///
/// `pending` and `payments` require `Authorization: Bearer <resume token>`.
pub fn resume_routes() -> Router<SagaServices> {
    Router::new()
        .route("/code", post(request_code))
        .route("/verify", post(verify_code))
        .route("/pending", get(fetch_pending))
        .route("/payments", post(continue_payment))
}
