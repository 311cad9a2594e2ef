//! Axum router configuration for registration endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::application::SagaServices;

use super::handlers::{
    check_payment_status, complete_registration, confirm_payment, create_registration,
    get_registration, initiate_payment, reconcile_registration,
};

/// Create the registration API router, mounted at `/api/registrations`.
///
/// # Routes
/// - `POST /` - Create or recover an intent
/// - `GET /:id` - Fetch status (read-only)
/// - `POST /:id/payments` - Select a provider and initiate
/// - `POST /:id/payments/confirm` - Confirm a redirect reference
/// - `POST /:id/payments/check` - Manual status check
/// - `POST /:id/reconcile` - Wait for the payment outcome
/// - `POST /:id/complete` - Finalize
pub fn registration_routes() -> Router<SagaServices> {
    Router::new()
        .route("/", post(create_registration))
        .route("/:id", get(get_registration))
        .route("/:id/payments", post(initiate_payment))
        .route("/:id/payments/confirm", post(confirm_payment))
        .route("/:id/payments/check", post(check_payment_status))
        .route("/:id/reconcile", post(reconcile_registration))
        .route("/:id/complete", post(complete_registration))
}
