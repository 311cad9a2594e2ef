//! Provider callback endpoints.
//!
//! - `POST /api/webhooks/push` - signed with `X-Push-Signature: t=..,v1=..`
//! - `POST /api/webhooks/redirect` - signed with `X-Checkout-Signature: <hex>`
//!
//! Callbacks are verified against the raw body. A verified callback for an
//! unknown reference is acknowledged so the provider stops redelivering it.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use crate::application::{CallbackDisposition, ProviderCallbackCommand, SagaServices};
use crate::domain::registration::{ProviderKind, RegistrationError};

use super::error::ApiError;

pub const PUSH_SIGNATURE_HEADER: &str = "X-Push-Signature";
pub const CHECKOUT_SIGNATURE_HEADER: &str = "X-Checkout-Signature";

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Create the webhook router, mounted at `/api/webhooks`.
pub fn webhook_routes() -> Router<SagaServices> {
    Router::new()
        .route("/push", post(handle_push_callback))
        .route("/redirect", post(handle_redirect_callback))
}

/// POST /api/webhooks/push
pub async fn handle_push_callback(
    State(services): State<SagaServices>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    handle_callback(services, ProviderKind::Push, PUSH_SIGNATURE_HEADER, headers, body).await
}

/// POST /api/webhooks/redirect
pub async fn handle_redirect_callback(
    State(services): State<SagaServices>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    handle_callback(
        services,
        ProviderKind::Redirect,
        CHECKOUT_SIGNATURE_HEADER,
        headers,
        body,
    )
    .await
}

async fn handle_callback(
    services: SagaServices,
    provider: ProviderKind,
    signature_header: &str,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(signature_header)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!(provider = %provider, "Callback without signature header");
            ApiError(RegistrationError::InvalidSignature)
        })?;

    let disposition = services
        .provider_callback_handler()
        .handle(ProviderCallbackCommand {
            provider,
            payload: body.to_vec(),
            signature: signature.to_string(),
        })
        .await?;

    if let CallbackDisposition::Applied {
        intent_id,
        resolution,
    } = &disposition
    {
        tracing::debug!(
            provider = %provider,
            intent_id = %intent_id,
            changed = resolution.changed(),
            "Callback applied"
        );
    }

    Ok(Json(WebhookAck { received: true }))
}
