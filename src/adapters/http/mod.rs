//! HTTP adapters - REST API for the registration saga.
//!
//! Each area has its own module with DTOs, handlers and routes. All of them
//! share [`SagaServices`] as router state.

pub mod error;
pub mod middleware;
pub mod registration;
pub mod resume;
pub mod webhooks;

use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::application::SagaServices;

pub use error::{ApiError, ErrorResponse};
pub use registration::registration_routes;
pub use resume::resume_routes;
pub use webhooks::webhook_routes;

/// Transport-level settings for the router.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Upper bound for any request, including a reconciliation wait.
    pub request_timeout: Duration,
    /// Allowed browser origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(150),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health - Liveness
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Create the complete API router.
///
/// ```ignore
/// let app = saga_router(services, &HttpOptions::default());
/// axum::serve(listener, app).await?;
/// ```
pub fn saga_router(services: SagaServices, options: &HttpOptions) -> Router {
    let api = Router::new()
        .nest("/registrations", registration_routes())
        .nest("/resume", resume_routes())
        .nest("/webhooks", webhook_routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TimeoutLayer::new(options.request_timeout))
        .layer(cors_layer(&options.cors_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(services)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::adapters::payments::MockPushProvider;
    use crate::application::handlers::test_fixtures::Fixture;
    use crate::domain::foundation::EmailAddress;
    use crate::domain::registration::{IntentStatus, ProviderOutcome};

    fn app(fx: &Fixture) -> Router {
        saga_router(fx.services.clone(), &HttpOptions::default())
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn signup(email: &str) -> Value {
        json!({
            "email": email,
            "username": "reader01",
            "full_name": "Test Reader",
            "phone_number": "+254700000001"
        })
    }

    fn push_body() -> Value {
        json!({ "provider": "PUSH", "phone_number": "+254712345678" })
    }

    async fn created_intent(fx: &Fixture) -> i64 {
        let (status, body) = send(
            app(fx),
            post_json("/api/registrations", signup("reader@example.com")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["intent"]["intent_id"].as_i64().unwrap()
    }

    async fn push_callback(fx: &Fixture, reference: &str, outcome: ProviderOutcome) -> StatusCode {
        let request = Request::builder()
            .method("POST")
            .uri("/api/webhooks/push")
            .header(webhooks::PUSH_SIGNATURE_HEADER, "t=1,v1=00")
            .body(Body::from(MockPushProvider::callback_payload(reference, outcome)))
            .unwrap();
        send(app(fx), request).await.0
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let fx = Fixture::new();
        let (status, body) = send(app(&fx), get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn create_then_recover_with_hint() {
        let fx = Fixture::new();
        let id = created_intent(&fx).await;

        let mut body = signup("reader@example.com");
        body["intent_id"] = json!(id);
        let (status, body) = send(app(&fx), post_json("/api/registrations", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recovered"], true);
        assert_eq!(body["intent"]["intent_id"], id);
        assert_eq!(body["intent"]["status"], "CREATED");
    }

    #[tokio::test]
    async fn invalid_signup_is_bad_request() {
        let fx = Fixture::new();
        let (status, body) = send(
            app(&fx),
            post_json("/api/registrations", signup("not-an-email")),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids() {
        let fx = Fixture::new();

        let (status, body) = send(app(&fx), get("/api/registrations/999")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "INTENT_NOT_FOUND");

        let (status, _) = send(app(&fx), get("/api/registrations/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn push_payment_through_callback_to_completion() {
        let fx = Fixture::new();
        let id = created_intent(&fx).await;

        let (status, body) = send(
            app(&fx),
            post_json(&format!("/api/registrations/{}/payments", id), push_body()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["payment"]["mode"], "PUSH_PENDING");
        assert_eq!(body["intent"]["status"], "PAYMENT_REQUIRED");
        let reference = body["payment"]["provider_reference"]
            .as_str()
            .unwrap()
            .to_string();

        let status = push_callback(&fx, &reference, ProviderOutcome::Succeeded).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            app(&fx),
            post_json(&format!("/api/registrations/{}/reconcile", id), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "PAID");

        let (status, first) = send(
            app(&fx),
            post_json(&format!("/api/registrations/{}/complete", id), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["newly_completed"], true);

        let (status, second) = send(
            app(&fx),
            post_json(&format!("/api/registrations/{}/complete", id), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["newly_completed"], false);
        assert_eq!(second["account_id"], first["account_id"]);
        assert_eq!(fx.accounts.call_count(), 1);
    }

    #[tokio::test]
    async fn reconcile_without_outcome_is_accepted_with_retry_after() {
        let fx = Fixture::new();
        let (id, _) = fx.intent_with_push_attempt().await;

        let (status, body) = send(
            app(&fx),
            post_json(&format!("/api/registrations/{}/reconcile", id), json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body["retry_after_secs"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn declined_callback_surfaces_as_payment_required() {
        let fx = Fixture::new();
        let (id, reference) = fx.intent_with_push_attempt().await;

        let declined = ProviderOutcome::Declined {
            reason: "Request cancelled by user".to_string(),
        };
        assert_eq!(push_callback(&fx, &reference, declined).await, StatusCode::OK);

        let (status, body) = send(
            app(&fx),
            post_json(&format!("/api/registrations/{}/reconcile", id), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["code"], "PAYMENT_DECLINED");
        assert_eq!(fx.intent(id).await.status, IntentStatus::PaymentRequired);
    }

    #[tokio::test]
    async fn webhook_without_signature_is_unauthorized() {
        let fx = Fixture::new();
        let request = Request::builder()
            .method("POST")
            .uri("/api/webhooks/redirect")
            .body(Body::from("{}"))
            .unwrap();

        let (status, body) = send(app(&fx), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_SIGNATURE");
    }

    #[tokio::test]
    async fn completing_unpaid_registration_conflicts() {
        let fx = Fixture::new();
        let id = created_intent(&fx).await;

        let (status, _) = send(
            app(&fx),
            post_json(&format!("/api/registrations/{}/complete", id), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn resume_flow_over_http() {
        let fx = Fixture::new();
        let id = created_intent(&fx).await;

        let (status, body) = send(
            app(&fx),
            post_json("/api/resume/code", json!({ "email": "reader@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body["expires_in_secs"].as_u64().unwrap() > 0);

        let code = fx
            .codes
            .last_code_for(&EmailAddress::parse("reader@example.com").unwrap())
            .unwrap();
        let (status, body) = send(
            app(&fx),
            post_json(
                "/api/resume/verify",
                json!({ "email": "reader@example.com", "code": code }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["resume_token"].as_str().unwrap().to_string();

        let request = Request::builder()
            .uri("/api/resume/pending")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(&fx), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent"]["intent_id"], id);
        assert_eq!(body["username"], "reader01");

        let request = Request::builder()
            .method("POST")
            .uri("/api/resume/payments")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(push_body().to_string()))
            .unwrap();
        let (status, body) = send(app(&fx), request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["intent"]["intent_id"], id);
    }

    #[tokio::test]
    async fn resume_endpoints_require_bearer() {
        let fx = Fixture::new();
        let (status, body) = send(app(&fx), get("/api/resume/pending")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "RESUME_REJECTED");
    }

    #[tokio::test]
    async fn unknown_email_gets_same_code_response() {
        let fx = Fixture::new();
        fx.create_intent("reader@example.com").await;

        let (known_status, known) = send(
            app(&fx),
            post_json("/api/resume/code", json!({ "email": "reader@example.com" })),
        )
        .await;
        let (unknown_status, unknown) = send(
            app(&fx),
            post_json("/api/resume/code", json!({ "email": "stranger@example.com" })),
        )
        .await;

        assert_eq!(known_status, unknown_status);
        assert_eq!(known, unknown);
    }

    #[tokio::test]
    async fn request_id_is_propagated() {
        let fx = Fixture::new();
        let response = app(&fx).oneshot(get("/health")).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
