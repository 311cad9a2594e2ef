//! Resume token extraction.
//!
//! Resumed clients present the token from code verification as
//! `Authorization: Bearer <token>`. The extractor only reads the header;
//! the token is checked by the resume handlers.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::adapters::http::error::ApiError;
use crate::domain::registration::RegistrationError;

/// Raw resume token taken from a Bearer header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeBearer(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ResumeBearer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| ResumeBearer(token.to_string()))
            .ok_or(ApiError(RegistrationError::ResumeRejected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;

    async fn extract(header: Option<&str>) -> Result<ResumeBearer, ApiError> {
        let mut builder = Request::builder().uri("/api/resume/pending");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        ResumeBearer::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_bearer_token() {
        let bearer = extract(Some("Bearer abc.def.ghi")).await.unwrap();
        assert_eq!(bearer.0, "abc.def.ghi");
    }

    #[tokio::test]
    async fn missing_or_malformed_header_is_rejected() {
        for header in [None, Some("Basic abc"), Some("Bearer   ")] {
            let rejection = extract(header).await.unwrap_err();
            assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }
}
