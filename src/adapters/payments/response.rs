//! Shared handling of provider HTTP responses.

use reqwest::StatusCode;

use crate::ports::{PaymentError, PaymentErrorCode};

/// Maps a non-success provider response to a payment error.
pub(super) fn error_for_status(provider: &str, status: StatusCode, body: &str) -> PaymentError {
    let message = format!("{} API error ({}): {}", provider, status.as_u16(), body);
    let error = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PaymentError::authentication(message),
        StatusCode::NOT_FOUND => PaymentError::not_found(provider),
        StatusCode::TOO_MANY_REQUESTS => {
            PaymentError::new(PaymentErrorCode::RateLimitExceeded, message)
        }
        s if s.is_client_error() => PaymentError::rejected(message),
        _ => PaymentError::provider(message),
    };
    error.with_provider_code(status.as_u16().to_string())
}

/// Maps a transport failure to a payment error.
pub(super) fn transport_error(provider: &str, err: reqwest::Error) -> PaymentError {
    if err.is_timeout() {
        PaymentError::network(format!("{} request timed out", provider))
    } else {
        PaymentError::network(format!("{} request failed: {}", provider, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_rejections() {
        let err = error_for_status("push", StatusCode::BAD_REQUEST, "bad phone");
        assert_eq!(err.code, PaymentErrorCode::Rejected);
        assert_eq!(err.provider_code.as_deref(), Some("400"));
        assert!(!err.retryable);
    }

    #[test]
    fn throttling_is_retryable() {
        let err = error_for_status("push", StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(err.code, PaymentErrorCode::RateLimitExceeded);
        assert!(err.retryable);
    }

    #[test]
    fn auth_and_server_errors() {
        assert_eq!(
            error_for_status("checkout", StatusCode::UNAUTHORIZED, "").code,
            PaymentErrorCode::AuthenticationError
        );
        assert_eq!(
            error_for_status("checkout", StatusCode::BAD_GATEWAY, "").code,
            PaymentErrorCode::ProviderError
        );
        assert_eq!(
            error_for_status("checkout", StatusCode::NOT_FOUND, "").code,
            PaymentErrorCode::NotFound
        );
    }
}
