//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Request timeout must exceed the reconciliation window")]
    TimeoutShorterThanReconciliation,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Invalid URL for {0}")]
    InvalidUrl(&'static str),

    #[error("Invalid registration fee")]
    InvalidFee,

    #[error("Invalid payment policy: {0}")]
    InvalidPaymentPolicy(&'static str),

    #[error("Invalid Resend API key format")]
    InvalidResendKey,

    #[error("Invalid from email address")]
    InvalidFromEmail,

    #[error("Resume token secret must be at least 32 bytes")]
    WeakTokenSecret,

    #[error("Invalid resume timing: {0}")]
    InvalidResumeTiming(&'static str),

    #[error("Invalid saga timing: {0}")]
    InvalidSagaTiming(&'static str),

    #[error("{0} is required in production")]
    RequiredInProduction(&'static str),
}
