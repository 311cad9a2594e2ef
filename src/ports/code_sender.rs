//! Code sender port for delivering resume codes.

use crate::domain::foundation::{DomainError, EmailAddress};
use crate::domain::resume::OneTimeCode;
use async_trait::async_trait;

/// Delivers a one-time code out of band (email).
///
/// Implementations must not log the code.
#[async_trait]
pub trait CodeSender: Send + Sync {
    async fn send_code(
        &self,
        to: &EmailAddress,
        code: &OneTimeCode,
        expires_in_secs: u64,
    ) -> Result<(), DomainError>;
}
