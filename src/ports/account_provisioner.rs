//! Account provisioner port.
//!
//! The downstream account system is outside this service. Finalization
//! reaches it only through this port, keyed by the intent id so a repeated
//! call returns the same account instead of creating a second one.

use crate::domain::foundation::{DomainError, IntentId};
use crate::domain::registration::RegistrationPayload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait AccountProvisioner: Send + Sync {
    /// Creates (or returns the existing) account for a paid registration.
    async fn provision(&self, request: ProvisionRequest) -> Result<ProvisionedAccount, DomainError>;
}

/// Request to create an account for a completed registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub intent_id: IntentId,
    /// Stable across retries of the same registration.
    pub idempotency_key: String,
    pub payload: RegistrationPayload,
}

impl ProvisionRequest {
    pub fn for_intent(intent_id: IntentId, payload: RegistrationPayload) -> Self {
        Self {
            intent_id,
            idempotency_key: format!("registration-{}", intent_id),
            payload,
        }
    }
}

/// Account returned by the downstream system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedAccount {
    pub account_id: String,
}
