//! In-memory account provisioner.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{AccountProvisioner, ProvisionRequest, ProvisionedAccount};

#[derive(Default)]
struct ProvisionerState {
    by_key: HashMap<String, ProvisionedAccount>,
    calls: usize,
    fail: bool,
}

/// Issues `acct_{intent_id}` accounts, returning the same one per
/// idempotency key.
#[derive(Default, Clone)]
pub struct InMemoryAccountProvisioner {
    inner: Arc<Mutex<ProvisionerState>>,
}

impl InMemoryAccountProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ProvisionerState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes provisioning fail until reset.
    pub fn set_failing(&self, fail: bool) {
        self.state().fail = fail;
    }

    /// Number of `provision` calls, including failed ones.
    pub fn call_count(&self) -> usize {
        self.state().calls
    }

    /// Number of distinct accounts created.
    pub fn account_count(&self) -> usize {
        self.state().by_key.len()
    }
}

#[async_trait]
impl AccountProvisioner for InMemoryAccountProvisioner {
    async fn provision(&self, request: ProvisionRequest) -> Result<ProvisionedAccount, DomainError> {
        let mut state = self.state();
        state.calls += 1;
        if state.fail {
            return Err(DomainError::new(
                ErrorCode::ExternalServiceError,
                "Account system unavailable",
            ));
        }

        let account = state
            .by_key
            .entry(request.idempotency_key)
            .or_insert_with(|| ProvisionedAccount {
                account_id: format!("acct_{}", request.intent_id),
            })
            .clone();
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::IntentId;
    use crate::domain::registration::test_support;

    #[tokio::test]
    async fn same_key_returns_same_account() {
        let provisioner = InMemoryAccountProvisioner::new();
        let id = IntentId::new(9).unwrap();

        let a = provisioner
            .provision(ProvisionRequest::for_intent(id, test_support::payload("a@b.co")))
            .await
            .unwrap();
        let b = provisioner
            .provision(ProvisionRequest::for_intent(id, test_support::payload("a@b.co")))
            .await
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.account_id, "acct_9");
        assert_eq!(provisioner.call_count(), 2);
        assert_eq!(provisioner.account_count(), 1);
    }

    #[tokio::test]
    async fn failure_is_external_service_error() {
        let provisioner = InMemoryAccountProvisioner::new();
        provisioner.set_failing(true);

        let err = provisioner
            .provision(ProvisionRequest::for_intent(
                IntentId::new(1).unwrap(),
                test_support::payload("a@b.co"),
            ))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ExternalServiceError);
    }
}
