//! In-memory intent store for tests and local development.
//!
//! Applies the same optimistic version check as the Postgres adapter so
//! concurrency behavior can be exercised without a database.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, EmailAddress, ErrorCode, IntentId};
use crate::domain::registration::{IntentStatus, NewIntent, RegistrationIntent};
use crate::ports::{IntentStatusView, IntentStore};

/// Intent store backed by a `HashMap` behind a `tokio` lock.
#[derive(Debug, Clone)]
pub struct InMemoryIntentStore {
    intents: Arc<RwLock<HashMap<IntentId, RegistrationIntent>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryIntentStore {
    pub fn new() -> Self {
        Self {
            intents: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Number of stored intents.
    pub async fn len(&self) -> usize {
        self.intents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryIntentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntentStore for InMemoryIntentStore {
    async fn create(&self, intent: NewIntent) -> Result<RegistrationIntent, DomainError> {
        let raw = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = IntentId::new(raw)?;
        let intent = RegistrationIntent::from_new(id, intent);
        self.intents.write().await.insert(id, intent.clone());
        Ok(intent)
    }

    async fn find(&self, id: IntentId) -> Result<Option<RegistrationIntent>, DomainError> {
        Ok(self.intents.read().await.get(&id).cloned())
    }

    async fn find_by_reference(
        &self,
        provider_reference: &str,
    ) -> Result<Option<RegistrationIntent>, DomainError> {
        Ok(self
            .intents
            .read()
            .await
            .values()
            .find(|i| i.attempt_by_reference(provider_reference).is_some())
            .cloned())
    }

    async fn find_open_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<RegistrationIntent>, DomainError> {
        Ok(self
            .intents
            .read()
            .await
            .values()
            .filter(|i| {
                i.payload.email == *email
                    && matches!(
                        i.status,
                        IntentStatus::Created | IntentStatus::PaymentRequired | IntentStatus::Paid
                    )
            })
            .max_by_key(|i| (i.created_at, i.id))
            .cloned())
    }

    async fn save(&self, intent: &RegistrationIntent) -> Result<i64, DomainError> {
        let mut intents = self.intents.write().await;
        let stored = intents.get_mut(&intent.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::IntentNotFound,
                format!("Registration intent {} not found", intent.id),
            )
        })?;

        if stored.version != intent.version {
            return Err(DomainError::new(
                ErrorCode::VersionConflict,
                format!(
                    "Registration intent {} is at version {}, expected {}",
                    intent.id, stored.version, intent.version
                ),
            ));
        }

        let mut next = intent.clone();
        next.version = intent.version + 1;
        *stored = next;
        Ok(intent.version + 1)
    }

    async fn status(&self, id: IntentId) -> Result<Option<IntentStatusView>, DomainError> {
        Ok(self
            .intents
            .read()
            .await
            .get(&id)
            .map(IntentStatusView::from_intent))
    }
}
