//! Load, mutate, save with bounded retry on version conflicts.

use std::sync::Arc;

use crate::domain::foundation::{ErrorCode, IntentId};
use crate::domain::registration::{RegistrationError, RegistrationIntent};
use crate::ports::IntentStore;

/// Applies mutations to intents through the store's optimistic version check.
///
/// On `VersionConflict` the intent is reloaded and the mutation re-run
/// against the fresh copy, so a mutation must be a pure function of the
/// intent it is given.
#[derive(Clone)]
pub struct IntentWriter {
    store: Arc<dyn IntentStore>,
    max_retries: u32,
}

impl IntentWriter {
    pub fn new(store: Arc<dyn IntentStore>, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    pub fn store(&self) -> &Arc<dyn IntentStore> {
        &self.store
    }

    pub async fn load(&self, id: IntentId) -> Result<RegistrationIntent, RegistrationError> {
        self.store
            .find(id)
            .await?
            .ok_or(RegistrationError::NotFound(id))
    }

    /// Runs `mutate` and saves the result if it reports a change.
    ///
    /// `mutate` returns its output and whether the intent changed.
    pub async fn update<T, F>(
        &self,
        id: IntentId,
        mut mutate: F,
    ) -> Result<(RegistrationIntent, T), RegistrationError>
    where
        F: FnMut(&mut RegistrationIntent) -> Result<(T, bool), RegistrationError> + Send,
        T: Send,
    {
        for attempt in 0..=self.max_retries {
            let mut intent = self.load(id).await?;
            let (output, changed) = mutate(&mut intent)?;
            if !changed {
                return Ok((intent, output));
            }

            match self.store.save(&intent).await {
                Ok(version) => {
                    intent.version = version;
                    return Ok((intent, output));
                }
                Err(e) if e.code == ErrorCode::VersionConflict => {
                    tracing::warn!(
                        intent_id = %id,
                        attempt = attempt + 1,
                        "Version conflict saving intent, reloading"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RegistrationError::VersionConflict(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryIntentStore;
    use crate::domain::foundation::{DomainError, EmailAddress, Timestamp};
    use crate::domain::registration::{test_support, IntentStatus, NewIntent};
    use crate::ports::IntentStatusView;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn seeded() -> (Arc<InMemoryIntentStore>, IntentId) {
        let store = Arc::new(InMemoryIntentStore::new());
        let intent = store
            .create(NewIntent::new(
                test_support::payload("a@b.co"),
                test_support::fee(),
                Timestamp::now(),
                3600,
            ))
            .await
            .unwrap();
        (store, intent.id)
    }

    #[tokio::test]
    async fn unchanged_mutation_does_not_save() {
        let (store, id) = seeded().await;
        let writer = IntentWriter::new(store.clone(), 3);

        let (intent, out) = writer.update(id, |_| Ok((7, false))).await.unwrap();

        assert_eq!(out, 7);
        assert_eq!(intent.version, 1);
        assert_eq!(store.find(id).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn changed_mutation_bumps_version() {
        let (store, id) = seeded().await;
        let writer = IntentWriter::new(store.clone(), 3);

        let (intent, _) = writer
            .update(id, |i| {
                i.fail("test", Timestamp::now())?;
                Ok(((), true))
            })
            .await
            .unwrap();

        assert_eq!(intent.version, 2);
        assert_eq!(intent.status, IntentStatus::Failed);
    }

    #[tokio::test]
    async fn missing_intent_is_not_found() {
        let (store, _) = seeded().await;
        let writer = IntentWriter::new(store, 3);
        let missing = IntentId::new(999).unwrap();

        let err = writer.update(missing, |_| Ok(((), true))).await.unwrap_err();
        assert_eq!(err, RegistrationError::NotFound(missing));
    }

    /// Store whose saves always lose the race.
    struct AlwaysConflicting {
        inner: InMemoryIntentStore,
        saves: AtomicU32,
    }

    #[async_trait]
    impl IntentStore for AlwaysConflicting {
        async fn create(&self, intent: NewIntent) -> Result<RegistrationIntent, DomainError> {
            self.inner.create(intent).await
        }
        async fn find(&self, id: IntentId) -> Result<Option<RegistrationIntent>, DomainError> {
            self.inner.find(id).await
        }
        async fn find_by_reference(
            &self,
            reference: &str,
        ) -> Result<Option<RegistrationIntent>, DomainError> {
            self.inner.find_by_reference(reference).await
        }
        async fn find_open_by_email(
            &self,
            email: &EmailAddress,
        ) -> Result<Option<RegistrationIntent>, DomainError> {
            self.inner.find_open_by_email(email).await
        }
        async fn save(&self, _intent: &RegistrationIntent) -> Result<i64, DomainError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Err(DomainError::new(ErrorCode::VersionConflict, "stale"))
        }
        async fn status(&self, id: IntentId) -> Result<Option<IntentStatusView>, DomainError> {
            self.inner.status(id).await
        }
    }

    #[tokio::test]
    async fn gives_up_after_retry_budget() {
        let inner = InMemoryIntentStore::new();
        let id = inner
            .create(NewIntent::new(
                test_support::payload("a@b.co"),
                test_support::fee(),
                Timestamp::now(),
                3600,
            ))
            .await
            .unwrap()
            .id;
        let store = Arc::new(AlwaysConflicting {
            inner,
            saves: AtomicU32::new(0),
        });
        let writer = IntentWriter::new(store.clone(), 3);

        let err = writer.update(id, |_| Ok(((), true))).await.unwrap_err();

        assert_eq!(err, RegistrationError::VersionConflict(id));
        assert_eq!(store.saves.load(Ordering::SeqCst), 4);
    }
}
