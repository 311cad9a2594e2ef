//! In-memory challenge store for tests and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, EmailAddress, Timestamp};
use crate::domain::resume::ResumeChallenge;
use crate::ports::ChallengeStore;

#[derive(Debug, Clone, Default)]
pub struct InMemoryChallengeStore {
    entries: Arc<RwLock<HashMap<EmailAddress, (ResumeChallenge, Timestamp)>>>,
}

impl InMemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored challenges, for assertions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ChallengeStore for InMemoryChallengeStore {
    async fn get(&self, email: &EmailAddress) -> Result<Option<ResumeChallenge>, DomainError> {
        let now = Timestamp::now();
        let mut entries = self.entries.write().await;
        let expired = entries
            .get(email)
            .map(|(_, evict_at)| now.is_after(evict_at));

        match expired {
            Some(true) => {
                entries.remove(email);
                Ok(None)
            }
            Some(false) => Ok(entries.get(email).map(|(challenge, _)| challenge.clone())),
            None => Ok(None),
        }
    }

    async fn put(&self, challenge: &ResumeChallenge, ttl_secs: u64) -> Result<(), DomainError> {
        let evict_at = Timestamp::now().plus_secs(ttl_secs);
        self.entries
            .write()
            .await
            .insert(challenge.email.clone(), (challenge.clone(), evict_at));
        Ok(())
    }

    async fn replace(
        &self,
        expected: &ResumeChallenge,
        next: &ResumeChallenge,
        ttl_secs: u64,
    ) -> Result<bool, DomainError> {
        let now = Timestamp::now();
        let mut entries = self.entries.write().await;
        let current = entries.get(&expected.email).filter(|(stored, evict_at)| {
            !now.is_after(evict_at)
                && stored.id == expected.id
                && stored.revision == expected.revision
        });
        if current.is_none() {
            return Ok(false);
        }
        entries.insert(next.email.clone(), (next.clone(), now.plus_secs(ttl_secs)));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::IntentId;
    use crate::domain::resume::{OneTimeCode, ResumePolicy};

    fn challenge(email: &str) -> ResumeChallenge {
        ResumeChallenge::issue(
            EmailAddress::parse(email).unwrap(),
            Some(IntentId::new(1).unwrap()),
            &OneTimeCode::from_digits("123456"),
            &ResumePolicy::default(),
            Timestamp::now(),
        )
    }

    #[tokio::test]
    async fn put_replaces_previous_challenge() {
        let store = InMemoryChallengeStore::new();
        let first = challenge("a@b.co");
        let second = challenge("a@b.co");

        store.put(&first, 60).await.unwrap();
        store.put(&second, 60).await.unwrap();

        let found = store.get(&first.email).await.unwrap().unwrap();
        assert_eq!(found.id, second.id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn replace_requires_the_expected_revision() {
        let store = InMemoryChallengeStore::new();
        let original = challenge("a@b.co");
        store.put(&original, 60).await.unwrap();

        let mut first = original.clone();
        first.revision += 1;
        let mut second = original.clone();
        second.revision += 1;
        second.failed_attempts = 1;

        assert!(store.replace(&original, &first, 60).await.unwrap());
        assert!(!store.replace(&original, &second, 60).await.unwrap());
        assert_eq!(store.get(&original.email).await.unwrap().unwrap(), first);
    }

    #[tokio::test]
    async fn replace_fails_once_a_new_challenge_was_issued() {
        let store = InMemoryChallengeStore::new();
        let old = challenge("a@b.co");
        let fresh = challenge("a@b.co");
        store.put(&old, 60).await.unwrap();
        store.put(&fresh, 60).await.unwrap();

        let mut consumed = old.clone();
        consumed.revision += 1;

        assert!(!store.replace(&old, &consumed, 60).await.unwrap());
        assert_eq!(store.get(&old.email).await.unwrap().unwrap().id, fresh.id);
    }

    #[tokio::test]
    async fn expired_entries_are_evicted() {
        let store = InMemoryChallengeStore::new();
        let c = challenge("a@b.co");
        store.put(&c, 0).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        assert!(store.get(&c.email).await.unwrap().is_none());
    }
}
