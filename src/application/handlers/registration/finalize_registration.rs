//! FinalizeRegistrationHandler - Completes a paid intent and provisions its account.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::application::audit::publish_events;
use crate::application::IntentWriter;
use crate::domain::foundation::{IntentId, Timestamp};
use crate::domain::registration::{
    AccountRef, IntentStatus, RegistrationError, RegistrationEvent, RegistrationIntent,
};
use crate::ports::{AccountProvisioner, EventPublisher, ProvisionRequest};

/// Per-intent async locks serializing finalization within this process.
#[derive(Default)]
pub struct FinalizeLocks {
    locks: Mutex<HashMap<IntentId, Arc<tokio::sync::Mutex<()>>>>,
}

impl FinalizeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, id: IntentId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.entry(id).or_default().clone()
    }

    /// Drops the entry for `id` once nobody else holds or waits on it.
    fn release(&self, id: IntentId) {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(lock) = locks.get(&id) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(&id);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeRegistrationCommand {
    pub intent_id: IntentId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeRegistrationResult {
    pub intent_id: IntentId,
    pub account_id: String,
    /// False if the intent was already completed by an earlier call.
    pub newly_completed: bool,
}

pub struct FinalizeRegistrationHandler {
    writer: IntentWriter,
    accounts: Arc<dyn AccountProvisioner>,
    event_publisher: Arc<dyn EventPublisher>,
    locks: Arc<FinalizeLocks>,
}

impl FinalizeRegistrationHandler {
    pub fn new(
        writer: IntentWriter,
        accounts: Arc<dyn AccountProvisioner>,
        event_publisher: Arc<dyn EventPublisher>,
        locks: Arc<FinalizeLocks>,
    ) -> Self {
        Self {
            writer,
            accounts,
            event_publisher,
            locks,
        }
    }

    pub async fn handle(
        &self,
        cmd: FinalizeRegistrationCommand,
    ) -> Result<FinalizeRegistrationResult, RegistrationError> {
        let lock = self.locks.lock_for(cmd.intent_id);
        let result = {
            let _guard = lock.lock().await;
            self.finalize(cmd.intent_id).await
        };
        drop(lock);
        self.locks.release(cmd.intent_id);
        result
    }

    async fn finalize(
        &self,
        intent_id: IntentId,
    ) -> Result<FinalizeRegistrationResult, RegistrationError> {
        let intent = self.writer.load(intent_id).await?;

        if let Some(account) = &intent.account {
            return Ok(FinalizeRegistrationResult {
                intent_id,
                account_id: account.account_id.clone(),
                newly_completed: false,
            });
        }
        if !matches!(intent.status, IntentStatus::Paid | IntentStatus::Completed) {
            return Err(RegistrationError::conflict(intent.status.as_str(), "finalize"));
        }

        // 1. PAID -> COMPLETED
        let now = Timestamp::now();
        let (intent, newly_completed) = self
            .writer
            .update(intent_id, |intent| {
                let changed = intent.complete(now)?;
                Ok((changed, changed))
            })
            .await?;

        // 2. Provision, keyed by the intent
        let account = self.provision(&intent).await?;

        // 3. Record the account
        let provisioned_at = Timestamp::now();
        let account_id = account.account_id.clone();
        let (intent, account_recorded) = self
            .writer
            .update(intent_id, |intent| match &intent.account {
                Some(_) => Ok((false, false)),
                None => {
                    intent.record_account(AccountRef {
                        account_id: account_id.clone(),
                        provisioned_at,
                    })?;
                    Ok((true, true))
                }
            })
            .await?;

        let account_id = intent
            .account
            .as_ref()
            .map(|a| a.account_id.clone())
            .unwrap_or(account.account_id);

        tracing::info!(
            intent_id = %intent_id,
            account_id = %account_id,
            newly_completed,
            "Registration finalized"
        );

        if newly_completed || account_recorded {
            publish_events(
                self.event_publisher.as_ref(),
                vec![RegistrationEvent::IntentCompleted {
                    intent_id,
                    account_id: account_id.clone(),
                    occurred_at: provisioned_at,
                }],
            )
            .await;
        }

        Ok(FinalizeRegistrationResult {
            intent_id,
            account_id,
            newly_completed,
        })
    }

    async fn provision(
        &self,
        intent: &RegistrationIntent,
    ) -> Result<crate::ports::ProvisionedAccount, RegistrationError> {
        self.accounts
            .provision(ProvisionRequest::for_intent(intent.id, intent.payload.clone()))
            .await
            .map_err(|e| {
                tracing::error!(
                    intent_id = %intent.id,
                    error = %e,
                    "Account provisioning failed, intent stays completed without account"
                );
                RegistrationError::infrastructure(format!("Account provisioning failed: {}", e))
            })
    }
}
