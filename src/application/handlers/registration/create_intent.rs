//! CreateIntentHandler - Command handler for starting (or recovering) a registration.

use std::sync::Arc;

use crate::application::audit::publish_events;
use crate::application::IntentView;
use crate::domain::foundation::{IntentId, Money, Timestamp};
use crate::domain::registration::{
    IntentStatus, NewIntent, RegistrationError, RegistrationEvent, RegistrationIntent,
    RegistrationPayload,
};
use crate::ports::{EventPublisher, IntentStore};

/// Command to create a registration intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIntentCommand {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub institution: Option<String>,
    /// Intent id cached by the client from an earlier submission.
    pub intent_id_hint: Option<IntentId>,
}

/// Result of a create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIntentResult {
    pub intent: IntentView,
    /// True if an existing intent was returned instead of a new one.
    pub recovered: bool,
}

pub struct CreateIntentHandler {
    store: Arc<dyn IntentStore>,
    event_publisher: Arc<dyn EventPublisher>,
    fee: Money,
    intent_ttl_secs: u64,
}

impl CreateIntentHandler {
    pub fn new(
        store: Arc<dyn IntentStore>,
        event_publisher: Arc<dyn EventPublisher>,
        fee: Money,
        intent_ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            event_publisher,
            fee,
            intent_ttl_secs,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateIntentCommand,
    ) -> Result<CreateIntentResult, RegistrationError> {
        // 1. Validate the form before anything touches the store
        let payload = RegistrationPayload::new(
            &cmd.email,
            &cmd.username,
            &cmd.full_name,
            cmd.phone_number.as_deref(),
            cmd.institution.as_deref(),
        )?;

        // 2. A live hint re-attaches to the intent it names
        if let Some(hint) = cmd.intent_id_hint {
            if let Some(existing) = self.recoverable(hint, &payload).await? {
                tracing::info!(intent_id = %existing.id, "Recovered registration intent from hint");
                return Ok(CreateIntentResult {
                    intent: IntentView::from(&existing),
                    recovered: true,
                });
            }
        }

        // 3. Create exactly once
        let now = Timestamp::now();
        let intent = self
            .store
            .create(NewIntent::new(
                payload,
                self.fee.clone(),
                now,
                self.intent_ttl_secs,
            ))
            .await?;

        tracing::info!(intent_id = %intent.id, fee = %intent.fee, "Registration intent created");

        publish_events(
            self.event_publisher.as_ref(),
            vec![RegistrationEvent::IntentCreated {
                intent_id: intent.id,
                email: intent.payload.email.to_string(),
                occurred_at: now,
            }],
        )
        .await;

        Ok(CreateIntentResult {
            intent: IntentView::from(&intent),
            recovered: false,
        })
    }

    /// The hinted intent, unless it is unknown, failed, or someone else's.
    async fn recoverable(
        &self,
        hint: IntentId,
        payload: &RegistrationPayload,
    ) -> Result<Option<RegistrationIntent>, RegistrationError> {
        let Some(existing) = self.store.find(hint).await? else {
            tracing::debug!(intent_id = %hint, "Stale intent hint, creating a new intent");
            return Ok(None);
        };

        if existing.status == IntentStatus::Failed {
            return Ok(None);
        }
        if existing.payload.email != payload.email {
            tracing::warn!(intent_id = %hint, "Intent hint does not match the submitted email");
            return Ok(None);
        }
        Ok(Some(existing))
    }
}
