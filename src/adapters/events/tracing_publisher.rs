//! Event publisher that writes envelopes to the structured log.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventPublisher;

/// Emits each envelope as an `info` record under the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        tracing::info!(
            target: "audit",
            event_id = %event.event_id,
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            occurred_at = %event.occurred_at.as_datetime(),
            payload = %event.payload,
            "domain event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{IntentId, SerializableDomainEvent, Timestamp};
    use crate::domain::registration::RegistrationEvent;

    #[tokio::test]
    async fn publish_never_fails() {
        let event = RegistrationEvent::ResumeTokenIssued {
            intent_id: IntentId::new(1).unwrap(),
            occurred_at: Timestamp::now(),
        };
        assert!(TracingEventPublisher::new()
            .publish(event.to_envelope())
            .await
            .is_ok());
    }
}
