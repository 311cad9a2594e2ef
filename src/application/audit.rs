//! Publishing of registration events.

use crate::domain::foundation::SerializableDomainEvent;
use crate::domain::registration::RegistrationEvent;
use crate::ports::EventPublisher;

/// Publishes `events` in order.
///
/// Events are published after the state they describe is saved. A publish
/// failure is logged and does not undo or fail the operation.
pub(crate) async fn publish_events(publisher: &dyn EventPublisher, events: Vec<RegistrationEvent>) {
    if events.is_empty() {
        return;
    }
    let envelopes = events.iter().map(|e| e.to_envelope()).collect();
    if let Err(e) = publisher.publish_all(envelopes).await {
        tracing::error!(error = %e, "Failed to publish registration events");
    }
}
