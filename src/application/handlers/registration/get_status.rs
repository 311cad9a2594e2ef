//! GetStatusHandler - Query handler for the current state of an intent.

use std::sync::Arc;

use crate::application::IntentView;
use crate::domain::foundation::IntentId;
use crate::domain::registration::RegistrationError;
use crate::ports::IntentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetStatusQuery {
    pub intent_id: IntentId,
}

/// Read-only: never changes the intent.
pub struct GetStatusHandler {
    store: Arc<dyn IntentStore>,
}

impl GetStatusHandler {
    pub fn new(store: Arc<dyn IntentStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: GetStatusQuery) -> Result<IntentView, RegistrationError> {
        let intent = self
            .store
            .find(query.intent_id)
            .await?
            .ok_or(RegistrationError::NotFound(query.intent_id))?;
        Ok(IntentView::from(&intent))
    }
}
