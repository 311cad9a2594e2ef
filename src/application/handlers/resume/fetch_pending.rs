//! FetchPendingHandler - Loads the pending registration behind a resume token.

use crate::application::IntentView;
use crate::domain::registration::RegistrationError;

use super::ResumeAuthorizer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPendingQuery {
    pub resume_token: String,
}

/// What a resumed client needs to pick up where it left off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRegistration {
    pub intent: IntentView,
    pub email: String,
    pub username: String,
    pub full_name: String,
}

pub struct FetchPendingHandler {
    authorizer: ResumeAuthorizer,
}

impl FetchPendingHandler {
    pub fn new(authorizer: ResumeAuthorizer) -> Self {
        Self { authorizer }
    }

    pub async fn handle(&self, query: FetchPendingQuery) -> Result<PendingRegistration, RegistrationError> {
        let intent = self.authorizer.authorize(&query.resume_token).await?;

        Ok(PendingRegistration {
            intent: IntentView::from(&intent),
            email: intent.payload.email.to_string(),
            username: intent.payload.username.clone(),
            full_name: intent.payload.full_name.clone(),
        })
    }
}
