//! Client-facing view of a registration intent.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{IntentId, Money, Timestamp};
use crate::domain::registration::{IntentStatus, NextAction, RegistrationIntent};
use crate::ports::{AttemptStatusView, IntentStatusView};

/// What a client may see of an intent. The form payload stays server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentView {
    pub intent_id: IntentId,
    pub status: IntentStatus,
    pub next_action: NextAction,
    pub fee: Money,
    pub failure_reason: Option<String>,
    pub attempts: Vec<AttemptStatusView>,
    pub account_id: Option<String>,
    pub expires_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&RegistrationIntent> for IntentView {
    fn from(intent: &RegistrationIntent) -> Self {
        let status = IntentStatusView::from_intent(intent);
        Self {
            intent_id: intent.id,
            status: intent.status,
            next_action: intent.next_action(),
            fee: intent.fee.clone(),
            failure_reason: intent.failure_reason.clone(),
            attempts: status.attempts,
            account_id: intent.account.as_ref().map(|a| a.account_id.clone()),
            expires_at: intent.expires_at,
            updated_at: intent.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registration::test_support;

    #[test]
    fn view_hides_payload() {
        let intent = test_support::intent(3);
        let json = serde_json::to_value(IntentView::from(&intent)).unwrap();

        assert_eq!(json["intent_id"], 3);
        assert_eq!(json["status"], "CREATED");
        assert_eq!(json["next_action"], "PAYMENT_REQUIRED");
        assert!(json.get("payload").is_none());
        assert!(json.to_string().find("reader@example.com").is_none());
    }
}
