//! Registration intent status state machine.
//!
//! Status only moves forward:
//! `CREATED -> PAYMENT_REQUIRED -> PAID -> COMPLETED`, with `FAILED`
//! reachable from any non-terminal state.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Persisted lifecycle status of a registration intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    /// Payload accepted, no payment initiated yet.
    Created,

    /// At least one payment initiation has been attempted.
    PaymentRequired,

    /// Exactly one attempt succeeded. Ready to finalize.
    Paid,

    /// Downstream account provisioned. Terminal.
    Completed,

    /// Abandoned (expired or attempts exhausted). Terminal.
    Failed,
}

impl IntentStatus {
    /// Position along the happy path. `Failed` sorts after everything.
    pub fn rank(&self) -> u8 {
        match self {
            IntentStatus::Created => 0,
            IntentStatus::PaymentRequired => 1,
            IntentStatus::Paid => 2,
            IntentStatus::Completed => 3,
            IntentStatus::Failed => 4,
        }
    }

    /// The action a client must take next.
    pub fn next_action(&self) -> NextAction {
        match self {
            IntentStatus::Created | IntentStatus::PaymentRequired => NextAction::PaymentRequired,
            _ => NextAction::None,
        }
    }

    /// True while a payment can still be initiated.
    pub fn accepts_payment(&self) -> bool {
        matches!(self, IntentStatus::Created | IntentStatus::PaymentRequired)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Created => "CREATED",
            IntentStatus::PaymentRequired => "PAYMENT_REQUIRED",
            IntentStatus::Paid => "PAID",
            IntentStatus::Completed => "COMPLETED",
            IntentStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(IntentStatus::Created),
            "PAYMENT_REQUIRED" => Ok(IntentStatus::PaymentRequired),
            "PAID" => Ok(IntentStatus::Paid),
            "COMPLETED" => Ok(IntentStatus::Completed),
            "FAILED" => Ok(IntentStatus::Failed),
            other => Err(format!("Invalid intent status: {}", other)),
        }
    }
}

impl StateMachine for IntentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use IntentStatus::*;
        matches!(
            (self, target),
            (Created, PaymentRequired)
                | (Created, Failed)
                | (PaymentRequired, Paid)
                | (PaymentRequired, Failed)
                | (Paid, Completed)
                | (Paid, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use IntentStatus::*;
        match self {
            Created => vec![PaymentRequired, Failed],
            PaymentRequired => vec![Paid, Failed],
            Paid => vec![Completed, Failed],
            Completed | Failed => vec![],
        }
    }
}

/// Client-facing hint derived from [`IntentStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextAction {
    PaymentRequired,
    None,
}
