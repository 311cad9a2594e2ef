//! Client-side saga controller states.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Where a registration session currently is in the saga.
///
/// Unlike [`super::IntentStatus`] this is not persisted server side; it
/// lives in the caller's [`SagaSession`](crate::application::SagaSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaState {
    #[default]
    Idle,
    Creating,
    AwaitingPayment,
    Reconciling,
    Finalizing,
    Done,
    Error,
}

impl StateMachine for SagaState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SagaState::*;
        matches!(
            (self, target),
            (Idle, Creating)
                | (Creating, AwaitingPayment)
                | (Creating, Finalizing)
                | (Creating, Done)
                | (AwaitingPayment, AwaitingPayment)
                | (AwaitingPayment, Reconciling)
                | (AwaitingPayment, Finalizing)
                | (Reconciling, AwaitingPayment)
                | (Reconciling, Finalizing)
                | (Finalizing, Done)
                | (Error, Idle)
        ) || (*target == Error && !matches!(self, Done | Error))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SagaState::*;
        match self {
            Idle => vec![Creating, Error],
            Creating => vec![AwaitingPayment, Finalizing, Done, Error],
            AwaitingPayment => vec![AwaitingPayment, Reconciling, Finalizing, Error],
            Reconciling => vec![AwaitingPayment, Finalizing, Error],
            Finalizing => vec![Done, Error],
            Error => vec![Idle],
            Done => vec![],
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, SagaState::Done)
    }
}
