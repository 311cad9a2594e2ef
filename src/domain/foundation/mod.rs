//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types
//! that form the vocabulary of the registration domain.

mod email;
mod errors;
mod events;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use email::EmailAddress;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent};
pub use ids::{AttemptId, ChallengeId, IntentId};
pub use money::Money;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
