//! Registration module - Registration intents and their payments.
//!
//! # Key Concepts
//!
//! - **Registration Intent**: Durable record of a pending registration
//! - **Payment Attempt**: One initiation against a payment provider
//! - **Saga State**: Where a client session is in the create/pay/finalize flow

mod errors;
mod events;
mod intent;
mod payload;
mod payment;
mod saga_state;
mod status;

pub use errors::RegistrationError;
pub use events::RegistrationEvent;
pub use intent::{AccountRef, AttemptResolution, NewIntent, PaymentPolicy, RegistrationIntent};
pub use payload::{normalize_phone, RegistrationPayload};
pub use payment::{
    AttemptOutcome, PaymentAttempt, PaymentInitiation, PaymentMode, ProviderKind,
    ProviderOutcome, ProviderParams,
};
pub use saga_state::SagaState;
pub use status::{IntentStatus, NextAction};

#[cfg(test)]
pub(crate) use intent::test_support;
