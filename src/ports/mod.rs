//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the saga and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `IntentStore` - Registration intents and payment attempts
//! - `ChallengeStore` - Short-lived resume challenges
//!
//! ## Payment Ports
//!
//! - `PushPaymentProvider` - Mobile push payments
//! - `RedirectCheckoutProvider` - Hosted checkout payments
//!
//! ## Collaborator Ports
//!
//! - `AccountProvisioner` - Downstream account creation
//! - `CodeSender` - One-time code delivery
//! - `ResumeTokens` - Resume token signing
//! - `EventPublisher` - Audit events

mod account_provisioner;
mod challenge_store;
mod code_sender;
mod event_publisher;
mod intent_store;
mod payment_provider;
mod resume_tokens;

pub use account_provisioner::{AccountProvisioner, ProvisionRequest, ProvisionedAccount};
pub use challenge_store::ChallengeStore;
pub use code_sender::CodeSender;
pub use event_publisher::EventPublisher;
pub use intent_store::{AttemptStatusView, IntentStatusView, IntentStore};
pub use payment_provider::{
    CallbackEvent, CheckoutRequest, CheckoutSession, PaymentError, PaymentErrorCode,
    PushAck, PushPaymentProvider, PushRequest, RedirectCheckoutProvider,
};
pub use resume_tokens::{ResumeClaims, ResumeTokens};
