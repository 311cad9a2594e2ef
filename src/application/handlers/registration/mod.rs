//! Registration handlers.
//!
//! ## Commands
//! - Creating (or recovering) an intent
//! - Starting a payment with the chosen provider
//! - Confirming a hosted checkout return
//! - Manual status checks and provider callbacks
//! - Finalizing a paid registration
//!
//! ## Queries
//! - Intent status

mod check_payment_status;
mod confirm_payment;
mod create_intent;
mod finalize_registration;
mod get_status;
mod handle_provider_callback;
mod initiate_payment;
mod record_outcome;

// Commands
pub use check_payment_status::{
    CheckPaymentStatusCommand, CheckPaymentStatusHandler, CheckPaymentStatusResult,
};
pub use confirm_payment::{ConfirmPaymentCommand, ConfirmPaymentHandler, ConfirmPaymentResult};
pub use create_intent::{CreateIntentCommand, CreateIntentHandler, CreateIntentResult};
pub use finalize_registration::{
    FinalizeLocks, FinalizeRegistrationCommand, FinalizeRegistrationHandler,
    FinalizeRegistrationResult,
};
pub use handle_provider_callback::{
    CallbackDisposition, ProviderCallbackCommand, ProviderCallbackHandler,
};
pub use initiate_payment::{InitiatePaymentCommand, InitiatePaymentHandler, InitiatePaymentResult};
pub use record_outcome::OutcomeRecorder;

// Queries
pub use get_status::{GetStatusHandler, GetStatusQuery};
