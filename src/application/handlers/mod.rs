//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod registration;
pub mod resume;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use registration::{
    CallbackDisposition, CheckPaymentStatusCommand, CheckPaymentStatusHandler,
    CheckPaymentStatusResult, ConfirmPaymentCommand, ConfirmPaymentHandler, ConfirmPaymentResult,
    CreateIntentCommand, CreateIntentHandler, CreateIntentResult, FinalizeLocks,
    FinalizeRegistrationCommand, FinalizeRegistrationHandler, FinalizeRegistrationResult,
    GetStatusHandler, GetStatusQuery, InitiatePaymentCommand, InitiatePaymentHandler,
    InitiatePaymentResult, OutcomeRecorder, ProviderCallbackCommand, ProviderCallbackHandler,
};
pub use resume::{
    ContinuePaymentCommand, ContinuePaymentHandler, FetchPendingHandler, FetchPendingQuery,
    PendingRegistration, RequestCodeCommand, RequestCodeHandler, RequestCodeResult,
    ResumeAuthorizer, VerifyCodeCommand, VerifyCodeHandler, VerifyCodeResult,
};
