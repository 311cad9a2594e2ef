//! Resume handlers.
//!
//! Cross-device recovery: an emailed one-time code is exchanged for a
//! short-lived resume token, which grants access to one pending intent.

mod authorize;
mod continue_payment;
mod fetch_pending;
mod request_code;
mod verify_code;

pub use authorize::ResumeAuthorizer;
pub use continue_payment::{ContinuePaymentCommand, ContinuePaymentHandler};
pub use fetch_pending::{FetchPendingHandler, FetchPendingQuery, PendingRegistration};
pub use request_code::{RequestCodeCommand, RequestCodeHandler, RequestCodeResult};
pub use verify_code::{VerifyCodeCommand, VerifyCodeHandler, VerifyCodeResult};
