//! Email adapters for one-time code delivery.
//!
//! - `ResendCodeSender` - Resend HTTP API
//! - `RecordingCodeSender` - Captures codes in memory for tests and local runs

mod recording;
mod resend;

pub use recording::{RecordingCodeSender, SentCode};
pub use resend::{ResendCodeSender, ResendConfig};
