//! Resume module - Cross-device recovery of a pending registration.
//!
//! A resume challenge binds a hashed one-time code to an email. Verifying
//! the code yields a short-lived resume token that grants read access to
//! exactly one pending intent.

mod challenge;
mod code;

pub use challenge::{ResumeChallenge, ResumePolicy, VerifyOutcome};
pub use code::{code_matches, hash_code, OneTimeCode, CODE_LENGTH};
