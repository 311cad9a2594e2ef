//! Authentication adapters.
//!
//! - `JwtResumeTokens` - HS256 bearer tokens proving a verified resume code

mod jwt_resume_tokens;

pub use jwt_resume_tokens::JwtResumeTokens;
