//! HTTP adapter for cross-device resume.
//!
//! - `POST /api/resume/code` - Request a one-time code
//! - `POST /api/resume/verify` - Verify it for a resume token
//! - `GET /api/resume/pending` - Fetch the pending registration
//! - `POST /api/resume/payments` - Continue payment

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use routes::resume_routes;
