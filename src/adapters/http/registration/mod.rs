//! HTTP adapter for registration endpoints.
//!
//! - `POST /api/registrations` - Create (or recover) an intent
//! - `GET /api/registrations/{id}` - Fetch status
//! - `POST /api/registrations/{id}/payments` - Initiate a payment
//! - `POST /api/registrations/{id}/payments/confirm` - Confirm a redirect
//! - `POST /api/registrations/{id}/payments/check` - Manual status check
//! - `POST /api/registrations/{id}/reconcile` - Run the reconciliation loop
//! - `POST /api/registrations/{id}/complete` - Finalize

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use routes::registration_routes;
