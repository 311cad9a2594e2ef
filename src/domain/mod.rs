//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, events)
//! - `registration` - Registration intents, payment attempts, saga states
//! - `resume` - One-time code challenges for cross-device resume

pub mod foundation;
pub mod registration;
pub mod resume;
