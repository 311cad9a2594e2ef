//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers write through [`IntentWriter`]; query handlers only read.

pub(crate) mod audit;
pub mod handlers;
mod intent_writer;
mod orchestrator;
mod payment_adapter;
mod reconciliation;
mod services;
mod settings;
mod view;

pub use handlers::*;
pub use intent_writer::IntentWriter;
pub use orchestrator::{RecoveryHint, RegistrationForm, RegistrationOrchestrator, SagaSession};
pub use payment_adapter::PaymentProviderAdapter;
pub use reconciliation::{ReconcileConfig, ReconcileOutcome, ReconciliationLoop};
pub use services::{SagaPorts, SagaServices};
pub use settings::SagaSettings;
pub use view::IntentView;
