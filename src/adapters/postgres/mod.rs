//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresIntentStore` - Registration intents and their payment attempts

mod intent_store;

pub use intent_store::PostgresIntentStore;
