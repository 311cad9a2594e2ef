//! In-process storage adapters.

mod in_memory_intent_store;

pub use in_memory_intent_store::InMemoryIntentStore;
