//! Account provisioning adapters.
//!
//! - `HttpAccountProvisioner` - downstream account API with idempotency keys
//! - `InMemoryAccountProvisioner` - deterministic accounts for tests

mod http;
mod in_memory;

pub use self::http::{AccountsConfig, HttpAccountProvisioner};
pub use self::in_memory::InMemoryAccountProvisioner;
