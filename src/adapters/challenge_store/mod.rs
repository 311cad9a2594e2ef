//! Resume challenge storage adapters.
//!
//! - `RedisChallengeStore` - Production store; records expire via `SET EX`
//! - `InMemoryChallengeStore` - Tests and single-process development

mod in_memory;
mod redis;

pub use self::in_memory::InMemoryChallengeStore;
pub use self::redis::RedisChallengeStore;
