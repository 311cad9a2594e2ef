//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the saga to external systems:
//! - `storage` / `postgres` - Intent stores (in-memory, PostgreSQL)
//! - `challenge_store` - Resume challenges (in-memory, Redis)
//! - `payments` - Push and hosted checkout providers, plus mocks
//! - `accounts` - Downstream account provisioning
//! - `email` - One-time code delivery
//! - `auth` - Resume token signing
//! - `events` - Event publishers
//! - `http` - REST API

pub mod accounts;
pub mod auth;
pub mod challenge_store;
pub mod email;
pub mod events;
pub mod http;
pub mod payments;
pub mod postgres;
pub mod storage;

pub use accounts::{AccountsConfig, HttpAccountProvisioner, InMemoryAccountProvisioner};
pub use auth::JwtResumeTokens;
pub use challenge_store::{InMemoryChallengeStore, RedisChallengeStore};
pub use email::{RecordingCodeSender, ResendCodeSender, ResendConfig};
pub use events::{InMemoryEventBus, TracingEventPublisher};
pub use payments::{
    CheckoutConfig, HttpCheckoutProvider, HttpPushProvider, MockCheckoutProvider,
    MockPushProvider, PushConfig,
};
pub use postgres::PostgresIntentStore;
pub use storage::InMemoryIntentStore;
