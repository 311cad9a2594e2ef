//! Payment provider adapters.
//!
//! - `HttpPushProvider` - mobile push payments over the provider's REST API
//! - `HttpCheckoutProvider` - hosted checkout (redirect) payments
//! - `MockPushProvider` / `MockCheckoutProvider` - configurable test doubles
//!
//! # Security
//!
//! - Push callbacks carry `t=<unix>,v1=<hex>`: HMAC-SHA256 over `"{t}.{body}"`,
//!   rejected when older than 5 minutes
//! - Checkout callbacks carry a hex HMAC-SHA512 of the raw body
//! - Signatures are compared in constant time
//! - All secrets are held as `secrecy::SecretString`

mod checkout_client;
mod mock_providers;
mod push_client;
mod response;
mod signature;

pub use checkout_client::{CheckoutConfig, HttpCheckoutProvider};
pub use mock_providers::{MethodCall, MockCheckoutProvider, MockPushProvider};
pub use push_client::{HttpPushProvider, PushConfig};
pub use signature::{
    sign_checkout_payload, sign_push_payload, PushSignatureHeader, SignatureParseError,
};
