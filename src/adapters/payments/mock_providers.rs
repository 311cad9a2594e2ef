//! Mock payment providers for testing.
//!
//! Both mocks support:
//! - Pre-configured outcomes per provider reference
//! - Error injection (next call, or per method)
//! - Call tracking
//! - Callback simulation: the payload is a JSON `CallbackEvent`, and the
//!   signature is accepted unless the mock was built with `rejecting_callbacks`

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::registration::ProviderOutcome;
use crate::ports::{
    CallbackEvent, CheckoutRequest, CheckoutSession, PaymentError, PushAck, PushPaymentProvider,
    PushRequest, RedirectCheckoutProvider,
};

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

#[derive(Default)]
struct MockState {
    /// Reported outcome per provider reference; unknown references are pending.
    outcomes: HashMap<String, ProviderOutcome>,

    /// Error to return on the next call of any method.
    next_error: Option<PaymentError>,

    /// Errors by method name, returned on every call until cleared.
    method_errors: HashMap<String, PaymentError>,

    call_log: Vec<MethodCall>,

    reject_callbacks: bool,

    sequence: u64,

    /// Push only: acknowledge without a correlation id.
    omit_correlation_id: bool,

    /// Push only: acknowledge success with a whitespace correlation id.
    blank_correlation_id: bool,

    /// Delay before initiation calls answer.
    latency: Option<Duration>,
}

impl MockState {
    fn record(&mut self, method: &str, args: Vec<String>) -> Result<(), PaymentError> {
        self.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
        if let Some(err) = self.next_error.take() {
            return Err(err);
        }
        if let Some(err) = self.method_errors.get(method) {
            return Err(err.clone());
        }
        Ok(())
    }

    fn outcome(&self, reference: &str) -> ProviderOutcome {
        self.outcomes
            .get(reference)
            .cloned()
            .unwrap_or(ProviderOutcome::Pending)
    }

    fn parse_callback(&self, payload: &[u8]) -> Result<CallbackEvent, PaymentError> {
        if self.reject_callbacks {
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }
        serde_json::from_slice(payload)
            .map_err(|e| PaymentError::invalid_webhook(format!("Invalid JSON: {}", e)))
    }
}

/// Shared configuration surface of both mocks.
#[derive(Default, Clone)]
struct MockCore {
    inner: Arc<Mutex<MockState>>,
}

impl MockCore {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn simulate_latency(&self) {
        let latency = self.state().latency;
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
    }
}

macro_rules! mock_configuration {
    ($mock:ty) => {
        impl $mock {
            pub fn new() -> Self {
                Self::default()
            }

            /// A mock whose callback verification always fails.
            pub fn rejecting_callbacks() -> Self {
                let mock = Self::new();
                mock.core.state().reject_callbacks = true;
                mock
            }

            /// Sets what the provider reports for `reference`.
            pub fn set_outcome(&self, reference: impl Into<String>, outcome: ProviderOutcome) {
                self.core.state().outcomes.insert(reference.into(), outcome);
            }

            /// Fails the next call of any method.
            pub fn fail_next(&self, error: PaymentError) {
                self.core.state().next_error = Some(error);
            }

            /// Fails every call of `method` until cleared.
            pub fn fail_method(&self, method: &str, error: PaymentError) {
                self.core
                    .state()
                    .method_errors
                    .insert(method.to_string(), error);
            }

            /// Makes initiation calls take `delay` before answering.
            pub fn set_latency(&self, delay: Duration) {
                self.core.state().latency = Some(delay);
            }

            pub fn clear_errors(&self) {
                let mut state = self.core.state();
                state.next_error = None;
                state.method_errors.clear();
            }

            pub fn calls(&self) -> Vec<MethodCall> {
                self.core.state().call_log.clone()
            }

            pub fn call_count(&self, method: &str) -> usize {
                self.core
                    .state()
                    .call_log
                    .iter()
                    .filter(|c| c.method == method)
                    .count()
            }

            /// Builds a callback payload the mock will accept.
            pub fn callback_payload(reference: &str, outcome: ProviderOutcome) -> Vec<u8> {
                serde_json::to_vec(&CallbackEvent {
                    provider_reference: reference.to_string(),
                    outcome,
                })
                .unwrap_or_default()
            }
        }
    };
}

/// Mock push provider.
///
/// # Example
///
/// ```ignore
/// let push = MockPushProvider::new();
/// let ack = push.request_push(request).await?;      // "ws_CO_1"
/// push.set_outcome("ws_CO_1", ProviderOutcome::Succeeded);
/// ```
#[derive(Default, Clone)]
pub struct MockPushProvider {
    core: MockCore,
}

mock_configuration!(MockPushProvider);

impl MockPushProvider {
    /// A mock that acknowledges pushes without a correlation id.
    pub fn without_correlation_id() -> Self {
        let mock = Self::new();
        mock.core.state().omit_correlation_id = true;
        mock
    }

    /// A mock that accepts pushes but hands back a blank correlation id.
    pub fn with_blank_correlation_id() -> Self {
        let mock = Self::new();
        mock.core.state().blank_correlation_id = true;
        mock
    }

    /// Correlation id the next successful push will return.
    pub fn next_reference(&self) -> String {
        format!("ws_CO_{}", self.core.state().sequence + 1)
    }
}

#[async_trait]
impl PushPaymentProvider for MockPushProvider {
    async fn request_push(&self, request: PushRequest) -> Result<PushAck, PaymentError> {
        self.core.simulate_latency().await;
        let mut state = self.core.state();
        state.record(
            "request_push",
            vec![request.intent_id.to_string(), request.phone_number.clone()],
        )?;

        if state.omit_correlation_id {
            return Ok(PushAck {
                checkout_request_id: None,
                response_code: Some("1".to_string()),
                customer_message: Some("Unable to process request".to_string()),
            });
        }

        if state.blank_correlation_id {
            return Ok(PushAck {
                checkout_request_id: Some("  ".to_string()),
                response_code: Some("0".to_string()),
                customer_message: None,
            });
        }

        state.sequence += 1;
        Ok(PushAck {
            checkout_request_id: Some(format!("ws_CO_{}", state.sequence)),
            response_code: Some("0".to_string()),
            customer_message: Some("Success. Request accepted for processing".to_string()),
        })
    }

    async fn query_push(&self, checkout_request_id: &str) -> Result<ProviderOutcome, PaymentError> {
        let mut state = self.core.state();
        state.record("query_push", vec![checkout_request_id.to_string()])?;
        Ok(state.outcome(checkout_request_id))
    }

    async fn verify_callback(
        &self,
        payload: &[u8],
        _signature: &str,
    ) -> Result<CallbackEvent, PaymentError> {
        let mut state = self.core.state();
        state.record("verify_callback", vec![])?;
        state.parse_callback(payload)
    }
}

/// Mock hosted checkout provider.
///
/// Checkout sessions echo the requested reference and point at
/// `https://checkout.test/{reference}`.
#[derive(Default, Clone)]
pub struct MockCheckoutProvider {
    core: MockCore,
}

mock_configuration!(MockCheckoutProvider);

impl MockCheckoutProvider {
    /// Reference of the most recent checkout, if any.
    pub fn last_reference(&self) -> Option<String> {
        self.core
            .state()
            .call_log
            .iter()
            .rev()
            .find(|c| c.method == "initialize_checkout")
            .and_then(|c| c.args.get(1).cloned())
    }
}

#[async_trait]
impl RedirectCheckoutProvider for MockCheckoutProvider {
    async fn initialize_checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.core.simulate_latency().await;
        let mut state = self.core.state();
        state.record(
            "initialize_checkout",
            vec![request.intent_id.to_string(), request.reference.clone()],
        )?;
        state.sequence += 1;
        Ok(CheckoutSession {
            authorization_url: format!("https://checkout.test/{}", request.reference),
            reference: request.reference,
        })
    }

    async fn verify_transaction(&self, reference: &str) -> Result<ProviderOutcome, PaymentError> {
        let mut state = self.core.state();
        state.record("verify_transaction", vec![reference.to_string()])?;
        Ok(state.outcome(reference))
    }

    async fn verify_callback(
        &self,
        payload: &[u8],
        _signature: &str,
    ) -> Result<CallbackEvent, PaymentError> {
        let mut state = self.core.state();
        state.record("verify_callback", vec![])?;
        state.parse_callback(payload)
    }
}
