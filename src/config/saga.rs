//! Saga timing configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct SagaConfig {
    /// Seconds an unpaid intent stays resumable
    #[serde(default = "default_intent_ttl")]
    pub intent_ttl_secs: u64,

    /// Seconds between reconciliation polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Seconds the reconciliation loop waits for an outcome
    #[serde(default = "default_reconcile_timeout")]
    pub reconcile_timeout_secs: u64,

    /// Reload-and-retry budget on concurrent modification
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,

    /// Seconds a callback waits for its payment attempt to be recorded
    #[serde(default = "default_callback_grace")]
    pub callback_grace_secs: u64,
}

impl SagaConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }

    pub fn callback_grace(&self) -> Duration {
        Duration::from_secs(self.callback_grace_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.intent_ttl_secs == 0 {
            return Err(ValidationError::InvalidSagaTiming("intent_ttl_secs must be positive"));
        }
        if self.poll_interval_secs == 0 {
            return Err(ValidationError::InvalidSagaTiming(
                "poll_interval_secs must be positive",
            ));
        }
        if self.reconcile_timeout_secs < self.poll_interval_secs {
            return Err(ValidationError::InvalidSagaTiming(
                "reconcile_timeout_secs must cover at least one poll",
            ));
        }
        Ok(())
    }
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            intent_ttl_secs: default_intent_ttl(),
            poll_interval_secs: default_poll_interval(),
            reconcile_timeout_secs: default_reconcile_timeout(),
            max_conflict_retries: default_max_conflict_retries(),
            callback_grace_secs: default_callback_grace(),
        }
    }
}

fn default_intent_ttl() -> u64 {
    72 * 3600
}

fn default_poll_interval() -> u64 {
    5
}

fn default_reconcile_timeout() -> u64 {
    120
}

fn default_max_conflict_retries() -> u32 {
    3
}

fn default_callback_grace() -> u64 {
    5
}
