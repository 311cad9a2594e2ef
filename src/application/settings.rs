//! Tunables of the saga.

use std::time::Duration;

use crate::domain::foundation::Money;
use crate::domain::registration::PaymentPolicy;
use crate::domain::resume::ResumePolicy;

/// Runtime settings shared by all saga handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaSettings {
    /// Fee quoted to every new registration.
    pub registration_fee: Money,

    /// Seconds an unpaid intent stays resumable.
    pub intent_ttl_secs: u64,

    pub payment_policy: PaymentPolicy,

    pub resume_policy: ResumePolicy,

    /// Delay between two status reads of the reconciliation loop.
    pub poll_interval: Duration,

    /// How long the reconciliation loop waits for a terminal outcome.
    pub reconcile_timeout: Duration,

    /// Reload-and-retry budget for `VersionConflict` on save.
    pub max_conflict_retries: u32,

    /// How long a callback for an unknown reference waits for the attempt
    /// to be recorded before it is dropped.
    pub callback_grace: Duration,
}

impl SagaSettings {
    pub fn new(registration_fee: Money) -> Self {
        Self {
            registration_fee,
            intent_ttl_secs: 72 * 3600,
            payment_policy: PaymentPolicy::default(),
            resume_policy: ResumePolicy::default(),
            poll_interval: Duration::from_secs(5),
            reconcile_timeout: Duration::from_secs(120),
            max_conflict_retries: 3,
            callback_grace: Duration::from_secs(5),
        }
    }

    /// Seconds a client should wait before checking a pending payment again.
    pub fn retry_after_secs(&self) -> u64 {
        self.poll_interval.as_secs().max(1)
    }
}
