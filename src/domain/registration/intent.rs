//! Registration intent aggregate.
//!
//! A registration intent is the durable record of one registration
//! attempt: the form snapshot, the quoted fee, every payment attempt made
//! against it, and the account it finally produced.
//!
//! # Invariants
//!
//! - Status transitions follow [`IntentStatus`] state machine rules
//! - At most one attempt has outcome `Success`
//! - An attempt reaching `Success` moves the intent to `Paid` in the same mutation
//! - Attempts are never modified after they resolve
//! - `account` is only set once the intent is `Completed`

use crate::domain::foundation::{IntentId, Money, StateMachine, Timestamp};
use serde::{Deserialize, Serialize};

use super::{
    AttemptOutcome, IntentStatus, NextAction, PaymentAttempt, ProviderOutcome,
    RegistrationError, RegistrationPayload,
};

/// Reference to the account provisioned for a completed intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub account_id: String,
    pub provisioned_at: Timestamp,
}

/// Limits on how often an intent may be charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentPolicy {
    /// Attempts allowed per intent before it is abandoned.
    pub max_attempts: u32,

    /// Minimum seconds between two initiations on the same intent.
    pub attempt_cooldown_secs: u64,

    /// Seconds an initiation holds the intent while the provider is called.
    pub initiation_lease_secs: u64,
}

impl Default for PaymentPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_cooldown_secs: 15,
            initiation_lease_secs: 30,
        }
    }
}

/// An intent that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIntent {
    pub payload: RegistrationPayload,
    pub fee: Money,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl NewIntent {
    pub fn new(payload: RegistrationPayload, fee: Money, now: Timestamp, ttl_secs: u64) -> Self {
        Self {
            payload,
            fee,
            created_at: now,
            expires_at: now.plus_secs(ttl_secs),
        }
    }
}

/// What applying a provider outcome did to the intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResolution {
    /// Attempt already resolved, or the provider still reports pending.
    Unchanged,

    /// The attempt succeeded and the intent is now `Paid`.
    Paid,

    /// The attempt failed.
    Declined { reason: String, intent_failed: bool },

    /// A second success arrived after the intent was settled.
    /// The money must be returned by hand.
    RefundRequired { reason: String },
}

impl AttemptResolution {
    pub fn changed(&self) -> bool {
        !matches!(self, AttemptResolution::Unchanged)
    }
}

/// Registration intent aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationIntent {
    pub id: IntentId,
    pub status: IntentStatus,
    pub payload: RegistrationPayload,
    pub fee: Money,
    pub attempts: Vec<PaymentAttempt>,
    pub account: Option<AccountRef>,
    pub failure_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub expires_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    /// Set while a payment initiation is talking to a provider.
    #[serde(default)]
    pub initiation_lease_until: Option<Timestamp>,
    /// Optimistic concurrency counter, bumped by the store on every save.
    pub version: i64,
}

impl RegistrationIntent {
    /// Materializes a new intent once the store has assigned its id.
    pub fn from_new(id: IntentId, new: NewIntent) -> Self {
        Self {
            id,
            status: IntentStatus::Created,
            payload: new.payload,
            fee: new.fee,
            attempts: Vec::new(),
            account: None,
            failure_reason: None,
            created_at: new.created_at,
            updated_at: new.created_at,
            expires_at: new.expires_at,
            completed_at: None,
            initiation_lease_until: None,
            version: 1,
        }
    }

    pub fn next_action(&self) -> NextAction {
        self.status.next_action()
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.is_after(&self.expires_at)
    }

    pub fn has_pending_attempt(&self) -> bool {
        self.attempts.iter().any(PaymentAttempt::is_pending)
    }

    pub fn pending_attempts(&self) -> impl Iterator<Item = &PaymentAttempt> {
        self.attempts.iter().filter(|a| a.is_pending())
    }

    pub fn latest_attempt(&self) -> Option<&PaymentAttempt> {
        self.attempts.iter().max_by_key(|a| a.created_at)
    }

    pub fn attempt_by_reference(&self, reference: &str) -> Option<&PaymentAttempt> {
        self.attempts.iter().find(|a| a.provider_reference == reference)
    }

    /// True if a client may still pick this intent back up.
    ///
    /// A paid intent stays resumable until it is finalized, whatever its age.
    pub fn is_resumable(&self, now: Timestamp) -> bool {
        match self.status {
            IntentStatus::Paid => true,
            IntentStatus::Created | IntentStatus::PaymentRequired => {
                !self.is_expired(now) || self.has_pending_attempt()
            }
            IntentStatus::Completed | IntentStatus::Failed => false,
        }
    }

    /// Fails the intent if it expired with nothing left in flight.
    ///
    /// Returns true if the intent changed and must be saved.
    pub fn expire_if_stale(&mut self, now: Timestamp) -> bool {
        if self.status.accepts_payment() && self.is_expired(now) && !self.has_pending_attempt() {
            self.status = IntentStatus::Failed;
            self.failure_reason = Some("registration expired".to_string());
            self.updated_at = now;
            return true;
        }
        false
    }

    /// Checks the attempt policy, takes the initiation lease and moves the
    /// intent to `PaymentRequired`.
    ///
    /// Called before the provider is contacted, so a failed initiation
    /// still leaves the intent in `PaymentRequired`. The lease must be saved
    /// under the version check before the provider call; it is cleared by
    /// [`record_attempt`](Self::record_attempt) or
    /// [`release_initiation`](Self::release_initiation).
    pub fn prepare_payment(
        &mut self,
        policy: &PaymentPolicy,
        now: Timestamp,
    ) -> Result<(), RegistrationError> {
        if !self.status.accepts_payment() {
            return Err(RegistrationError::conflict(self.status.as_str(), "pay for"));
        }
        if self.is_expired(now) {
            return Err(RegistrationError::conflict("EXPIRED", "pay for"));
        }
        if self.attempts.len() as u32 >= policy.max_attempts {
            return Err(RegistrationError::rate_limited(
                0,
                format!(
                    "Registration {} reached the limit of {} payment attempts",
                    self.id, policy.max_attempts
                ),
            ));
        }
        if let Some(until) = self.initiation_lease_until {
            if until.is_after(&now) {
                return Err(RegistrationError::rate_limited(
                    until.secs_until(&now).max(1),
                    "A payment is already being started for this registration",
                ));
            }
        }
        if let Some(latest) = self.latest_attempt() {
            let ready_at = latest.created_at.plus_secs(policy.attempt_cooldown_secs);
            if ready_at.is_after(&now) {
                return Err(RegistrationError::rate_limited(
                    ready_at.secs_until(&now).max(1),
                    "Please wait before starting another payment",
                ));
            }
        }

        if self.status == IntentStatus::Created {
            self.transition_to(IntentStatus::PaymentRequired, now)?;
        }
        self.initiation_lease_until = Some(now.plus_secs(policy.initiation_lease_secs));
        self.updated_at = now;
        Ok(())
    }

    /// Drops the initiation lease after a provider call that produced no attempt.
    ///
    /// Returns true if the intent changed and must be saved.
    pub fn release_initiation(&mut self) -> bool {
        self.initiation_lease_until.take().is_some()
    }

    /// Appends a freshly initiated attempt.
    pub fn record_attempt(&mut self, attempt: PaymentAttempt) -> Result<(), RegistrationError> {
        if self.status != IntentStatus::PaymentRequired {
            return Err(RegistrationError::conflict(
                self.status.as_str(),
                "record a payment attempt for",
            ));
        }
        if self.attempt_by_reference(&attempt.provider_reference).is_some() {
            return Err(RegistrationError::conflict(
                "DUPLICATE_REFERENCE",
                "record a payment attempt for",
            ));
        }
        self.updated_at = attempt.created_at;
        self.initiation_lease_until = None;
        self.attempts.push(attempt);
        Ok(())
    }

    /// Applies a provider-reported outcome to the attempt with `reference`.
    ///
    /// Idempotent: resolved attempts are left untouched.
    pub fn apply_outcome(
        &mut self,
        reference: &str,
        outcome: &ProviderOutcome,
        policy: &PaymentPolicy,
        now: Timestamp,
    ) -> Result<AttemptResolution, RegistrationError> {
        let status = self.status;
        let attempt = self
            .attempts
            .iter_mut()
            .find(|a| a.provider_reference == reference)
            .ok_or_else(|| {
                RegistrationError::validation(
                    "provider_reference",
                    format!("No payment attempt with reference {}", reference),
                )
            })?;

        if !attempt.is_pending() {
            return Ok(AttemptResolution::Unchanged);
        }

        let resolution = match outcome {
            ProviderOutcome::Pending => return Ok(AttemptResolution::Unchanged),
            ProviderOutcome::Succeeded if status == IntentStatus::PaymentRequired => {
                attempt.succeed(now);
                AttemptResolution::Paid
            }
            ProviderOutcome::Succeeded => {
                let reason = format!("superseded: intent already {}", status);
                attempt.fail(reason.clone(), now);
                AttemptResolution::RefundRequired { reason }
            }
            ProviderOutcome::Declined { reason } => {
                attempt.fail(reason.clone(), now);
                AttemptResolution::Declined {
                    reason: reason.clone(),
                    intent_failed: false,
                }
            }
        };

        self.updated_at = now;
        match resolution {
            AttemptResolution::Paid => {
                self.transition_to(IntentStatus::Paid, now)?;
                Ok(AttemptResolution::Paid)
            }
            AttemptResolution::Declined { reason, .. } => {
                let exhausted = self.attempts.len() as u32 >= policy.max_attempts
                    && self
                        .attempts
                        .iter()
                        .all(|a| a.outcome == AttemptOutcome::Failed);
                if exhausted && self.status.can_transition_to(&IntentStatus::Failed) {
                    self.fail("payment attempts exhausted", now)?;
                }
                Ok(AttemptResolution::Declined {
                    reason,
                    intent_failed: exhausted,
                })
            }
            other => Ok(other),
        }
    }

    /// Moves a paid intent to `Completed`.
    ///
    /// Returns false if it was already completed.
    pub fn complete(&mut self, now: Timestamp) -> Result<bool, RegistrationError> {
        match self.status {
            IntentStatus::Completed => Ok(false),
            IntentStatus::Paid => {
                self.transition_to(IntentStatus::Completed, now)?;
                self.completed_at = Some(now);
                Ok(true)
            }
            other => Err(RegistrationError::conflict(other.as_str(), "complete")),
        }
    }

    /// Records the provisioned account on a completed intent.
    pub fn record_account(&mut self, account: AccountRef) -> Result<(), RegistrationError> {
        if self.status != IntentStatus::Completed {
            return Err(RegistrationError::conflict(
                self.status.as_str(),
                "record an account for",
            ));
        }
        if self.account.is_some() {
            return Err(RegistrationError::conflict(
                "ACCOUNT_RECORDED",
                "record an account for",
            ));
        }
        self.updated_at = account.provisioned_at;
        self.account = Some(account);
        Ok(())
    }

    /// Abandons the intent.
    pub fn fail(&mut self, reason: impl Into<String>, now: Timestamp) -> Result<(), RegistrationError> {
        self.transition_to(IntentStatus::Failed, now)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    fn transition_to(&mut self, target: IntentStatus, now: Timestamp) -> Result<(), RegistrationError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|_| RegistrationError::conflict(self.status.as_str(), format!("move to {}", target)))?;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn payload(email: &str) -> RegistrationPayload {
        RegistrationPayload::new(email, "reader01", "Test Reader", Some("+254700000001"), None)
            .unwrap()
    }

    pub fn fee() -> Money {
        Money::new(150_000, "KES").unwrap()
    }

    pub fn intent(id: i64) -> RegistrationIntent {
        RegistrationIntent::from_new(
            IntentId::new(id).unwrap(),
            NewIntent::new(payload("reader@example.com"), fee(), Timestamp::now(), 3600),
        )
    }
}
