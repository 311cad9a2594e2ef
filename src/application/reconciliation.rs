//! Reconciliation loop.
//!
//! Polls the intent store until the payment reaches an outcome the caller
//! can act on. The loop only reads: outcomes are written by callbacks and
//! status checks, and the loop observes them.
//!
//! At most one loop runs per intent in this process; a second start returns
//! [`ReconcileOutcome::AlreadyRunning`] immediately.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::domain::foundation::IntentId;
use crate::domain::registration::{AttemptOutcome, IntentStatus, RegistrationError};
use crate::ports::{IntentStatusView, IntentStore};

/// How a reconciliation run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Paid,
    Completed,
    /// The watched attempt failed; the intent still accepts payment.
    Declined { reason: String },
    /// The intent itself failed.
    Failed { reason: String },
    TimedOut,
    Cancelled,
    AlreadyRunning,
}

/// Timing of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(120),
        }
    }
}

type Registry = Arc<Mutex<HashSet<IntentId>>>;

/// Removes the intent from the registry when the run ends, however it ends.
struct RunGuard {
    registry: Registry,
    intent_id: IntentId,
}

impl RunGuard {
    fn acquire(registry: &Registry, intent_id: IntentId) -> Option<Self> {
        let mut running = registry.lock().unwrap_or_else(|p| p.into_inner());
        if !running.insert(intent_id) {
            return None;
        }
        Some(Self {
            registry: registry.clone(),
            intent_id,
        })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.intent_id);
    }
}

pub struct ReconciliationLoop {
    store: Arc<dyn IntentStore>,
    config: ReconcileConfig,
    running: Registry,
}

impl ReconciliationLoop {
    pub fn new(store: Arc<dyn IntentStore>, config: ReconcileConfig) -> Self {
        Self {
            store,
            config,
            running: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn is_running(&self, intent_id: IntentId) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&intent_id)
    }

    /// Watches `intent_id` until an outcome, the timeout, or cancellation.
    ///
    /// `watched_reference` selects the attempt whose decline ends the run;
    /// without it the most recent attempt is watched. Sending `true` on
    /// `cancel` stops the run.
    pub async fn run(
        &self,
        intent_id: IntentId,
        watched_reference: Option<&str>,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<ReconcileOutcome, RegistrationError> {
        let Some(_guard) = RunGuard::acquire(&self.running, intent_id) else {
            tracing::debug!(intent_id = %intent_id, "Reconciliation already running");
            return Ok(ReconcileOutcome::AlreadyRunning);
        };

        let cancelled_before_start = *cancel.borrow();
        if cancelled_before_start {
            return Ok(ReconcileOutcome::Cancelled);
        }

        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cancel_open = true;

        loop {
            tokio::select! {
                biased;

                changed = cancel.changed(), if cancel_open => {
                    let cancelled = match changed {
                        Ok(()) => *cancel.borrow(),
                        // Sender gone: nobody can cancel any more.
                        Err(_) => {
                            cancel_open = false;
                            false
                        }
                    };
                    if cancelled {
                        tracing::debug!(intent_id = %intent_id, "Reconciliation cancelled");
                        return Ok(ReconcileOutcome::Cancelled);
                    }
                }

                _ = &mut deadline => {
                    tracing::info!(intent_id = %intent_id, "Reconciliation timed out");
                    return Ok(ReconcileOutcome::TimedOut);
                }

                _ = ticker.tick() => {
                    let view = self
                        .store
                        .status(intent_id)
                        .await?
                        .ok_or(RegistrationError::NotFound(intent_id))?;

                    if let Some(outcome) = classify(&view, watched_reference) {
                        tracing::info!(intent_id = %intent_id, outcome = ?outcome, "Reconciliation finished");
                        return Ok(outcome);
                    }
                }
            }
        }
    }
}

/// Maps a status snapshot to an outcome, or `None` to keep polling.
fn classify(view: &IntentStatusView, watched_reference: Option<&str>) -> Option<ReconcileOutcome> {
    match view.status {
        IntentStatus::Paid => Some(ReconcileOutcome::Paid),
        IntentStatus::Completed => Some(ReconcileOutcome::Completed),
        IntentStatus::Failed => Some(ReconcileOutcome::Failed {
            reason: view
                .failure_reason
                .clone()
                .unwrap_or_else(|| "registration failed".to_string()),
        }),
        IntentStatus::Created | IntentStatus::PaymentRequired => {
            let watched = match watched_reference {
                Some(reference) => view.attempt(reference),
                None => view.attempts.last(),
            }?;
            (watched.outcome == AttemptOutcome::Failed).then(|| ReconcileOutcome::Declined {
                reason: watched
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "payment declined".to_string()),
            })
        }
    }
}
