//! Code sender that keeps codes in memory.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EmailAddress, ErrorCode};
use crate::domain::resume::OneTimeCode;
use crate::ports::CodeSender;

/// A delivered code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCode {
    pub to: EmailAddress,
    pub code: String,
    pub expires_in_secs: u64,
}

#[derive(Default)]
struct RecordingState {
    sent: Vec<SentCode>,
    fail: bool,
}

/// Records codes instead of sending them.
#[derive(Default, Clone)]
pub struct RecordingCodeSender {
    inner: Arc<Mutex<RecordingState>>,
}

impl RecordingCodeSender {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes every send fail.
    pub fn set_failing(&self, fail: bool) {
        self.state().fail = fail;
    }

    pub fn sent(&self) -> Vec<SentCode> {
        self.state().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state().sent.len()
    }

    /// Most recent code sent to `email`.
    pub fn last_code_for(&self, email: &EmailAddress) -> Option<String> {
        self.state()
            .sent
            .iter()
            .rev()
            .find(|s| &s.to == email)
            .map(|s| s.code.clone())
    }
}

#[async_trait]
impl CodeSender for RecordingCodeSender {
    async fn send_code(
        &self,
        to: &EmailAddress,
        code: &OneTimeCode,
        expires_in_secs: u64,
    ) -> Result<(), DomainError> {
        let mut state = self.state();
        if state.fail {
            return Err(DomainError::new(
                ErrorCode::ExternalServiceError,
                "Email delivery failed",
            ));
        }
        state.sent.push(SentCode {
            to: to.clone(),
            code: code.as_str().to_string(),
            expires_in_secs,
        });
        Ok(())
    }
}
