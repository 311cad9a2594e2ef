//! Resume configuration: token signing and code timing

use serde::Deserialize;

use crate::domain::resume::ResumePolicy;

use super::error::ValidationError;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeConfig {
    /// HMAC secret for resume tokens
    pub token_secret: String,

    #[serde(default = "default_code_ttl")]
    pub code_ttl_secs: u64,

    #[serde(default = "default_resend_cooldown")]
    pub resend_cooldown_secs: u64,

    #[serde(default = "default_max_verify_attempts")]
    pub max_verify_attempts: u32,

    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

impl ResumeConfig {
    pub fn policy(&self) -> ResumePolicy {
        ResumePolicy {
            code_ttl_secs: self.code_ttl_secs,
            resend_cooldown_secs: self.resend_cooldown_secs,
            max_verify_attempts: self.max_verify_attempts,
            token_ttl_secs: self.token_ttl_secs,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.token_secret.is_empty() {
            return Err(ValidationError::MissingRequired("RESUME__TOKEN_SECRET"));
        }
        if self.token_secret.len() < MIN_SECRET_LEN {
            return Err(ValidationError::WeakTokenSecret);
        }
        if self.code_ttl_secs == 0 || self.token_ttl_secs == 0 {
            return Err(ValidationError::InvalidResumeTiming("lifetimes must be positive"));
        }
        if self.resend_cooldown_secs >= self.code_ttl_secs {
            return Err(ValidationError::InvalidResumeTiming(
                "resend cooldown must be shorter than code lifetime",
            ));
        }
        if self.max_verify_attempts == 0 {
            return Err(ValidationError::InvalidResumeTiming(
                "at least one verify attempt is required",
            ));
        }
        Ok(())
    }
}

fn default_code_ttl() -> u64 {
    ResumePolicy::default().code_ttl_secs
}

fn default_resend_cooldown() -> u64 {
    ResumePolicy::default().resend_cooldown_secs
}

fn default_max_verify_attempts() -> u32 {
    ResumePolicy::default().max_verify_attempts
}

fn default_token_ttl() -> u64 {
    ResumePolicy::default().token_ttl_secs
}
