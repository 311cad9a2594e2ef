//! Downstream account system configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::payment::check_url;

#[derive(Debug, Clone, Deserialize)]
pub struct AccountSystemConfig {
    pub base_url: String,
    pub api_key: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl AccountSystemConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_url(&self.base_url, "accounts.base_url")?;
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("ACCOUNTS__API_KEY"));
        }
        Ok(())
    }
}

fn default_timeout() -> u64 {
    15
}
