//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `REGISTRATION_SAGA`
//! prefix and `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use registration_saga::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```
//!
//! `database`, `redis`, `email` and `accounts` are optional outside
//! production; without them the binary runs on in-memory adapters.

mod accounts;
mod database;
mod email;
mod error;
mod payment;
mod redis;
mod resume;
mod saga;
mod server;

pub use accounts::AccountSystemConfig;
pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::{PaymentConfig, PushProviderConfig, RedirectProviderConfig};
pub use redis::RedisConfig;
pub use resume::ResumeConfig;
pub use saga::SagaConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

use crate::application::SagaSettings;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL intent store; in-memory when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Redis challenge store; in-memory when absent
    #[serde(default)]
    pub redis: Option<RedisConfig>,

    pub payment: PaymentConfig,

    /// Resend mailer; codes are only recorded when absent
    #[serde(default)]
    pub email: Option<EmailConfig>,

    pub resume: ResumeConfig,

    #[serde(default)]
    pub saga: SagaConfig,

    /// Account system; accounts are kept in memory when absent
    #[serde(default)]
    pub accounts: Option<AccountSystemConfig>,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// - `REGISTRATION_SAGA__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `REGISTRATION_SAGA__PAYMENT__PUSH__BASE_URL=...` -> `payment.push.base_url`
    ///
    /// A `.env` file is read first if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("REGISTRATION_SAGA")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation of every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        if let Some(redis) = &self.redis {
            redis.validate()?;
        }
        self.payment.validate()?;
        if let Some(email) = &self.email {
            email.validate()?;
        }
        self.resume.validate()?;
        self.saga.validate()?;
        if let Some(accounts) = &self.accounts {
            accounts.validate()?;
        }

        if self.server.request_timeout_secs <= self.saga.reconcile_timeout_secs {
            return Err(ValidationError::TimeoutShorterThanReconciliation);
        }

        if self.is_production() {
            self.require_production_sections()?;
        }
        Ok(())
    }

    fn require_production_sections(&self) -> Result<(), ValidationError> {
        if self.database.is_none() {
            return Err(ValidationError::RequiredInProduction("database"));
        }
        if self.redis.is_none() {
            return Err(ValidationError::RequiredInProduction("redis"));
        }
        if self.email.is_none() {
            return Err(ValidationError::RequiredInProduction("email"));
        }
        if self.accounts.is_none() {
            return Err(ValidationError::RequiredInProduction("accounts"));
        }
        if self.server.public_url.is_none() {
            return Err(ValidationError::RequiredInProduction("server.public_url"));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    /// Saga tunables assembled from the payment, resume and saga sections.
    pub fn saga_settings(&self) -> Result<SagaSettings, ValidationError> {
        let mut settings = SagaSettings::new(self.payment.fee()?);
        settings.intent_ttl_secs = self.saga.intent_ttl_secs;
        settings.payment_policy = self.payment.policy();
        settings.resume_policy = self.resume.policy();
        settings.poll_interval = self.saga.poll_interval();
        settings.reconcile_timeout = self.saga.reconcile_timeout();
        settings.max_conflict_retries = self.saga.max_conflict_retries;
        settings.callback_grace = self.saga.callback_grace();
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use std::time::Duration;

    // Env vars are process-global.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const MINIMAL_ENV: &[(&str, &str)] = &[
        ("REGISTRATION_SAGA__PAYMENT__PUSH__BASE_URL", "https://push.example.com"),
        ("REGISTRATION_SAGA__PAYMENT__PUSH__API_KEY", "push_key"),
        ("REGISTRATION_SAGA__PAYMENT__PUSH__CALLBACK_SECRET", "push_cb"),
        ("REGISTRATION_SAGA__PAYMENT__REDIRECT__BASE_URL", "https://checkout.example.com"),
        ("REGISTRATION_SAGA__PAYMENT__REDIRECT__SECRET_KEY", "sk_test_checkout"),
        ("REGISTRATION_SAGA__PAYMENT__FEE_MINOR", "150000"),
        (
            "REGISTRATION_SAGA__RESUME__TOKEN_SECRET",
            "0123456789abcdef0123456789abcdef",
        ),
    ];

    const OPTIONAL_KEYS: &[&str] = &[
        "REGISTRATION_SAGA__SERVER__PORT",
        "REGISTRATION_SAGA__SERVER__ENVIRONMENT",
        "REGISTRATION_SAGA__SAGA__POLL_INTERVAL_SECS",
        "REGISTRATION_SAGA__DATABASE__URL",
    ];

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        for (key, value) in MINIMAL_ENV.iter().chain(extra) {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        for (key, _) in MINIMAL_ENV {
            env::remove_var(key);
        }
        for key in OPTIONAL_KEYS {
            env::remove_var(key);
        }
        result
    }

    #[test]
    fn loads_minimal_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert_eq!(config.payment.push.base_url, "https://push.example.com");
        assert_eq!(config.payment.fee_minor, 150_000);
        assert_eq!(config.payment.currency, "KES");
        assert!(config.database.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_overrides_are_applied() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("REGISTRATION_SAGA__SERVER__PORT", "3000"),
            ("REGISTRATION_SAGA__SAGA__POLL_INTERVAL_SECS", "2"),
            ("REGISTRATION_SAGA__DATABASE__URL", "postgres://localhost/saga"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.saga.poll_interval_secs, 2);
        assert_eq!(
            config.database.map(|d| d.url).as_deref(),
            Some("postgres://localhost/saga")
        );
    }

    #[test]
    fn production_requires_real_adapters() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[("REGISTRATION_SAGA__SERVER__ENVIRONMENT", "production")]).unwrap();

        assert!(config.is_production());
        assert_eq!(
            config.validate(),
            Err(ValidationError::RequiredInProduction("database"))
        );
    }

    #[test]
    fn saga_settings_follow_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[("REGISTRATION_SAGA__SAGA__POLL_INTERVAL_SECS", "2")]).unwrap();
        let settings = config.saga_settings().unwrap();

        assert_eq!(settings.registration_fee.amount_minor(), 150_000);
        assert_eq!(settings.poll_interval, Duration::from_secs(2));
        assert_eq!(settings.reconcile_timeout, Duration::from_secs(120));
        assert_eq!(settings.resume_policy.code_ttl_secs, 600);
    }

    #[test]
    fn request_timeout_must_outlast_reconciliation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut config = load_with(&[]).unwrap();
        config.server.request_timeout_secs = 60;

        assert_eq!(
            config.validate(),
            Err(ValidationError::TimeoutShorterThanReconciliation)
        );
    }
}
