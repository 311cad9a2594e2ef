//! Registration saga server
//!
//! Loads configuration from the environment, wires adapters into the saga
//! services and serves the HTTP API until Ctrl+C or SIGTERM.

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use registration_saga::adapters::http::{saga_router, HttpOptions};
use registration_saga::adapters::{
    AccountsConfig, CheckoutConfig, HttpAccountProvisioner, HttpCheckoutProvider, HttpPushProvider,
    InMemoryAccountProvisioner, InMemoryChallengeStore, InMemoryIntentStore, JwtResumeTokens,
    PostgresIntentStore, PushConfig, RecordingCodeSender, RedisChallengeStore, ResendCodeSender,
    ResendConfig, TracingEventPublisher,
};
use registration_saga::application::{PaymentProviderAdapter, SagaPorts, SagaServices};
use registration_saga::config::{AppConfig, ConfigError, ValidationError};
use registration_saga::ports::{AccountProvisioner, ChallengeStore, CodeSender, IntentStore};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis connection timed out")]
    RedisTimeout,

    #[error("adapter setup failed: {0}")]
    Adapter(String),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let services = build_services(&config).await?;
    let options = HttpOptions {
        request_timeout: config.server.request_timeout(),
        cors_origins: config.server.cors_origins_list(),
    };
    let app = saga_router(services, &options);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        version = env!("CARGO_PKG_VERSION"),
        "Registration saga listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Registration saga stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.server.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn build_services(config: &AppConfig) -> Result<SagaServices, StartupError> {
    let intents = intent_store(config).await?;
    let challenges = challenge_store(config).await?;
    let accounts = account_provisioner(config)?;
    let code_sender = code_sender(config)?;

    let ports = SagaPorts {
        intents,
        challenges,
        accounts,
        code_sender,
        resume_tokens: Arc::new(JwtResumeTokens::new(&SecretString::new(
            config.resume.token_secret.clone(),
        ))),
        event_publisher: Arc::new(TracingEventPublisher::new()),
    };

    Ok(SagaServices::new(
        ports,
        payment_adapter(config)?,
        config.saga_settings()?,
    ))
}

async fn intent_store(config: &AppConfig) -> Result<Arc<dyn IntentStore>, StartupError> {
    let Some(db) = &config.database else {
        tracing::warn!("No database configured, intents are kept in memory");
        return Ok(Arc::new(InMemoryIntentStore::new()));
    };

    let pool = PgPoolOptions::new()
        .min_connections(db.min_connections)
        .max_connections(db.max_connections)
        .acquire_timeout(db.acquire_timeout())
        .connect(&db.url)
        .await?;

    if db.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    Ok(Arc::new(PostgresIntentStore::new(pool)))
}

async fn challenge_store(config: &AppConfig) -> Result<Arc<dyn ChallengeStore>, StartupError> {
    let Some(redis_config) = &config.redis else {
        tracing::warn!("No redis configured, resume challenges are kept in memory");
        return Ok(Arc::new(InMemoryChallengeStore::new()));
    };

    let client = redis::Client::open(redis_config.url.as_str())?;
    let conn = tokio::time::timeout(
        redis_config.connect_timeout(),
        client.get_multiplexed_tokio_connection(),
    )
    .await
    .map_err(|_| StartupError::RedisTimeout)??;

    Ok(Arc::new(RedisChallengeStore::new(conn)))
}

fn account_provisioner(config: &AppConfig) -> Result<Arc<dyn AccountProvisioner>, StartupError> {
    let Some(accounts) = &config.accounts else {
        tracing::warn!("No account system configured, accounts are kept in memory");
        return Ok(Arc::new(InMemoryAccountProvisioner::new()));
    };

    let provisioner = HttpAccountProvisioner::new(
        AccountsConfig::new(
            accounts.base_url.clone(),
            SecretString::new(accounts.api_key.clone()),
        )
        .with_timeout(accounts.timeout()),
    )
    .map_err(|e| StartupError::Adapter(e.to_string()))?;
    Ok(Arc::new(provisioner))
}

fn code_sender(config: &AppConfig) -> Result<Arc<dyn CodeSender>, StartupError> {
    let Some(email) = &config.email else {
        tracing::warn!("No email configured, one-time codes are recorded but not sent");
        return Ok(Arc::new(RecordingCodeSender::new()));
    };

    let sender = ResendCodeSender::new(ResendConfig::new(
        SecretString::new(email.resend_api_key.clone()),
        email.from_header(),
    ))
    .map_err(|e| StartupError::Adapter(e.to_string()))?;
    Ok(Arc::new(sender))
}

fn payment_adapter(config: &AppConfig) -> Result<PaymentProviderAdapter, StartupError> {
    let payment = &config.payment;
    let timeout = payment.provider_timeout();

    let mut push_config = PushConfig::new(
        payment.push.base_url.clone(),
        SecretString::new(payment.push.api_key.clone()),
        SecretString::new(payment.push.callback_secret.clone()),
    )
    .with_timeout(timeout);
    if let Some(url) = config.server.public_endpoint("/api/webhooks/push") {
        push_config = push_config.with_callback_url(url);
    }

    let mut checkout_config = CheckoutConfig::new(
        payment.redirect.base_url.clone(),
        SecretString::new(payment.redirect.secret_key.clone()),
    )
    .with_timeout(timeout);
    if let Some(url) = &payment.redirect.return_url {
        checkout_config = checkout_config.with_callback_url(url.clone());
    }

    let push = HttpPushProvider::new(push_config).map_err(|e| StartupError::Adapter(e.to_string()))?;
    let checkout =
        HttpCheckoutProvider::new(checkout_config).map_err(|e| StartupError::Adapter(e.to_string()))?;

    Ok(PaymentProviderAdapter::new(Arc::new(push), Arc::new(checkout)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
