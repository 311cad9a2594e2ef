//! PostgreSQL implementation of IntentStore.
//!
//! Intents live in `registration_intents`, attempts in `payment_attempts`.
//! `save` runs in one transaction: the intent row is updated only if its
//! version still matches, then new and newly resolved attempts are written.

use crate::domain::foundation::{
    AttemptId, DomainError, EmailAddress, ErrorCode, IntentId, Money, Timestamp,
};
use crate::domain::registration::{
    AccountRef, AttemptOutcome, IntentStatus, NewIntent, PaymentAttempt, ProviderKind,
    RegistrationIntent, RegistrationPayload,
};
use crate::ports::{IntentStatusView, IntentStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const INTENT_COLUMNS: &str = r#"
    id, status, email, username, full_name, phone_number, institution,
    fee_amount_minor, fee_currency, account_id, account_provisioned_at,
    failure_reason, created_at, updated_at, expires_at, completed_at,
    initiation_lease_until, version
"#;

/// PostgreSQL implementation of the IntentStore port.
pub struct PostgresIntentStore {
    pool: PgPool,
}

impl PostgresIntentStore {
    /// Creates a new PostgresIntentStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_attempts(&self, intent_id: i64) -> Result<Vec<PaymentAttempt>, DomainError> {
        let rows: Vec<AttemptRow> = sqlx::query_as(
            r#"
            SELECT id, provider, provider_reference, amount_minor, currency, outcome,
                   failure_reason, authorization_url, created_at, resolved_at
            FROM payment_attempts
            WHERE intent_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(intent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load payment attempts", e))?;

        rows.into_iter().map(PaymentAttempt::try_from).collect()
    }

    async fn hydrate(&self, row: Option<IntentRow>) -> Result<Option<RegistrationIntent>, DomainError> {
        match row {
            Some(row) => {
                let attempts = self.load_attempts(row.id).await?;
                Ok(Some(row.into_intent(attempts)?))
            }
            None => Ok(None),
        }
    }
}

/// Database row representation of a registration intent.
#[derive(Debug, sqlx::FromRow)]
struct IntentRow {
    id: i64,
    status: String,
    email: String,
    username: String,
    full_name: String,
    phone_number: Option<String>,
    institution: Option<String>,
    fee_amount_minor: i64,
    fee_currency: String,
    account_id: Option<String>,
    account_provisioned_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    initiation_lease_until: Option<DateTime<Utc>>,
    version: i64,
}

impl IntentRow {
    fn into_intent(self, attempts: Vec<PaymentAttempt>) -> Result<RegistrationIntent, DomainError> {
        let account = match (self.account_id, self.account_provisioned_at) {
            (Some(account_id), Some(at)) => Some(AccountRef {
                account_id,
                provisioned_at: Timestamp::from_datetime(at),
            }),
            _ => None,
        };

        Ok(RegistrationIntent {
            id: IntentId::new(self.id).map_err(corrupt)?,
            status: self
                .status
                .parse::<IntentStatus>()
                .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e))?,
            payload: RegistrationPayload {
                email: EmailAddress::parse(&self.email).map_err(corrupt)?,
                username: self.username,
                full_name: self.full_name,
                phone_number: self.phone_number,
                institution: self.institution,
            },
            fee: Money::new(self.fee_amount_minor, self.fee_currency).map_err(corrupt)?,
            attempts,
            account,
            failure_reason: self.failure_reason,
            created_at: Timestamp::from_datetime(self.created_at),
            updated_at: Timestamp::from_datetime(self.updated_at),
            expires_at: Timestamp::from_datetime(self.expires_at),
            completed_at: self.completed_at.map(Timestamp::from_datetime),
            initiation_lease_until: self.initiation_lease_until.map(Timestamp::from_datetime),
            version: self.version,
        })
    }
}

/// Database row representation of a payment attempt.
#[derive(Debug, sqlx::FromRow)]
struct AttemptRow {
    id: Uuid,
    provider: String,
    provider_reference: String,
    amount_minor: i64,
    currency: String,
    outcome: String,
    failure_reason: Option<String>,
    authorization_url: Option<String>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<AttemptRow> for PaymentAttempt {
    type Error = DomainError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        Ok(PaymentAttempt {
            id: AttemptId::from_uuid(row.id),
            provider: row
                .provider
                .parse::<ProviderKind>()
                .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e))?,
            provider_reference: row.provider_reference,
            amount: Money::new(row.amount_minor, row.currency).map_err(corrupt)?,
            outcome: row
                .outcome
                .parse::<AttemptOutcome>()
                .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e))?,
            failure_reason: row.failure_reason,
            authorization_url: row.authorization_url,
            created_at: Timestamp::from_datetime(row.created_at),
            resolved_at: row.resolved_at.map(Timestamp::from_datetime),
        })
    }
}

fn corrupt(e: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Corrupt intent row: {}", e))
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

async fn write_attempts(
    tx: &mut Transaction<'_, Postgres>,
    intent: &RegistrationIntent,
) -> Result<(), DomainError> {
    for attempt in &intent.attempts {
        sqlx::query(
            r#"
            INSERT INTO payment_attempts (
                id, intent_id, provider, provider_reference, amount_minor, currency,
                outcome, failure_reason, authorization_url, created_at, resolved_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                outcome = EXCLUDED.outcome,
                failure_reason = EXCLUDED.failure_reason,
                resolved_at = EXCLUDED.resolved_at
            WHERE payment_attempts.outcome = 'PENDING'
            "#,
        )
        .bind(attempt.id.as_uuid())
        .bind(intent.id.value())
        .bind(attempt.provider.as_str())
        .bind(&attempt.provider_reference)
        .bind(attempt.amount.amount_minor())
        .bind(attempt.amount.currency())
        .bind(attempt.outcome.as_str())
        .bind(&attempt.failure_reason)
        .bind(&attempt.authorization_url)
        .bind(attempt.created_at.as_datetime())
        .bind(attempt.resolved_at.map(|t| *t.as_datetime()))
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                match db_err.constraint() {
                    Some("payment_attempts_provider_reference_key") => {
                        return DomainError::new(
                            ErrorCode::VersionConflict,
                            "Provider reference already recorded",
                        )
                    }
                    Some("payment_attempts_one_success_idx") => {
                        return DomainError::new(
                            ErrorCode::VersionConflict,
                            "Intent already has a successful payment",
                        )
                    }
                    _ => {}
                }
            }
            db_error("Failed to save payment attempt", e)
        })?;
    }
    Ok(())
}

#[async_trait]
impl IntentStore for PostgresIntentStore {
    async fn create(&self, intent: NewIntent) -> Result<RegistrationIntent, DomainError> {
        let payload = &intent.payload;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO registration_intents (
                status, email, username, full_name, phone_number, institution,
                fee_amount_minor, fee_currency, created_at, updated_at, expires_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $10, 1)
            RETURNING id
            "#,
        )
        .bind(IntentStatus::Created.as_str())
        .bind(payload.email.as_str())
        .bind(&payload.username)
        .bind(&payload.full_name)
        .bind(&payload.phone_number)
        .bind(&payload.institution)
        .bind(intent.fee.amount_minor())
        .bind(intent.fee.currency())
        .bind(intent.created_at.as_datetime())
        .bind(intent.expires_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create registration intent", e))?;

        Ok(RegistrationIntent::from_new(IntentId::new(id).map_err(corrupt)?, intent))
    }

    async fn find(&self, id: IntentId) -> Result<Option<RegistrationIntent>, DomainError> {
        let row: Option<IntentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM registration_intents WHERE id = $1",
            INTENT_COLUMNS
        ))
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find registration intent", e))?;

        self.hydrate(row).await
    }

    async fn find_by_reference(
        &self,
        provider_reference: &str,
    ) -> Result<Option<RegistrationIntent>, DomainError> {
        let intent_id: Option<i64> = sqlx::query_scalar(
            "SELECT intent_id FROM payment_attempts WHERE provider_reference = $1 LIMIT 1",
        )
        .bind(provider_reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find payment attempt", e))?;

        match intent_id {
            Some(id) => self.find(IntentId::new(id).map_err(corrupt)?).await,
            None => Ok(None),
        }
    }

    async fn find_open_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<RegistrationIntent>, DomainError> {
        let row: Option<IntentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM registration_intents
            WHERE email = $1 AND status IN ('CREATED', 'PAYMENT_REQUIRED', 'PAID')
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
            INTENT_COLUMNS
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find open registration intent", e))?;

        self.hydrate(row).await
    }

    async fn save(&self, intent: &RegistrationIntent) -> Result<i64, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let result = sqlx::query(
            r#"
            UPDATE registration_intents SET
                status = $3,
                account_id = $4,
                account_provisioned_at = $5,
                failure_reason = $6,
                updated_at = $7,
                completed_at = $8,
                initiation_lease_until = $9,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(intent.id.value())
        .bind(intent.version)
        .bind(intent.status.as_str())
        .bind(intent.account.as_ref().map(|a| a.account_id.as_str()))
        .bind(intent.account.as_ref().map(|a| *a.provisioned_at.as_datetime()))
        .bind(&intent.failure_reason)
        .bind(intent.updated_at.as_datetime())
        .bind(intent.completed_at.map(|t| *t.as_datetime()))
        .bind(intent.initiation_lease_until.map(|t| *t.as_datetime()))
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update registration intent", e))?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT version FROM registration_intents WHERE id = $1")
                    .bind(intent.id.value())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| db_error("Failed to check registration intent", e))?;

            return Err(match exists {
                Some(current) => DomainError::new(
                    ErrorCode::VersionConflict,
                    format!(
                        "Registration intent {} is at version {}, expected {}",
                        intent.id, current, intent.version
                    ),
                ),
                None => DomainError::new(
                    ErrorCode::IntentNotFound,
                    format!("Registration intent {} not found", intent.id),
                ),
            });
        }

        write_attempts(&mut tx, intent).await?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit registration intent", e))?;

        Ok(intent.version + 1)
    }

    async fn status(&self, id: IntentId) -> Result<Option<IntentStatusView>, DomainError> {
        Ok(self.find(id).await?.as_ref().map(IntentStatusView::from_intent))
    }
}
