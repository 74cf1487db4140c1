//! PostgreSQL implementations of ContactRepository and
//! UnlockedContactRepository.
//!
//! These store whatever they are given. Wrap the contact repository in the
//! encrypting decorator so sender PII lands as ciphertext.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{db_error, parse_column};
use crate::domain::contact::{Contact, UnlockedContact};
use crate::domain::foundation::{
    ContactId, DomainError, PaymentId, ProviderId, Timestamp, UnlockedContactId, UserId,
};
use crate::ports::{ContactRepository, SaveResult, UnlockedContactRepository};

const SELECT_CONTACT: &str = r#"
    SELECT id, user_id, provider_id, message, sender_name, sender_email, sender_phone,
           status, is_unlocked, unlocked_at, unlock_payment_id, created_at, updated_at
    FROM contacts
"#;

pub struct PostgresContactRepository {
    pool: PgPool,
}

impl PostgresContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: Uuid,
    user_id: Option<Uuid>,
    provider_id: Uuid,
    message: String,
    sender_name: String,
    sender_email: String,
    sender_phone: Option<String>,
    status: String,
    is_unlocked: bool,
    unlocked_at: Option<DateTime<Utc>>,
    unlock_payment_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContactRow> for Contact {
    type Error = DomainError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        Ok(Contact {
            id: ContactId::from_uuid(row.id),
            user_id: row.user_id.map(UserId::from_uuid),
            provider_id: ProviderId::from_uuid(row.provider_id),
            message: row.message,
            sender_name: row.sender_name,
            sender_email: row.sender_email,
            sender_phone: row.sender_phone,
            status: parse_column(&row.status, "status")?,
            is_unlocked: row.is_unlocked,
            unlocked_at: row.unlocked_at.map(Timestamp::from_datetime),
            unlock_payment_id: row.unlock_payment_id.map(PaymentId::from_uuid),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl ContactRepository for PostgresContactRepository {
    async fn insert(&self, contact: &Contact) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO contacts (
                id, user_id, provider_id, message, sender_name, sender_email, sender_phone,
                status, is_unlocked, unlocked_at, unlock_payment_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(contact.id.as_uuid())
        .bind(contact.user_id.map(|u| *u.as_uuid()))
        .bind(contact.provider_id.as_uuid())
        .bind(&contact.message)
        .bind(&contact.sender_name)
        .bind(&contact.sender_email)
        .bind(&contact.sender_phone)
        .bind(contact.status.as_str())
        .bind(contact.is_unlocked)
        .bind(contact.unlocked_at.map(|t| *t.as_datetime()))
        .bind(contact.unlock_payment_id.map(|p| *p.as_uuid()))
        .bind(contact.created_at.as_datetime())
        .bind(contact.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("insert contact", e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, DomainError> {
        let row: Option<ContactRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_CONTACT))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch contact", e))?;

        row.map(Contact::try_from).transpose()
    }

    async fn list_for_provider(
        &self,
        provider_id: &ProviderId,
    ) -> Result<Vec<Contact>, DomainError> {
        let rows: Vec<ContactRow> = sqlx::query_as(&format!(
            "{} WHERE provider_id = $1 ORDER BY created_at DESC",
            SELECT_CONTACT
        ))
        .bind(provider_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list contacts", e))?;

        rows.into_iter().map(Contact::try_from).collect()
    }

    async fn mark_unlocked(
        &self,
        id: &ContactId,
        unlocked_at: Timestamp,
        payment_id: Option<PaymentId>,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE contacts SET
                is_unlocked = TRUE,
                unlocked_at = $2,
                unlock_payment_id = $3,
                updated_at = $2
            WHERE id = $1 AND is_unlocked = FALSE
            "#,
        )
        .bind(id.as_uuid())
        .bind(unlocked_at.as_datetime())
        .bind(payment_id.map(|p| *p.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("unlock contact", e))?;

        Ok(result.rows_affected() == 1)
    }
}

pub struct PostgresUnlockedContactRepository {
    pool: PgPool,
}

impl PostgresUnlockedContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UnlockedContactRow {
    id: Uuid,
    user_id: Uuid,
    provider_id: Uuid,
    unlock_type: String,
    payment_id: Option<Uuid>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UnlockedContactRow> for UnlockedContact {
    type Error = DomainError;

    fn try_from(row: UnlockedContactRow) -> Result<Self, Self::Error> {
        Ok(UnlockedContact {
            id: UnlockedContactId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            provider_id: ProviderId::from_uuid(row.provider_id),
            unlock_type: parse_column(&row.unlock_type, "unlock_type")?,
            payment_id: row.payment_id.map(PaymentId::from_uuid),
            expires_at: row.expires_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl UnlockedContactRepository for PostgresUnlockedContactRepository {
    async fn insert(&self, grant: &UnlockedContact) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO unlocked_contacts (
                id, user_id, provider_id, unlock_type, payment_id, expires_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT ON CONSTRAINT unlocked_contacts_user_provider_key DO UPDATE SET
                unlock_type = EXCLUDED.unlock_type,
                payment_id = EXCLUDED.payment_id,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at
            WHERE unlocked_contacts.expires_at IS NOT NULL
              AND unlocked_contacts.expires_at <= EXCLUDED.created_at
            "#,
        )
        .bind(grant.id.as_uuid())
        .bind(grant.user_id.as_uuid())
        .bind(grant.provider_id.as_uuid())
        .bind(grant.unlock_type.as_str())
        .bind(grant.payment_id.map(|p| *p.as_uuid()))
        .bind(grant.expires_at.map(|t| *t.as_datetime()))
        .bind(grant.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("insert unlock entitlement", e))?;

        Ok(if result.rows_affected() == 1 {
            SaveResult::Inserted
        } else {
            SaveResult::AlreadyExists
        })
    }

    async fn find(
        &self,
        user_id: &UserId,
        provider_id: &ProviderId,
    ) -> Result<Option<UnlockedContact>, DomainError> {
        let row: Option<UnlockedContactRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, provider_id, unlock_type, payment_id, expires_at, created_at
            FROM unlocked_contacts
            WHERE user_id = $1 AND provider_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(provider_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch unlock entitlement", e))?;

        row.map(UnlockedContact::try_from).transpose()
    }
}
