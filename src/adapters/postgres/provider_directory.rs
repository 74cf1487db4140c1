//! PostgreSQL implementation of ProviderDirectory.
//!
//! `contact_email` is stored encrypted; it is decrypted here on read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use super::db_error;
use crate::adapters::encryption::FieldCipher;
use crate::domain::foundation::{DomainError, ErrorCode, ProviderId, Timestamp, UserId};
use crate::domain::provider::ProviderListing;
use crate::ports::ProviderDirectory;

pub struct PostgresProviderDirectory {
    pool: PgPool,
    cipher: Arc<FieldCipher>,
}

impl PostgresProviderDirectory {
    pub fn new(pool: PgPool, cipher: Arc<FieldCipher>) -> Self {
        Self { pool, cipher }
    }

    async fn set_column(
        &self,
        id: &ProviderId,
        query: &'static str,
        value: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(query)
            .bind(id.as_uuid())
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("update provider", e))?;

        if result.rows_affected() == 0 {
            return Err(provider_not_found());
        }
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProviderRow {
    id: Uuid,
    user_id: Uuid,
    display_name: String,
    contact_email: Option<String>,
    is_visible: bool,
    featured_until: Option<DateTime<Utc>>,
    boosted_until: Option<DateTime<Utc>>,
}

fn provider_not_found() -> DomainError {
    DomainError::not_found(ErrorCode::ProviderNotFound, "Provider not found")
}

#[async_trait]
impl ProviderDirectory for PostgresProviderDirectory {
    async fn find(&self, id: &ProviderId) -> Result<Option<ProviderListing>, DomainError> {
        let row: Option<ProviderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, display_name, contact_email, is_visible,
                   featured_until, boosted_until
            FROM providers
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch provider", e))?;

        Ok(row.map(|row| ProviderListing {
            id: ProviderId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            display_name: row.display_name,
            contact_email: row.contact_email.map(|email| self.cipher.decrypt(&email)),
            is_visible: row.is_visible,
            featured_until: row.featured_until.map(Timestamp::from_datetime),
            boosted_until: row.boosted_until.map(Timestamp::from_datetime),
        }))
    }

    async fn set_visibility(&self, id: &ProviderId, visible: bool) -> Result<(), DomainError> {
        let result =
            sqlx::query("UPDATE providers SET is_visible = $2, updated_at = NOW() WHERE id = $1")
                .bind(id.as_uuid())
                .bind(visible)
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("update provider visibility", e))?;

        if result.rows_affected() == 0 {
            return Err(provider_not_found());
        }
        Ok(())
    }

    async fn set_featured_until(
        &self,
        id: &ProviderId,
        until: Timestamp,
    ) -> Result<(), DomainError> {
        self.set_column(
            id,
            "UPDATE providers SET featured_until = $2, updated_at = NOW() WHERE id = $1",
            *until.as_datetime(),
        )
        .await
    }

    async fn set_boosted_until(
        &self,
        id: &ProviderId,
        until: Timestamp,
    ) -> Result<(), DomainError> {
        self.set_column(
            id,
            "UPDATE providers SET boosted_until = $2, updated_at = NOW() WHERE id = $1",
            *until.as_datetime(),
        )
        .await
    }
}
