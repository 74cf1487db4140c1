//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{db_error, parse_column, violates};
use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, ProviderId, SubscriptionId, Timestamp,
};
use crate::domain::subscription::{Subscription, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

const SELECT_SUBSCRIPTION: &str = r#"
    SELECT id, provider_id, status, plan, price, start_date, end_date, payment_id,
           reminder_sent_at, created_at, updated_at
    FROM subscriptions
"#;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        clause: &str,
        id: &Uuid,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE {} = $1", SELECT_SUBSCRIPTION, clause))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("fetch subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    provider_id: Uuid,
    status: String,
    plan: String,
    price: i64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    payment_id: Option<Uuid>,
    reminder_sent_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            provider_id: ProviderId::from_uuid(row.provider_id),
            status: parse_column(&row.status, "status")?,
            plan: parse_column(&row.plan, "plan")?,
            price: row.price,
            start_date: Timestamp::from_datetime(row.start_date),
            end_date: Timestamp::from_datetime(row.end_date),
            payment_id: row.payment_id.map(PaymentId::from_uuid),
            reminder_sent_at: row.reminder_sent_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, provider_id, status, plan, price, start_date, end_date, payment_id,
                reminder_sent_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.provider_id.as_uuid())
        .bind(subscription.status.as_str())
        .bind(subscription.plan.as_str())
        .bind(subscription.price)
        .bind(subscription.start_date.as_datetime())
        .bind(subscription.end_date.as_datetime())
        .bind(subscription.payment_id.map(|p| *p.as_uuid()))
        .bind(subscription.reminder_sent_at.map(|t| *t.as_datetime()))
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, "subscriptions_provider_id_key") {
                return DomainError::conflict(
                    ErrorCode::SubscriptionExists,
                    "Provider already has a subscription",
                );
            }
            db_error("insert subscription", e)
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        self.fetch_one_where("id", id.as_uuid()).await
    }

    async fn find_by_provider(
        &self,
        provider_id: &ProviderId,
    ) -> Result<Option<Subscription>, DomainError> {
        self.fetch_one_where("provider_id", provider_id.as_uuid()).await
    }

    async fn update(
        &self,
        subscription: &Subscription,
        last_seen: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $2,
                plan = $3,
                price = $4,
                start_date = $5,
                end_date = $6,
                payment_id = $7,
                reminder_sent_at = $8,
                updated_at = $9
            WHERE id = $1 AND updated_at = $10
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.status.as_str())
        .bind(subscription.plan.as_str())
        .bind(subscription.price)
        .bind(subscription.start_date.as_datetime())
        .bind(subscription.end_date.as_datetime())
        .bind(subscription.payment_id.map(|p| *p.as_uuid()))
        .bind(subscription.reminder_sent_at.map(|t| *t.as_datetime()))
        .bind(subscription.updated_at.as_datetime())
        .bind(last_seen.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update subscription", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn expire_lapsed(&self, now: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET status = $1, updated_at = $2
            WHERE status IN ($3, $4) AND end_date < $2
            "#,
        )
        .bind(SubscriptionStatus::Expired.as_str())
        .bind(now.as_datetime())
        .bind(SubscriptionStatus::Trial.as_str())
        .bind(SubscriptionStatus::Active.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("expire subscriptions", e))?;

        Ok(result.rows_affected())
    }

    async fn find_expiring(
        &self,
        now: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE status IN ($1, $2) AND end_date > $3 AND end_date <= $4 \
             AND reminder_sent_at IS NULL ORDER BY end_date",
            SELECT_SUBSCRIPTION
        ))
        .bind(SubscriptionStatus::Trial.as_str())
        .bind(SubscriptionStatus::Active.as_str())
        .bind(now.as_datetime())
        .bind(until.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("fetch expiring subscriptions", e))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn mark_reminder_sent(
        &self,
        id: &SubscriptionId,
        at: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET reminder_sent_at = $2, updated_at = $2 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("mark reminder sent", e))?;

        Ok(result.rows_affected() == 1)
    }
}
