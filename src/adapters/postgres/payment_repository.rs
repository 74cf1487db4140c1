//! PostgreSQL implementation of PaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::{db_error, parse_column, violates};
use crate::domain::foundation::{DomainError, PaymentId, ProviderId, Timestamp, UserId};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::ports::PaymentRepository;

const SELECT_PAYMENT: &str = r#"
    SELECT id, transaction_id, user_id, provider_id, payment_type, amount, currency,
           status, gateway, payment_token, payment_url, operator_id, payment_method,
           error_message, paid_at, fund_availability_date, description, metadata,
           created_at, updated_at
    FROM payments
"#;

pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    transaction_id: String,
    user_id: Option<Uuid>,
    provider_id: Option<Uuid>,
    payment_type: String,
    amount: i64,
    currency: String,
    status: String,
    gateway: String,
    payment_token: Option<String>,
    payment_url: Option<String>,
    operator_id: Option<String>,
    payment_method: Option<String>,
    error_message: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    fund_availability_date: Option<DateTime<Utc>>,
    description: String,
    metadata: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            transaction_id: row.transaction_id,
            user_id: row.user_id.map(UserId::from_uuid),
            provider_id: row.provider_id.map(ProviderId::from_uuid),
            payment_type: parse_column(&row.payment_type, "payment_type")?,
            amount: row.amount,
            currency: row.currency,
            status: parse_column(&row.status, "status")?,
            gateway: parse_column(&row.gateway, "gateway")?,
            payment_token: row.payment_token,
            payment_url: row.payment_url,
            operator_id: row.operator_id,
            payment_method: row.payment_method,
            error_message: row.error_message,
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            fund_availability_date: row.fund_availability_date.map(Timestamp::from_datetime),
            description: row.description,
            metadata: row.metadata,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, transaction_id, user_id, provider_id, payment_type, amount, currency,
                status, gateway, description, metadata, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(&payment.transaction_id)
        .bind(payment.user_id.map(|u| *u.as_uuid()))
        .bind(payment.provider_id.map(|p| *p.as_uuid()))
        .bind(payment.payment_type.as_str())
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(payment.gateway.as_str())
        .bind(&payment.description)
        .bind(&payment.metadata)
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, "payments_transaction_id_key") {
                return DomainError::database(format!(
                    "Duplicate transaction id {}",
                    payment.transaction_id
                ));
            }
            db_error("insert payment", e)
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_PAYMENT))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("{} WHERE transaction_id = $1", SELECT_PAYMENT))
                .bind(transaction_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("fetch payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn save_checkout(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            "UPDATE payments SET payment_token = $2, payment_url = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(payment.id.as_uuid())
        .bind(&payment.payment_token)
        .bind(&payment.payment_url)
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("save checkout", e))?;

        Ok(())
    }

    async fn update_if_status(
        &self,
        payment: &Payment,
        expected: PaymentStatus,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = $2,
                operator_id = $3,
                payment_method = $4,
                error_message = $5,
                paid_at = $6,
                fund_availability_date = $7,
                updated_at = $8
            WHERE id = $1 AND status = $9
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.status.as_str())
        .bind(&payment.operator_id)
        .bind(&payment.payment_method)
        .bind(&payment.error_message)
        .bind(payment.paid_at.map(|t| *t.as_datetime()))
        .bind(payment.fund_availability_date.map(|t| *t.as_datetime()))
        .bind(payment.updated_at.as_datetime())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update payment", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn expire_stale(
        &self,
        created_before: Timestamp,
        now: Timestamp,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET status = $1, updated_at = $2
            WHERE status IN ($3, $4) AND created_at < $5
            "#,
        )
        .bind(PaymentStatus::Expired.as_str())
        .bind(now.as_datetime())
        .bind(PaymentStatus::Pending.as_str())
        .bind(PaymentStatus::WaitingCustomer.as_str())
        .bind(created_before.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("expire stale payments", e))?;

        Ok(result.rows_affected())
    }
}
