//! Payment repository port.
//!
//! Only the payment ledger writes through this port. Status changes go
//! through [`PaymentRepository::update_if_status`], a conditional update that
//! makes the loser of a concurrent webhook race a no-op instead of a lost
//! update.

use crate::domain::foundation::{DomainError, PaymentId, Timestamp};
use crate::domain::payment::{Payment, PaymentStatus};
use async_trait::async_trait;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Persists a freshly created payment.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure, including a duplicate
    ///   transaction id
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Stores the checkout token and URL returned by the gateway.
    async fn save_checkout(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Writes `payment` only if the stored status still equals `expected`.
    ///
    /// Returns `false` when another writer got there first.
    async fn update_if_status(
        &self,
        payment: &Payment,
        expected: PaymentStatus,
    ) -> Result<bool, DomainError>;

    /// Marks PENDING/WAITING_CUSTOMER payments created before `created_before`
    /// as EXPIRED. Returns the number of rows changed.
    async fn expire_stale(
        &self,
        created_before: Timestamp,
        now: Timestamp,
    ) -> Result<u64, DomainError>;
}
