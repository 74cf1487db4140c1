//! Contact and unlock-entitlement repository ports.
//!
//! Implementations hand out and accept plaintext PII. Encryption at rest
//! is layered on by wrapping an implementation in the encrypting
//! decorator from the encryption adapter.

use crate::domain::contact::{Contact, UnlockedContact};
use crate::domain::foundation::{ContactId, DomainError, PaymentId, ProviderId, Timestamp, UserId};
use async_trait::async_trait;

/// Outcome of an insert guarded by a unique constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    Inserted,
    /// A row for the same key already existed. Not an error.
    AlreadyExists,
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn insert(&self, contact: &Contact) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, DomainError>;

    /// Newest first.
    async fn list_for_provider(&self, provider_id: &ProviderId)
        -> Result<Vec<Contact>, DomainError>;

    /// Sets `is_unlocked`, `unlocked_at` and `unlock_payment_id` only if the
    /// contact is still locked. Returns `false` if it already was unlocked.
    async fn mark_unlocked(
        &self,
        id: &ContactId,
        unlocked_at: Timestamp,
        payment_id: Option<PaymentId>,
    ) -> Result<bool, DomainError>;
}

#[async_trait]
pub trait UnlockedContactRepository: Send + Sync {
    /// Inserts an entitlement. An existing grant for the same
    /// (user, provider) that has expired by `grant.created_at` is replaced;
    /// one still valid yields `AlreadyExists`.
    async fn insert(&self, grant: &UnlockedContact) -> Result<SaveResult, DomainError>;

    async fn find(
        &self,
        user_id: &UserId,
        provider_id: &ProviderId,
    ) -> Result<Option<UnlockedContact>, DomainError>;
}
