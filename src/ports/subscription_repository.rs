//! Subscription repository port.
//!
//! One row per provider, enforced by a unique constraint on `provider_id`.

use crate::domain::foundation::{DomainError, ProviderId, SubscriptionId, Timestamp};
use crate::domain::subscription::Subscription;
use async_trait::async_trait;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Save a new subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionExists` if the provider already has a row
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    async fn find_by_provider(
        &self,
        provider_id: &ProviderId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Writes `subscription` if the stored row was last updated at
    /// `last_seen`. Returns `false` if it changed in between.
    async fn update(
        &self,
        subscription: &Subscription,
        last_seen: Timestamp,
    ) -> Result<bool, DomainError>;

    /// Bulk `trial|active` with `end_date < now` to `expired`.
    ///
    /// Returns the number of rows changed; a second call with the same
    /// `now` returns 0.
    async fn expire_lapsed(&self, now: Timestamp) -> Result<u64, DomainError>;

    /// Subscriptions with `end_date` in `(now, until]`, still in
    /// `trial|active` and without a reminder for the current period.
    async fn find_expiring(
        &self,
        now: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Sets `reminder_sent_at`. Returns `false` if the row does not exist.
    async fn mark_reminder_sent(
        &self,
        id: &SubscriptionId,
        at: Timestamp,
    ) -> Result<bool, DomainError>;
}
