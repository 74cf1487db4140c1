use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::lock;
use crate::domain::foundation::{DomainError, ErrorCode, ProviderId, SubscriptionId, Timestamp};
use crate::domain::subscription::Subscription;
use crate::ports::SubscriptionRepository;

#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    rows: Mutex<HashMap<SubscriptionId, Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a row as-is. Lets tests place a subscription at an
    /// arbitrary point in its lifecycle.
    pub fn put(&self, subscription: Subscription) {
        if let Ok(mut rows) = self.rows.lock() {
            rows.insert(subscription.id, subscription);
        }
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut rows = lock(&self.rows)?;
        if rows
            .values()
            .any(|s| s.provider_id == subscription.provider_id)
        {
            return Err(DomainError::conflict(
                ErrorCode::SubscriptionExists,
                "Provider already has a subscription",
            ));
        }
        rows.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(lock(&self.rows)?.get(id).cloned())
    }

    async fn find_by_provider(
        &self,
        provider_id: &ProviderId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(lock(&self.rows)?
            .values()
            .find(|s| &s.provider_id == provider_id)
            .cloned())
    }

    async fn update(
        &self,
        subscription: &Subscription,
        last_seen: Timestamp,
    ) -> Result<bool, DomainError> {
        let mut rows = lock(&self.rows)?;
        match rows.get_mut(&subscription.id) {
            Some(stored) if stored.updated_at == last_seen => {
                *stored = subscription.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(DomainError::not_found(
                ErrorCode::SubscriptionNotFound,
                "Subscription not found",
            )),
        }
    }

    async fn expire_lapsed(&self, now: Timestamp) -> Result<u64, DomainError> {
        let mut rows = lock(&self.rows)?;
        let count = rows
            .values_mut()
            .map(|s| s.expire_if_lapsed(now))
            .filter(|expired| *expired)
            .count();
        Ok(count as u64)
    }

    async fn find_expiring(
        &self,
        now: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows = lock(&self.rows)?;
        let mut expiring: Vec<Subscription> = rows
            .values()
            .filter(|s| {
                s.reminder_sent_at.is_none()
                    && s.status.grants_access()
                    && s.end_date.is_after(&now)
                    && !s.end_date.is_after(&until)
            })
            .cloned()
            .collect();
        expiring.sort_by_key(|s| s.end_date);
        Ok(expiring)
    }

    async fn mark_reminder_sent(
        &self,
        id: &SubscriptionId,
        at: Timestamp,
    ) -> Result<bool, DomainError> {
        let mut rows = lock(&self.rows)?;
        Ok(match rows.get_mut(id) {
            Some(s) => {
                s.mark_reminder_sent(at);
                true
            }
            None => false,
        })
    }
}
