use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::lock;
use crate::domain::contact::{Contact, UnlockedContact};
use crate::domain::foundation::{
    ContactId, DomainError, PaymentId, ProviderId, Timestamp, UserId,
};
use crate::ports::{ContactRepository, SaveResult, UnlockedContactRepository};

#[derive(Default)]
pub struct InMemoryContactRepository {
    contacts: Mutex<HashMap<ContactId, Contact>>,
}

impl InMemoryContactRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn insert(&self, contact: &Contact) -> Result<(), DomainError> {
        lock(&self.contacts)?.insert(contact.id, contact.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, DomainError> {
        Ok(lock(&self.contacts)?.get(id).cloned())
    }

    async fn list_for_provider(
        &self,
        provider_id: &ProviderId,
    ) -> Result<Vec<Contact>, DomainError> {
        let contacts = lock(&self.contacts)?;
        let mut listed: Vec<Contact> = contacts
            .values()
            .filter(|c| &c.provider_id == provider_id)
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn mark_unlocked(
        &self,
        id: &ContactId,
        unlocked_at: Timestamp,
        payment_id: Option<PaymentId>,
    ) -> Result<bool, DomainError> {
        let mut contacts = lock(&self.contacts)?;
        Ok(match contacts.get_mut(id) {
            Some(contact) => contact.unlock(payment_id, unlocked_at),
            None => false,
        })
    }
}

#[derive(Default)]
pub struct InMemoryUnlockedContactRepository {
    grants: Mutex<HashMap<(UserId, ProviderId), UnlockedContact>>,
}

impl InMemoryUnlockedContactRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UnlockedContactRepository for InMemoryUnlockedContactRepository {
    async fn insert(&self, grant: &UnlockedContact) -> Result<SaveResult, DomainError> {
        let mut grants = lock(&self.grants)?;
        let key = (grant.user_id, grant.provider_id);
        match grants.get_mut(&key) {
            Some(existing) if existing.is_valid(grant.created_at) => Ok(SaveResult::AlreadyExists),
            Some(existing) => {
                // Expired grant: upgrade in place, keeping its id.
                let id = existing.id;
                *existing = UnlockedContact { id, ..grant.clone() };
                Ok(SaveResult::Inserted)
            }
            None => {
                grants.insert(key, grant.clone());
                Ok(SaveResult::Inserted)
            }
        }
    }

    async fn find(
        &self,
        user_id: &UserId,
        provider_id: &ProviderId,
    ) -> Result<Option<UnlockedContact>, DomainError> {
        Ok(lock(&self.grants)?.get(&(*user_id, *provider_id)).cloned())
    }
}
