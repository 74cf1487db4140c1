//! Contact repository decorator that encrypts sender PII at rest.
//!
//! Writes pass `sender_email` and `sender_phone` through
//! `encrypt_if_needed`; reads pass them through `decrypt`. The wrapped
//! repository only ever sees ciphertext for those two fields.

use crate::domain::contact::Contact;
use crate::domain::foundation::{ContactId, DomainError, PaymentId, ProviderId, Timestamp};
use crate::ports::ContactRepository;
use async_trait::async_trait;
use std::sync::Arc;

use super::FieldCipher;

pub struct EncryptingContactRepository {
    inner: Arc<dyn ContactRepository>,
    cipher: Arc<FieldCipher>,
}

impl EncryptingContactRepository {
    pub fn new(inner: Arc<dyn ContactRepository>, cipher: Arc<FieldCipher>) -> Self {
        Self { inner, cipher }
    }

    fn seal(&self, contact: &Contact) -> Contact {
        let mut sealed = contact.clone();
        sealed.sender_email = self.cipher.encrypt_if_needed(&contact.sender_email);
        sealed.sender_phone = contact
            .sender_phone
            .as_deref()
            .map(|phone| self.cipher.encrypt_if_needed(phone));
        sealed
    }

    fn open(&self, mut contact: Contact) -> Contact {
        contact.sender_email = self.cipher.decrypt(&contact.sender_email);
        contact.sender_phone = contact
            .sender_phone
            .as_deref()
            .map(|phone| self.cipher.decrypt(phone));
        contact
    }
}

#[async_trait]
impl ContactRepository for EncryptingContactRepository {
    async fn insert(&self, contact: &Contact) -> Result<(), DomainError> {
        self.inner.insert(&self.seal(contact)).await
    }

    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, DomainError> {
        Ok(self.inner.find_by_id(id).await?.map(|c| self.open(c)))
    }

    async fn list_for_provider(
        &self,
        provider_id: &ProviderId,
    ) -> Result<Vec<Contact>, DomainError> {
        let contacts = self.inner.list_for_provider(provider_id).await?;
        Ok(contacts.into_iter().map(|c| self.open(c)).collect())
    }

    async fn mark_unlocked(
        &self,
        id: &ContactId,
        unlocked_at: Timestamp,
        payment_id: Option<PaymentId>,
    ) -> Result<bool, DomainError> {
        self.inner.mark_unlocked(id, unlocked_at, payment_id).await
    }
}
