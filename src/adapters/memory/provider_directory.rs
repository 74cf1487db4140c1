use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::lock;
use crate::domain::foundation::{DomainError, ErrorCode, ProviderId, Timestamp};
use crate::domain::provider::ProviderListing;
use crate::ports::ProviderDirectory;

#[derive(Default)]
pub struct InMemoryProviderDirectory {
    listings: Mutex<HashMap<ProviderId, ProviderListing>>,
}

impl InMemoryProviderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listing: ProviderListing) {
        if let Ok(mut listings) = self.listings.lock() {
            listings.insert(listing.id, listing);
        }
    }

    fn modify(
        &self,
        id: &ProviderId,
        change: impl FnOnce(&mut ProviderListing),
    ) -> Result<(), DomainError> {
        let mut listings = lock(&self.listings)?;
        let listing = listings.get_mut(id).ok_or_else(|| {
            DomainError::not_found(ErrorCode::ProviderNotFound, "Provider not found")
        })?;
        change(listing);
        Ok(())
    }
}

#[async_trait]
impl ProviderDirectory for InMemoryProviderDirectory {
    async fn find(&self, id: &ProviderId) -> Result<Option<ProviderListing>, DomainError> {
        Ok(lock(&self.listings)?.get(id).cloned())
    }

    async fn set_visibility(&self, id: &ProviderId, visible: bool) -> Result<(), DomainError> {
        self.modify(id, |l| l.is_visible = visible)
    }

    async fn set_featured_until(
        &self,
        id: &ProviderId,
        until: Timestamp,
    ) -> Result<(), DomainError> {
        self.modify(id, |l| l.featured_until = Some(until))
    }

    async fn set_boosted_until(
        &self,
        id: &ProviderId,
        until: Timestamp,
    ) -> Result<(), DomainError> {
        self.modify(id, |l| l.boosted_until = Some(until))
    }
}
