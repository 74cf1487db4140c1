//! Provider directory port.
//!
//! The listing tables belong to the profile subsystem; payment
//! fulfillment only flips visibility and promotion windows.

use crate::domain::foundation::{DomainError, ProviderId, Timestamp};
use crate::domain::provider::ProviderListing;
use async_trait::async_trait;

#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    async fn find(&self, id: &ProviderId) -> Result<Option<ProviderListing>, DomainError>;

    /// # Errors
    ///
    /// - `ProviderNotFound` if the listing does not exist
    async fn set_visibility(&self, id: &ProviderId, visible: bool) -> Result<(), DomainError>;

    async fn set_featured_until(
        &self,
        id: &ProviderId,
        until: Timestamp,
    ) -> Result<(), DomainError>;

    async fn set_boosted_until(&self, id: &ProviderId, until: Timestamp)
        -> Result<(), DomainError>;
}
