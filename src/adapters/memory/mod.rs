//! In-memory adapters.
//!
//! Used by the test suites and by local runs without a database. Each
//! store guards its rows with a single `Mutex`, so the conditional updates
//! behave atomically the same way the SQL `UPDATE ... WHERE` variants do.
//! Nothing persists across restarts.

mod contact_repository;
mod payment_repository;
mod provider_directory;
mod subscription_repository;

pub use contact_repository::{InMemoryContactRepository, InMemoryUnlockedContactRepository};
pub use payment_repository::InMemoryPaymentRepository;
pub use provider_directory::InMemoryProviderDirectory;
pub use subscription_repository::InMemorySubscriptionRepository;

use crate::domain::foundation::DomainError;
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DomainError> {
    mutex
        .lock()
        .map_err(|_| DomainError::internal("in-memory store lock poisoned"))
}
