//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresPaymentRepository` - `payments`, conditional status updates
//! - `PostgresSubscriptionRepository` - `subscriptions`, optimistic updates
//! - `PostgresContactRepository` / `PostgresUnlockedContactRepository`
//! - `PostgresProviderDirectory` - visibility and promotion columns of `providers`
//!
//! Rows are read into `*Row` structs and converted with `TryFrom`, so a bad
//! enum string in the database surfaces as `DatabaseError` instead of a panic.

mod contact_repository;
mod payment_repository;
mod provider_directory;
mod subscription_repository;

pub use contact_repository::{PostgresContactRepository, PostgresUnlockedContactRepository};
pub use payment_repository::PostgresPaymentRepository;
pub use provider_directory::PostgresProviderDirectory;
pub use subscription_repository::PostgresSubscriptionRepository;

use crate::domain::foundation::{DomainError, ErrorCode};
use std::fmt::Display;
use std::str::FromStr;

/// Parses an enum column, reporting bad values as `DatabaseError`.
fn parse_column<T>(value: &str, column: &str) -> Result<T, DomainError>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse::<T>().map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value '{}': {}", column, value, e),
        )
    })
}

fn db_error(action: &str, err: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, err))
}

/// True if `err` violated the named unique constraint.
fn violates(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.constraint() == Some(constraint))
}
