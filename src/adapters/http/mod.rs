//! HTTP adapters - REST API implementations.
//!
//! Each area has its own module (`dto`, `handlers`, `routes`); they share
//! one [`AppState`], the identity extractors in `middleware` and the
//! error mapping in `error`.

pub mod contacts;
pub mod error;
pub mod middleware;
pub mod payments;
pub mod state;
pub mod subscriptions;

pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

use axum::{routing::get, Router};

/// Complete API router with state applied.
///
/// ```text
/// /payments/...       payment_routes()
/// /subscriptions/...  subscription_routes()
/// /contacts/...       contact_routes()
/// /health             liveness probe
/// ```
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .nest("/payments", payments::payment_routes())
        .nest("/subscriptions", subscriptions::subscription_routes())
        .nest("/contacts", contacts::contact_routes())
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}
